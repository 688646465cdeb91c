//! Thin HTTP wrapper over the three session endpoints. Stateless; the session
//! state machine lives in [`crate::session`].

use bytes::Bytes;
use reqwest::{header, multipart, Client, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::ClientError;
use crate::models::{
    ChatRequest, ChatResponse, DownloadRequest, ErrorEnvelope, UploadResponse,
};

pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Ok(Self {
            http: Client::builder().build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    /// POST /upload, multipart field `file`.
    pub async fn upload(&self, filename: &str, bytes: Vec<u8>) -> Result<UploadResponse, ClientError> {
        let part = multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(DOCX_MIME)?;
        let form = multipart::Form::new().part("file", part);

        let response = self.http.post(self.url("upload")).multipart(form).send().await?;
        decode_json(ensure_success(response).await?).await
    }

    /// POST /chat
    pub async fn chat(&self, request: &ChatRequest<'_>) -> Result<ChatResponse, ClientError> {
        let response = self.http.post(self.url("chat")).json(request).send().await?;
        decode_json(ensure_success(response).await?).await
    }

    /// POST /download. Only a binary body counts as success.
    pub async fn download(&self, request: &DownloadRequest<'_>) -> Result<Bytes, ClientError> {
        let response = self.http.post(self.url("download")).json(request).send().await?;
        let response = ensure_success(response).await?;

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();
        if content_type.starts_with("application/json") || content_type.starts_with("text/") {
            return Err(ClientError::Decode(format!(
                "expected a document, got '{content_type}'"
            )));
        }

        let bytes = response.bytes().await?;
        debug!("Downloaded {} bytes", bytes.len());
        Ok(bytes)
    }
}

/// Maps a non-success response to `ClientError::Api`, preferring the server's message.
async fn ensure_success(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|e| e.error.message)
        .ok()
        .or_else(|| Some(body.trim().to_string()))
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Request failed").to_string());

    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}

async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    response
        .json::<T>()
        .await
        .map_err(|e| ClientError::Decode(e.to_string()))
}

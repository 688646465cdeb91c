use std::time::Duration;

use thiserror::Error;

/// Failure of a single client operation. Converted to the session's `error`
/// string at the operation boundary.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status; `message` is the server's error message when it sent one.
    #[error("{message} (HTTP {status})")]
    Api { status: u16, message: String },

    #[error("Request timed out after {}s", .0.as_secs_f32())]
    Timeout(Duration),

    #[error("Request cancelled")]
    Cancelled,

    #[error("File error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unexpected response: {0}")]
    Decode(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_human_readable() {
        let api = ClientError::Api {
            status: 400,
            message: "Please fill remaining fields: Date".to_string(),
        };
        assert_eq!(api.to_string(), "Please fill remaining fields: Date (HTTP 400)");
        assert_eq!(
            ClientError::Timeout(Duration::from_millis(1500)).to_string(),
            "Request timed out after 1.5s"
        );
    }
}

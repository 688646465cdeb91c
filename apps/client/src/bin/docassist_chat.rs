use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use docassist_client::session::is_docx_filename;
use docassist_client::view::{render_fields, render_message, render_progress};
use docassist_client::{ClientConfig, SessionClient};

/// Fill the [bracketed] fields of a .docx document by chatting with the assistant.
#[derive(Debug, Parser)]
#[command(name = "docassist-chat", version)]
struct Args {
    /// Document to upload on start.
    document: Option<PathBuf>,

    /// API base URL. Overrides API_BASE_URL.
    #[arg(long)]
    api_base_url: Option<String>,

    /// Directory the completed document is saved into.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Per-request deadline in seconds. Overrides REQUEST_TIMEOUT_SECS.
    #[arg(long)]
    timeout_secs: Option<u64>,
}

const HELP: &str = "\
Commands:
  /upload <path>  upload a .docx document (starts a new session)
  /status         show fields and progress
  /download       save the completed document
  /reset          abandon the current session
  /quit           exit
Anything else is sent to the assistant. Ctrl-C cancels a pending request,
or exits when pressed at the prompt.";

#[derive(Debug, PartialEq)]
enum Input {
    Line(String),
    Eof,
    Interrupted,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let mut config = ClientConfig::from_env()?;
    if let Some(url) = args.api_base_url {
        config.api_base_url = url;
    }
    if let Some(secs) = args.timeout_secs {
        config.request_timeout = Duration::from_secs(secs);
    }

    let mut client = SessionClient::new(&config)?;
    println!("docassist: talking to {}", config.api_base_url);
    println!("{HELP}\n");

    if let Some(path) = args.document {
        upload(&mut client, path).await;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt(&client);
        let line = match next_input(&mut lines, tokio::signal::ctrl_c()).await? {
            Input::Line(line) => line,
            Input::Interrupted => {
                println!();
                break;
            }
            Input::Eof => break,
        };
        let line = line.trim();

        match line.split_once(' ').map_or((line, ""), |(cmd, rest)| (cmd, rest.trim())) {
            ("", _) => continue,
            ("/quit" | "/exit", _) => break,
            ("/help", _) => println!("{HELP}"),
            ("/upload", "") => println!("usage: /upload <path>"),
            ("/upload", path) => {
                client.reset_session();
                upload(&mut client, PathBuf::from(path)).await;
            }
            ("/status", _) => print_status(&client),
            ("/reset", _) => {
                client.reset_session();
                println!("Session cleared. Use /upload <path> to start again.");
            }
            ("/download", _) => {
                if !client.can_download() {
                    println!(
                        "Download is available once all fields are filled ({}/{}).",
                        client.filled_count(),
                        client.total_count()
                    );
                    continue;
                }
                let handle = client.cancellation_handle();
                let watcher = cancel_on_ctrl_c(handle);
                let saved = client.download_document(&args.out_dir).await;
                watcher.abort();
                match saved {
                    Some(path) => println!("Saved {}", path.display()),
                    None => report_error(&client),
                }
            }
            _ if line.starts_with('/') => println!("Unknown command. Type /help."),
            _ => {
                if client.session_id().is_none() {
                    println!("No document loaded. Use /upload <path> first.");
                    continue;
                }
                let handle = client.cancellation_handle();
                let watcher = cancel_on_ctrl_c(handle);
                let sent = client.send_message(line).await;
                watcher.abort();
                if sent {
                    if let Some(reply) = client.conversation().last() {
                        println!("{}", render_message(reply));
                    }
                    println!("{}", render_progress(client.filled_count(), client.total_count()));
                } else {
                    report_error(&client);
                }
            }
        }
    }

    Ok(())
}

async fn upload(client: &mut SessionClient, path: PathBuf) {
    if !is_docx_filename(&path.to_string_lossy()) {
        println!("Warning: {} does not look like a .docx file.", path.display());
    }
    let handle = client.cancellation_handle();
    let watcher = cancel_on_ctrl_c(handle);
    let opened = client.upload_path(&path).await;
    watcher.abort();

    if opened {
        if let Some(greeting) = client.conversation().first() {
            println!("{}", render_message(greeting));
        }
        println!("{}", render_progress(client.filled_count(), client.total_count()));
    } else {
        report_error(client);
    }
}

fn print_status(client: &SessionClient) {
    match client.session_id() {
        Some(id) => {
            println!("Session {id} ({})", client.filename());
            println!("{}", render_fields(client.placeholders()));
            println!("{}", render_progress(client.filled_count(), client.total_count()));
        }
        None => println!("No document loaded."),
    }
}

fn report_error(client: &SessionClient) {
    if let Some(error) = client.error() {
        eprintln!("error: {error}");
    }
}

fn prompt(client: &SessionClient) {
    use std::io::Write;
    let marker = if client.is_complete() { "✓" } else { ">" };
    print!("{marker} ");
    let _ = std::io::stdout().flush();
}

/// Waits for the next stdin line, or for `interrupt` to fire while idle.
/// Installing a Ctrl-C listener disables the default exit-on-SIGINT, so the
/// prompt has to treat it as a quit itself.
async fn next_input<R>(
    lines: &mut Lines<R>,
    interrupt: impl Future<Output = io::Result<()>>,
) -> io::Result<Input>
where
    R: AsyncBufRead + Unpin,
{
    tokio::select! {
        biased;
        Ok(()) = interrupt => Ok(Input::Interrupted),
        line = lines.next_line() => Ok(line?.map_or(Input::Eof, Input::Line)),
    }
}

/// Cancels `handle` on Ctrl-C until the returned task is aborted.
fn cancel_on_ctrl_c(
    handle: tokio_util::sync::CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.cancel();
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_next_input_reads_lines_then_eof() {
        let mut lines = BufReader::new(&b"hello\n"[..]).lines();
        let first = next_input(&mut lines, std::future::pending()).await.unwrap();
        assert_eq!(first, Input::Line("hello".to_string()));
        let second = next_input(&mut lines, std::future::pending()).await.unwrap();
        assert_eq!(second, Input::Eof);
    }

    #[tokio::test]
    async fn test_ctrl_c_at_prompt_interrupts() {
        let mut lines = BufReader::new(&b"hello\n"[..]).lines();
        let input = next_input(&mut lines, std::future::ready(Ok(()))).await.unwrap();
        assert_eq!(input, Input::Interrupted);
    }

    #[tokio::test]
    async fn test_failed_signal_listener_falls_back_to_reading() {
        let mut lines = BufReader::new(&b"status\n"[..]).lines();
        let failed = std::future::ready(Err(io::Error::other("no signal handler")));
        let input = next_input(&mut lines, failed).await.unwrap();
        assert_eq!(input, Input::Line("status".to_string()));
    }
}

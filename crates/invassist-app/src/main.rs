//! invassist binary - composition root.
//!
//! 1. Parse CLI args and load configuration (CLI > env > file > defaults)
//! 2. Initialize tracing
//! 3. Build the HTTP backend client
//! 4. Run the interactive chat, or a one-shot invoice utility

mod cli;
mod render;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use invassist_chat::{ChatError, ChatWidget, DirectorySink, DownloadSink, SendOutcome};
use invassist_client::AssistantClient;
use invassist_core::config::AssistConfig;
use invassist_core::types::{ComparisonRequest, ExportIndex, ExportKind};

use cli::{CliArgs, Command};

const HELP: &str = "\
Commands:
  /export <pdf|word|excel|png> <index>   download an exported file
  /history                               show the conversation
  /clear                                 clear the conversation
  /restart                               clear and start a new session
  /help                                  show this help
  /quit                                  close the assistant
Anything else is sent to the assistant.";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();
    let config = args.load_config();

    // Tracing. RUST_LOG wins over the configured level.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .init();

    tracing::info!("Starting invassist v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(base_url = %config.backend.base_url, "Backend configured");

    let client = AssistantClient::from_config(&config.backend);

    match args.command() {
        Command::Chat => run_chat(client, &config).await?,
        Command::Invoices { from, to } => {
            let from = from.format("%Y-%m-%d").to_string();
            let to = to.format("%Y-%m-%d").to_string();
            let response = client
                .fetch_invoices(&config.backend.tenant_id, &from, &to)
                .await?;
            if !response.success {
                tracing::warn!(code = response.code, message = ?response.message, "Invoice listing reported failure");
                eprintln!("{}", render::invoice_failure(&response));
                return Ok(());
            }
            print!("{}", render::render_invoices(&response.into_invoices(), &config.chat));
        }
        Command::Compare {
            account,
            date,
            download,
        } => {
            let request = ComparisonRequest {
                account_number: account,
                current_date: date.format("%Y-%m-%d").to_string(),
            };
            let response = client
                .compare_invoice(&config.backend.tenant_id, &request)
                .await;
            print!("{}", render::render_comparison(&response));

            if let (true, Some(result)) = (download, response.data.as_ref()) {
                let payload = client
                    .download_comparison(&config.backend.tenant_id, result.file_id)
                    .await?;
                let sink = DirectorySink::new(&config.export.download_dir);
                let path = sink.save(&result.download_file_name(), &payload.bytes)?;
                println!("Saved to {}", path.display());
            }
        }
    }

    Ok(())
}

/// Interactive conversation on stdin/stdout until `/quit`, EOF or Ctrl-C.
async fn run_chat(
    client: AssistantClient,
    config: &AssistConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let widget = Arc::new(ChatWidget::from_config(Arc::new(client), config));

    match widget.open().await {
        Ok(id) => tracing::debug!(session_id = %id, "Assistant opened"),
        Err(e) => eprintln!("{}", e.user_message()),
    }
    println!("Ask about your invoices or inventory. Type /help for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match input.split_whitespace().collect::<Vec<_>>().as_slice() {
            ["/quit"] | ["/exit"] => break,
            ["/help"] => println!("{}", HELP),
            ["/history"] => {
                for entry in widget.history().snapshot() {
                    print!("{}", render::render_entry(&entry, widget.chat_config()));
                }
            }
            ["/clear"] => {
                widget.clear_history();
                println!("Conversation cleared.");
            }
            ["/restart"] => match widget.clear_and_restart().await {
                Ok(_) => println!("Conversation cleared, new session started."),
                Err(e) => eprintln!("{}", e.user_message()),
            },
            ["/export", kind, index] => export(&widget, kind, index).await,
            [cmd, ..] if cmd.starts_with('/') => eprintln!("Unknown command {}. Type /help.", cmd),
            _ => ask(&widget, &line).await,
        }
    }

    widget.close().await;
    println!("Goodbye.");
    Ok(())
}

/// Send one query, showing rotating status text while it is outstanding.
async fn ask(widget: &Arc<ChatWidget>, query: &str) {
    let mut pending = {
        let widget = Arc::clone(widget);
        let query = query.to_string();
        tokio::spawn(async move { widget.send_message(&query).await })
    };

    let mut ticker = tokio::time::interval(Duration::from_millis(1500));
    let mut tick = 0usize;
    let result = loop {
        tokio::select! {
            joined = &mut pending => break joined,
            _ = ticker.tick() => {
                if let Some(status) = widget.loading_status(tick) {
                    eprint!("\r{}...   ", status);
                }
                tick += 1;
            }
        }
    };
    eprint!("\r{:30}\r", "");

    match result {
        Ok(Ok(SendOutcome::Answered(entries))) => {
            for entry in &entries {
                print!("{}", render::render_entry(entry, widget.chat_config()));
            }
        }
        Ok(Ok(SendOutcome::Discarded)) => {}
        Ok(Err(e)) => eprintln!("{}", e.user_message()),
        Err(e) => tracing::error!(error = %e, "Search task failed"),
    }
}

async fn export(widget: &ChatWidget, kind: &str, index: &str) {
    let parsed = kind
        .parse::<ExportKind>()
        .and_then(|k| index.parse::<ExportIndex>().map(|i| (k, i)));
    let (kind, index) = match parsed {
        Ok(pair) => pair,
        Err(e) => {
            eprintln!("{}", e);
            return;
        }
    };

    match widget.export(kind, index).await {
        Ok(saved) => println!("Saved {} ({} bytes)", saved.path.display(), saved.size),
        Err(ChatError::Download(e)) => eprintln!("Could not save {}: {}", kind.file_name(index), e),
        Err(e) => eprintln!("Failed to export {}: {}", kind.label(), e.user_message()),
    }
}

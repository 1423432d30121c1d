//! lanchat interactive client.

use anyhow::{Context, Result};
use clap::Parser;
use lanchat::prelude::*;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(name = "lanchat-client")]
#[command(about = "LAN chat client")]
#[command(version)]
struct Cli {
    /// Server host name or IP address
    #[arg(default_value = "127.0.0.1")]
    addr: String,

    /// Server port (1024-65535)
    #[arg(default_value_t = Port::DEFAULT)]
    port: Port,

    /// Participant name; asked for if omitted
    #[arg(short, long)]
    name: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    lanchat::logging::init(cli.verbose, true);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("cannot start the async runtime")?;
    let result = runtime.block_on(run(cli));
    // Stdin is read on a blocking thread that cannot be interrupted.
    runtime.shutdown_background();
    result
}

async fn run(cli: Cli) -> Result<()> {
    let mut input = BufReader::new(tokio::io::stdin());
    let mut output = tokio::io::stdout();

    let name = match cli.name {
        Some(name) if !name.trim().is_empty() => name.trim().to_string(),
        _ => read_name(&mut input, &mut output).await?,
    };

    let addr = server_address(&cli.addr, cli.port);
    let session = ClientSession::connect(&addr, name, ClientConfig::default())
        .await
        .with_context(|| format!("cannot join the chat at {addr}"))?;
    println!("Connected to {addr} as {}.", session.name());

    let (inbox_tx, mut inbox_rx) = mpsc::unbounded_channel::<ChatMessage>();
    let printer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(chat) = inbox_rx.recv().await {
            let line = format!("\n[{}] {}\n", chat.from, chat.text);
            if stdout.write_all(line.as_bytes()).await.is_err() {
                break;
            }
            let _ = stdout.flush().await;
        }
    });

    let outcome = session.run(input, output, inbox_tx).await;
    printer.abort();
    outcome.context("chat session ended")?;
    Ok(())
}

/// Joins a host name or IP literal with a port. IPv6 literals need
/// brackets before a port can follow.
fn server_address(host: &str, port: Port) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

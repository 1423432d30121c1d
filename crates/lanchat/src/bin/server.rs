//! lanchat server.

use std::net::IpAddr;

use anyhow::{Context, Result};
use clap::Parser;
use lanchat::prelude::*;

#[derive(Parser)]
#[command(name = "lanchat-server")]
#[command(about = "LAN chat server")]
#[command(version)]
struct Cli {
    /// Address to listen on
    #[arg(short, long, default_value = "0.0.0.0")]
    address: IpAddr,

    /// Port to listen on (1024-65535)
    #[arg(short, long, default_value_t = Port::DEFAULT)]
    port: Port,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    lanchat::logging::init(cli.verbose, false);

    let server = ChatServer::builder()
        .listen_on(cli.address, cli.port)
        .build()
        .with_context(|| format!("cannot listen on {}:{}", cli.address, cli.port))?;
    tracing::info!(addr = %server.local_addr()?, "listening");

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "cannot wait for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await;
    Ok(())
}

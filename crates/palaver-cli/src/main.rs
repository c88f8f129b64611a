//! palaver CLI entry point.

use clap::Parser;
use palaver_app::{Runtime, RuntimeConfig};
use tracing_subscriber::EnvFilter;

mod driver;

use driver::TerminalDriver;

/// Command-line client for a palaver conversation broker
#[derive(Parser, Debug)]
#[command(name = "palaver")]
#[command(about = "Command-line client for the palaver conversation broker")]
#[command(version)]
struct Args {
    /// Broker WebSocket URL
    #[arg(short, long, default_value = "ws://localhost:8080/ws")]
    broker: String,

    /// Conversation to join
    #[arg(short, long)]
    conversation: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let runtime = Runtime::new(TerminalDriver::new(), RuntimeConfig {
        conversation_id: args.conversation,
        broker_url: args.broker,
    });

    Ok(runtime.run().await?)
}

//! Parley console client entry point.

use clap::Parser;
use parley_client::{
    Args, ClientConfig, ConsoleRenderer, HttpRest, Runtime, StompTransport, SystemClock, console,
};
use parley_core::SyncEngine;
use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Buffered input lines before the reader waits on the event loop.
const INPUT_BUFFER: usize = 64;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Logs go to stderr; stdout belongs to the console.
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = ClientConfig::try_from(args)?;
    tracing::info!(
        server = %config.server,
        ws_url = %config.ws_url,
        user_id = config.auth.user_id,
        "starting Parley client"
    );

    let (transport, events) = StompTransport::new(config.ws_url.as_str(), &config.auth);
    let rest = HttpRest::new(config.server.as_str(), &config.auth);
    let engine = SyncEngine::new(config.auth, transport, SystemClock::new())
        .with_echo_ttl(config.echo_ttl);

    let (inputs_tx, inputs) = mpsc::channel(INPUT_BUFFER);
    let reader = console::spawn_stdin(inputs_tx);

    let runtime = Runtime::new(
        engine,
        rest,
        ConsoleRenderer::new(std::io::stdout()),
        events,
        inputs,
        config.poll_interval,
    );
    let result = runtime.run().await;
    reader.abort();
    result?;

    Ok(())
}

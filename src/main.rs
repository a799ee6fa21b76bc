use std::sync::Arc;

use clap::Parser;

use babel_relay::RelayConfig;
use babel_telemetry::{init_telemetry, TelemetryConfig};
use babel_translate::{GoogleConfig, GoogleTranslator, Translator};

#[derive(Parser, Debug)]
#[command(name = "babel", about = "Real-time voice translation chat relay")]
struct Args {
    /// Port to listen on
    #[arg(long, default_value_t = 5000)]
    port: u16,

    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    /// Override the translation endpoint (e.g. a self-hosted proxy)
    #[arg(long)]
    translate_endpoint: Option<String>,

    /// Plain console logs instead of JSON lines
    #[arg(long)]
    plain_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let telemetry = init_telemetry(TelemetryConfig {
        json_logs: !args.plain_logs,
        ..Default::default()
    });

    tracing::info!("starting babel relay");

    let mut google_config = GoogleConfig::default();
    if let Some(endpoint) = args.translate_endpoint {
        google_config.endpoint = endpoint;
    }
    let translator: Arc<dyn Translator> = Arc::new(GoogleTranslator::new(google_config)?);

    let config = RelayConfig {
        bind: args.bind,
        port: args.port,
        ..Default::default()
    };
    let handle = babel_relay::start(config, translator, telemetry.metrics()).await?;

    tracing::info!(port = handle.port, "babel relay ready");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    Ok(())
}

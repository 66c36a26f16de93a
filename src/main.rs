use anyhow::{Context, Result};
use clap::Parser;
use deconz_exporter::{
    collectors::{CollectorRegistry, GatewayCollector},
    config::Config,
    deconz::DeconzClient,
    pairing::{FileKeyStore, PairingAgent, PairingPolicy, TokioSleeper},
    server,
};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/Default.toml")]
    config: String,

    /// Directory holding one API key file per gateway (overrides config)
    #[arg(long = "api_key_directory", env = "DECONZ_API_KEY_DIRECTORY")]
    api_key_directory: Option<String>,

    /// Address to bind to (overrides config)
    #[arg(long = "listen_host", env = "EXPORTER_ADDR")]
    listen_host: Option<String>,

    /// Port to listen on for metrics (overrides config)
    #[arg(long = "listen_port", env = "EXPORTER_PORT")]
    listen_port: Option<u16>,

    /// Gateway discovery service URL (overrides config)
    #[arg(long = "discovery_url", env = "DECONZ_DISCOVERY_URL")]
    discovery_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting deCONZ Prometheus Exporter v{}",
        env!("CARGO_PKG_VERSION")
    );

    let args = Args::parse();

    let mut config = Config::load(&args.config)?;

    // Override with CLI arguments if provided
    if let Some(dir) = args.api_key_directory {
        config.deconz.api_key_directory = dir;
    }
    if let Some(host) = args.listen_host {
        // An empty host means all interfaces
        config.server.addr = if host.is_empty() {
            "0.0.0.0".to_string()
        } else {
            host
        };
    }
    if let Some(port) = args.listen_port {
        config.server.port = port;
    }
    if let Some(url) = args.discovery_url {
        config.deconz.discovery_url = url;
    }

    config.validate()?;
    info!("Configuration loaded successfully");
    info!("API key directory: {}", config.deconz.api_key_directory);
    info!(
        "Metrics endpoint: http://{}:{}/metrics",
        config.server.addr, config.server.port
    );

    let client = DeconzClient::new(&config.deconz).context("Failed to build HTTP client")?;
    let registry = match setup(&config, &client).await {
        Ok(registry) => registry,
        Err(e) => {
            error!("Startup failed: {:#}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server::start(&config.server, registry, client).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Discover gateways and pair with each of them
async fn setup(config: &Config, client: &DeconzClient) -> Result<CollectorRegistry> {
    let gateways = client
        .discover()
        .await
        .context("Gateway discovery failed")?;
    if gateways.is_empty() {
        warn!("Discovery returned no gateways, /metrics will be empty");
    }

    let store = FileKeyStore::new(&config.deconz.api_key_directory).with_context(|| {
        format!(
            "Failed to open API key directory {}",
            config.deconz.api_key_directory
        )
    })?;
    let policy = PairingPolicy {
        device_type: config.deconz.device_type.clone(),
        retry_delay: config.deconz.pairing_retry_delay(),
        timeout: config.deconz.pairing_timeout(),
    };
    let agent = PairingAgent::new(client, &store, TokioSleeper, policy);

    let mut registry = CollectorRegistry::new();
    for gateway in gateways {
        match agent.ensure_credential(&gateway).await {
            Ok(credential) => registry.register(GatewayCollector::new(gateway, credential)),
            Err(e) if config.deconz.skip_unpaired_gateways => {
                warn!("Skipping gateway {}: {}", gateway, e);
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Pairing with gateway {} failed", gateway))
            }
        }
    }

    info!("Paired with {} gateway(s)", registry.len());
    Ok(registry)
}

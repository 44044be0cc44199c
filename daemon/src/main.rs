//! Price feeder daemon: entry point for running an oracle feeder.

mod metrics_http;

use clap::Parser;
use feeder_crypto::OsSaltGenerator;
use feeder_engine::{
    FeederConfig, FeederMetrics, FeederService, PeriodClock, ShutdownController,
    SubmissionRetrier, VoteCycleEngine,
};
use feeder_gateway::{
    ChainGateway, HeightSource, HttpGateway, HttpGatewayConfig, HttpPriceSource,
    PollingHeightSource, RemoteSigner, WebsocketHeightSource,
};
use feeder_utils::LogFormat;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "price-feeder", about = "Oracle price feeder (prevote/vote commit-reveal)")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "FEEDER_CONFIG")]
    config: Option<PathBuf>,

    /// Chain id the signer signs for.
    #[arg(long, env = "FEEDER_CHAIN_ID")]
    chain_id: Option<String>,

    /// LCD (REST) endpoint of the chain node.
    #[arg(long, env = "FEEDER_LCD_ENDPOINT")]
    lcd_endpoint: Option<String>,

    /// Tendermint RPC websocket, e.g. "ws://localhost:26657/websocket".
    #[arg(long, env = "FEEDER_WEBSOCKET_ENDPOINT")]
    websocket_endpoint: Option<String>,

    /// Signing service endpoint.
    #[arg(long, env = "FEEDER_SIGNER_ENDPOINT")]
    signer_endpoint: Option<String>,

    /// Price source endpoint.
    #[arg(long, env = "FEEDER_PRICE_SOURCE_ENDPOINT")]
    price_source_endpoint: Option<String>,

    /// Validator operator address to vote for.
    #[arg(long, env = "FEEDER_VALIDATOR")]
    validator: Option<String>,

    /// Feeder account address that signs the oracle txs.
    #[arg(long, env = "FEEDER_FEEDER")]
    feeder: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "FEEDER_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "FEEDER_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Serve Prometheus metrics on this port.
    #[arg(long, env = "FEEDER_METRICS_PORT")]
    metrics_port: Option<u16>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run the feeder until interrupted.
    Run,
    /// Print the effective configuration as TOML and exit.
    ShowConfig,
}

impl Cli {
    fn apply_overrides(&self, config: &mut FeederConfig) {
        let overrides = [
            (&self.chain_id, &mut config.chain_id),
            (&self.lcd_endpoint, &mut config.lcd_endpoint),
            (&self.signer_endpoint, &mut config.signer_endpoint),
            (&self.price_source_endpoint, &mut config.price_source_endpoint),
            (&self.validator, &mut config.validator),
            (&self.feeder, &mut config.feeder),
            (&self.log_level, &mut config.log_level),
        ];
        for (flag, field) in overrides {
            if let Some(value) = flag {
                *field = value.clone();
            }
        }
        if self.websocket_endpoint.is_some() {
            config.websocket_endpoint = self.websocket_endpoint.clone();
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        if self.metrics_port.is_some() {
            config.metrics_port = self.metrics_port;
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<FeederConfig> {
    let mut config = match &cli.config {
        Some(path) => FeederConfig::from_toml_file(&path.to_string_lossy())?,
        None => FeederConfig::default(),
    };
    cli.apply_overrides(&mut config);
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        Command::ShowConfig => {
            print!("{}", config.to_toml_string());
            Ok(())
        }
        Command::Run => {
            feeder_utils::init_logging(config.log_format, &config.log_level);
            run(config).await
        }
    }
}

async fn run(config: FeederConfig) -> anyhow::Result<()> {
    let identity = config.identity()?;
    tracing::info!(
        chain_id = %config.chain_id,
        lcd = %config.lcd_endpoint,
        validator = %identity.validator,
        feeder = %identity.feeder,
        "starting price feeder"
    );

    let signer = Arc::new(RemoteSigner::new(
        config.signer_endpoint.clone(),
        config.chain_id.clone(),
        config.request_timeout(),
    )?);
    let http_gateway = Arc::new(HttpGateway::new(
        HttpGatewayConfig {
            lcd_endpoint: config.lcd_endpoint.clone(),
            oracle_module_path: config.oracle_module_path.clone(),
            request_timeout: config.request_timeout(),
        },
        signer,
    )?);
    let prices = Arc::new(HttpPriceSource::new(
        config.price_source_endpoint.clone(),
        config.request_timeout(),
    )?);
    let gateway: Arc<dyn ChainGateway> = http_gateway.clone();

    let heights: Box<dyn HeightSource> = match &config.websocket_endpoint {
        Some(url) => {
            tracing::info!(%url, "following new blocks over websocket");
            Box::new(WebsocketHeightSource::connect(url.clone()))
        }
        None => {
            tracing::info!(interval = ?config.height_poll_interval(), "polling block height");
            Box::new(PollingHeightSource::new(
                http_gateway,
                config.height_poll_interval(),
            ))
        }
    };

    let controller = Arc::new(ShutdownController::new());
    let signals = Arc::clone(&controller);
    tokio::spawn(async move { signals.wait_for_signal().await });

    let mut engine = VoteCycleEngine::new(
        Arc::clone(&gateway),
        prices,
        Box::new(OsSaltGenerator),
        SubmissionRetrier::new(config.retry_policy(), controller.subscribe()),
        identity,
    );

    let metrics = Arc::new(FeederMetrics::new());
    engine.subscribe(FeederMetrics::listener(Arc::clone(&metrics)));
    let metrics_task = config.metrics_port.map(|port| {
        tokio::spawn(metrics_http::serve(
            port,
            Arc::clone(&metrics),
            controller.subscribe(),
        ))
    });

    let service = FeederService::new(
        engine,
        PeriodClock::new(Arc::clone(&gateway), config.params_ttl()),
        heights,
        gateway,
        controller.subscribe(),
        config.cycle_deadline(),
    );
    let outcome = service.run().await;

    controller.shutdown();
    if let Some(task) = metrics_task {
        let _ = task.await;
    }

    outcome?;
    tracing::info!("price feeder exited cleanly");
    Ok(())
}

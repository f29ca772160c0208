//! Concierge server binary.
//!
//! Brings the pipeline up in dependency order: telemetry first (so a
//! dead log sink fails startup before the port opens), then the guest
//! store, then the listener. The coordinator owns everything after
//! that, and an orderly stop exits with status 0.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use concierge_server::lifecycle::{Coordinator, ServiceRegistry};
use concierge_server::network::{NetworkConfig, NetworkModule};
use concierge_server::storage::{SqliteGuestStore, StorageService};
use concierge_server::telemetry::{self, ForwardingConfig, TelemetryConfig, TelemetryService};
use concierge_server::GuestStore;

#[derive(Debug, Parser)]
#[command(name = "concierge", about = "HTTP greeter with correlated logging", version)]
struct Args {
    /// Interface the listener binds to.
    #[arg(long, env = "CONCIERGE_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port the listener binds to.
    #[arg(long, env = "CONCIERGE_PORT", default_value_t = 8080)]
    port: u16,

    /// Path of the guest database file.
    #[arg(long, env = "CONCIERGE_DATABASE", default_value = "concierge.db")]
    database: PathBuf,

    /// Serve greetings without recording visits.
    #[arg(long, env = "CONCIERGE_NO_PERSIST")]
    no_persist: bool,

    /// Default log level when `RUST_LOG` is unset.
    #[arg(long, env = "CONCIERGE_LOG_LEVEL", default_value = "debug")]
    log_level: String,

    /// Emit JSON logs instead of the human-readable format.
    #[arg(long, env = "CONCIERGE_JSON_LOGS")]
    json_logs: bool,

    /// Write logs to a daily-rolled file at this path instead of stdout.
    #[arg(long, env = "LOG_FILE_LOCATION")]
    log_file: Option<PathBuf>,

    /// Base URL of the indexing log sink; probed at startup.
    #[arg(long, env = "CONCIERGE_SINK_URL")]
    sink_url: Option<String>,

    /// Index name prefix for shipped log records.
    #[arg(long, env = "CONCIERGE_SINK_INDEX_PREFIX", default_value = "concierge-")]
    sink_index_prefix: String,

    /// URL receiving error-level log records.
    #[arg(long, env = "CONCIERGE_MONITORING_URL")]
    monitoring_url: Option<String>,

    /// OTLP endpoint for span export.
    #[arg(long, env = "CONCIERGE_OTLP_ENDPOINT")]
    otlp_endpoint: Option<String>,

    /// Bind address for the Prometheus scrape endpoint.
    #[arg(long, env = "CONCIERGE_METRICS_ADDR")]
    metrics_addr: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let telemetry_config = TelemetryConfig {
        level: args.log_level.clone(),
        json: args.json_logs,
        log_file: args.log_file.clone(),
        service_name: "concierge".to_string(),
        forwarding: ForwardingConfig {
            index_url: args.sink_url.clone(),
            index_prefix: args.sink_index_prefix.clone(),
            monitoring_url: args.monitoring_url.clone(),
            ..ForwardingConfig::default()
        },
        otlp_endpoint: args.otlp_endpoint.clone(),
        metrics_addr: args.metrics_addr,
    };
    let telemetry = telemetry::init(telemetry_config).await?;

    let services = ServiceRegistry::new();
    services.register(TelemetryService::new(telemetry));

    let store: Option<Arc<dyn GuestStore>> = if args.no_persist {
        info!("guest persistence disabled");
        None
    } else {
        let store: Arc<dyn GuestStore> = Arc::new(SqliteGuestStore::open(&args.database).await?);
        services.register(StorageService::new(Arc::clone(&store)));
        Some(store)
    };

    services.init_all().await?;

    let config = NetworkConfig {
        host: args.host.clone(),
        port: args.port,
        ..NetworkConfig::default()
    };
    let grace = config.shutdown_grace;

    let mut module = NetworkModule::new(config, store);
    module.start().await?;

    Coordinator::new(module, services, grace).run().await
}

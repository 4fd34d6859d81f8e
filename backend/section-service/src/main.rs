use anyhow::Context;
use clap::Parser;
use grpc_app::{App, AppConfig};
use section_service::{bootstrap, logging, Config, DEFAULT_APP_PORT};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "section-service", about = "Section rotation gRPC plugin server")]
struct Args {
    /// Port the gRPC server listens on
    #[arg(short, long, default_value_t = DEFAULT_APP_PORT)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::load().context("failed to read configuration from environment")?;
    logging::init_tracing(config.service.log_format, config.plugin.logging_enabled);

    info!(
        service = %config.service.service_name,
        port = args.port,
        base_url = %config.accelbyte.base_url,
        namespace = %config.accelbyte.namespace,
        "Starting section-service"
    );

    let options = bootstrap::build_options(&config, prometheus::default_registry())?;
    let mut app = App::new(
        args.port,
        AppConfig::new(config.service.service_name.clone()),
        options,
    )
    .context("failed to assemble gRPC server")?;

    app.run(None).await.context("gRPC server failed")?;
    Ok(())
}

use registry_gateway::{config::Settings, services::init_metrics, Application};
use service_core::observability::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::from_env()?;

    init_tracing(
        &settings.service_name,
        &settings.telemetry.log_level,
        settings.telemetry.otlp_endpoint.as_deref(),
    )?;
    init_metrics()?;

    let application = Application::build(settings).await?;
    application.run_until_stopped().await?;

    Ok(())
}

use anyhow::anyhow;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use leadwarm::app;
use leadwarm::config::AppConfig;

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("leadwarm=info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .compact(),
        )
        .init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let config = AppConfig::from_env()?;
    tracing::info!(
        model = %config.default_model,
        api_base = %config.api_base,
        token_configured = config.api_token.is_some(),
        "starting"
    );
    app::run(config).map_err(|err| anyhow!("UI failed: {err}"))
}

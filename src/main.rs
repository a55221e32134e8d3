use std::sync::Arc;

use widget_onboard::backend::{Backend, RestBackend};
use widget_onboard::clipboard::{Clipboard, SystemClipboard};
use widget_onboard::config::AppConfig;
use widget_onboard::notify::{Notifier, StderrNotifier};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  export ONBOARD_BACKEND_URL=https://<project>.supabase.co");
        eprintln!("  export ONBOARD_ANON_KEY=<anon key>");
        std::process::exit(1);
    });

    eprintln!("🧙 widget-onboard v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Backend: {}", config.backend_url);
    eprintln!("   Widget base: {}", config.widget_base);
    eprintln!("   Type a choice and press Enter. /quit to exit.\n");

    let backend: Arc<dyn Backend> = Arc::new(RestBackend::new(&config));
    let notifier: Arc<dyn Notifier> = Arc::new(StderrNotifier);
    let clipboard: Arc<dyn Clipboard> = Arc::new(SystemClipboard);

    widget_onboard::cli::run(config, backend, notifier, clipboard).await?;

    Ok(())
}

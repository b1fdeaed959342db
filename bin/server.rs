// IPO Allotment Checker - Web Server

use anyhow::{Context, Result};
use ipo_allotment::server::{serve, AppState};
use ipo_allotment::{logging, AllotmentChecker, AppConfig};

fn main() -> Result<()> {
    logging::init_stderr();

    println!("🌐 IPO Allotment Checker - Web Server v{}", ipo_allotment::VERSION);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = AppConfig::from_env().context("invalid configuration")?;
    tracing::info!(?config, "configuration loaded");

    // The blocking HTTP client must be created and dropped outside the async runtime.
    let checker = AllotmentChecker::from_config(&config).context("failed to build HTTP client")?;
    let state = AppState::new(checker);

    let runtime = tokio::runtime::Runtime::new().context("failed to start runtime")?;

    println!("\n🚀 Server running on http://{}", config.server_addr);
    println!("   UI:  http://{}/", config.server_addr);
    println!("   API: http://{}/api/check", config.server_addr);
    println!("\n   Press Ctrl+C to stop\n");

    runtime
        .block_on(serve(state.clone(), &config.server_addr))
        .with_context(|| format!("failed to serve on {}", config.server_addr))?;

    drop(runtime);
    drop(state);
    Ok(())
}

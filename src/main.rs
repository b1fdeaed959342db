// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::Result;

#[cfg(feature = "tui")]
fn main() -> Result<()> {
    use anyhow::Context;
    use ipo_allotment::{logging, AllotmentChecker, AppConfig};

    println!("📊 Loading IPO Allotment Checker v{}...\n", ipo_allotment::VERSION);

    let config = AppConfig::from_env().context("invalid configuration")?;

    // Logging would draw over the alternate screen, so it only goes to a file.
    if let Some(path) = &config.log_file {
        logging::init_file(path).with_context(|| format!("cannot open log file {}", path))?;
    }
    tracing::info!(?config, "starting terminal UI");

    let checker = AllotmentChecker::from_config(&config).context("failed to build HTTP client")?;
    let mut app = ui::App::new(checker);
    ui::run_ui(&mut app)?;

    println!("\n✅ Closed");

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn main() -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the web UI: cargo run --bin ipo-server --features server");
    std::process::exit(1);
}

//! Kidney Match: transplant donor/recipient matching.
//!
//! Main entry point for the terminal application.

use anyhow::Result;
use std::io::IsTerminal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use kidney_match::adapters::sanitize::RedactingMakeWriter;
use kidney_match::config::AppConfig;
use kidney_match::tui::App;

fn main() -> Result<()> {
    let config = AppConfig::from_env()?;

    // Logging to the terminal would corrupt the TUI's alternate screen.
    let interactive = std::io::stdout().is_terminal();
    let (writer, _guard) = if config.log_mode.use_file(interactive) {
        if let Some(parent) = config.log_file.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.log_file)?;
        tracing_appender::non_blocking(file)
    } else {
        tracing_appender::non_blocking(std::io::stdout())
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(RedactingMakeWriter::new(writer)))
        .init();

    tracing::info!(
        "Starting kidney-match (blank HLA policy: {})",
        config.blank_locus_policy
    );

    let mut app = App::new(&config)?;
    app.run()?;

    tracing::info!("kidney-match shutdown complete.");
    Ok(())
}

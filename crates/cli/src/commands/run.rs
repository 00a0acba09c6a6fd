//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::SessionSettings;
use std::time::Duration;
use tracing::{error, info};

use crate::cli::RunArgs;
use crate::session::{Session, SessionConfig};

/// Execute the `run` command
pub async fn run_session(args: &RunArgs) -> Result<()> {
    check_clock_args(args)?;
    let settings = load_settings(args)?;

    info!(
        host = %settings.host,
        port = settings.port,
        stream_id = settings.stream_id,
        sync_line = settings.sync_line,
        sinks = settings.sinks.len(),
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&settings);
        return Ok(());
    }

    let session_config = SessionConfig {
        settings,
        sample_rate: args.sample_rate,
        block_size: args.block_size,
        pulse_interval: args.pulse_interval,
        max_ticks: (args.max_ticks > 0).then_some(args.max_ticks),
        timeout: (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
    };

    info!("Starting session...");
    let stats = Session::new(session_config)
        .run(shutdown_signal())
        .await
        .context("Session execution failed")?;

    info!(
        emitted = stats.metrics.total_emitted,
        syncs = stats.metrics.total_syncs,
        duration_secs = stats.duration.as_secs_f64(),
        events_per_sec = format!("{:.2}", stats.events_per_sec()),
        "Session completed successfully"
    );
    stats.print_summary();

    info!("UDP Events finished");
    Ok(())
}

/// The simulated clock needs a positive, finite block duration
fn check_clock_args(args: &RunArgs) -> Result<()> {
    if !(args.sample_rate.is_finite() && args.sample_rate > 0.0) {
        anyhow::bail!("--sample-rate must be > 0 (got {})", args.sample_rate);
    }
    if args.block_size == 0 {
        anyhow::bail!("--block-size must be > 0");
    }
    Ok(())
}

/// Load settings from file (or defaults) and apply CLI overrides
fn load_settings(args: &RunArgs) -> Result<SessionSettings> {
    let mut settings = match &args.config {
        Some(path) => {
            info!(config = %path.display(), "Loading configuration");
            if !path.exists() {
                anyhow::bail!("Configuration file not found: {}", path.display());
            }
            config_loader::ConfigLoader::load_from_path(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?
        }
        None => {
            info!("No configuration file given, using defaults");
            SessionSettings::default()
        }
    };

    if let Some(ref host) = args.host {
        info!(host = %host, "Overriding listen host from CLI");
        settings.host = host.clone();
    }
    if let Some(port) = args.port {
        info!(port, "Overriding listen port from CLI");
        settings.port = port;
    }

    config_loader::ConfigLoader::validate(&settings).context("Invalid settings")?;
    Ok(settings)
}

/// Resolve on Ctrl+C or SIGTERM
///
/// A handler that cannot be installed is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(settings: &SessionSettings) {
    println!("\n=== Configuration Summary ===\n");
    println!("Listener:");
    println!("  Address: {}:{}", settings.host, settings.port);
    println!("  Poll interval: {}ms", settings.poll_interval_ms);
    println!("  Stop timeout: {}ms", settings.stop_timeout_ms);

    println!("\nSync:");
    println!("  Stream: {}", settings.stream_id);
    println!("  Line: {}", settings.sync_line);
    println!("  State: {:?}", settings.sync_state);
    println!("  Markers: {}", settings.emit_sync_markers);

    if !settings.sinks.is_empty() {
        println!("\nSinks ({}):", settings.sinks.len());
        for sink in &settings.sinks {
            println!("  - {} ({:?})", sink.name, sink.sink_type);
        }
    }

    println!();
}

//! tally: scale monitor CLI.
//!
//! Feeds a line-oriented stdin transport through the monitor core and
//! prints every monitor event as a JSON line on stdout. Logs go to stderr
//! and, when configured, to a rolling file.

mod cli;
mod source;

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use eyre::WrapErr;
use tally_core::hub::{MonitorEvent, MonitorHub};
use tally_core::service::MonitorService;
use tally_core::stabilizer::{Stability, StabilizerMode};
use tally_traits::MonotonicClock;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let args = cli::Cli::parse();

    let (cfg, found_config) = load_config(&args.config)?;
    init_tracing(&args, &cfg.logging);

    match &args.cmd {
        cli::Commands::CheckConfig => {
            if !found_config {
                eyre::bail!("config file not found: {}", args.config.display());
            }
            println!("config ok: {}", args.config.display());
            Ok(())
        }
        cli::Commands::Run { tagged, device } => {
            if !found_config {
                tracing::warn!(
                    path = %args.config.display(),
                    "config file not found; using reference defaults"
                );
            }
            run(cfg, *tagged, device.clone())
        }
    }
}

fn load_config(path: &Path) -> eyre::Result<(tally_config::Config, bool)> {
    if !path.exists() {
        return Ok((tally_config::Config::default(), false));
    }
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("reading config {}", path.display()))?;
    let cfg = tally_config::load_toml(&text)
        .wrap_err_with(|| format!("parsing config {}", path.display()))?;
    cfg.validate().wrap_err("config validation failed")?;
    Ok((cfg, true))
}

fn init_tracing(args: &cli::Cli, logging: &tally_config::Logging) {
    let level = logging
        .level
        .clone()
        .unwrap_or_else(|| args.log_level.clone());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries the event stream, so console logs go to stderr.
    let console = if args.json_logs {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed()
    };

    let file_layer = logging.file.as_deref().map(|file| {
        let path = Path::new(file);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .map_or_else(|| std::ffi::OsString::from("tally.log"), ToOwned::to_owned);
        let appender = match logging.rotation.as_deref() {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = cli::FILE_GUARD.set(guard);
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(writer)
            .boxed()
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .init();
}

fn run(cfg: tally_config::Config, tagged: bool, device: Option<String>) -> eyre::Result<()> {
    let mode = if tagged {
        StabilizerMode::Tagged
    } else {
        cfg.stabilizer.mode.into()
    };

    let hub = MonitorHub::builder()
        .with_mode(mode)
        .with_stabilizer((&cfg.stabilizer).into())
        .with_history((&cfg.history).into())
        .with_default_inventory((&cfg.inventory).into())
        .with_idle_device_ms(cfg.monitor.idle_device_ms)
        .build()
        .wrap_err("building monitor hub")?;

    let service = MonitorService::spawn(
        hub,
        MonotonicClock::new(),
        Duration::from_millis(cfg.monitor.prune_interval_ms),
    );
    let events = service.subscribe().wrap_err("subscribing to events")?;

    let printer = std::thread::spawn(move || {
        let stdout = std::io::stdout();
        for event in events {
            let line = event_json(&event);
            let mut out = stdout.lock();
            if writeln!(out, "{line}").is_err() {
                break;
            }
        }
    });

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || stop.store(true, Ordering::Relaxed))
            .wrap_err("installing ctrl-c handler")?;
    }

    let default_device = device.or(cfg.monitor.default_device_id);
    tracing::info!(?mode, "monitor running; reading lines from stdin");
    let mut source = source::StdinLineSource::new(default_device, stop);
    service.pump(&mut source)?;

    // Joining the service drops the hub and with it the subscription
    // senders, which ends the printer.
    drop(service);
    let _ = printer.join();
    Ok(())
}

fn stability_str(s: Stability) -> &'static str {
    match s {
        Stability::Stable => "stable",
        Stability::Unstable => "unstable",
    }
}

fn event_json(event: &MonitorEvent) -> String {
    let value = match event {
        MonitorEvent::Reading(r) => serde_json::json!({
            "type": "reading",
            "device_id": r.device_id,
            "weight_kg": r.weight_kg,
            "status": stability_str(r.stability),
            "item_count": r.item_count,
            "item_delta": r.item_delta,
            "at_ms": r.at_ms,
            "raw": r.raw_payload,
        }),
        MonitorEvent::CountChanged {
            device_id,
            item_delta,
            item_count,
            at_ms,
        } => serde_json::json!({
            "type": "count_changed",
            "device_id": device_id,
            "item_delta": item_delta,
            "item_count": item_count,
            "at_ms": at_ms,
        }),
        MonitorEvent::ConfigReset {
            device_id, state, ..
        } => serde_json::json!({
            "type": "config_reset",
            "device_id": device_id,
            "item_count": state.item_count,
        }),
        MonitorEvent::ManualCountSet {
            device_id,
            item_count,
        } => serde_json::json!({
            "type": "manual_count_set",
            "device_id": device_id,
            "item_count": item_count,
        }),
    };
    value.to_string()
}

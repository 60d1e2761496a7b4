mod check;
mod cli;
mod error_fmt;
mod logging;
#[cfg(unix)]
mod rt;
mod run;
mod sensors;

use clap::Parser;
use cli::{Cli, Commands, DEFAULT_CONFIG, JSON_MODE};
use std::path::Path;
use std::time::Duration;
use vehicle_config::Config;
use vehicle_core::{ProximityCfg, classify};

fn main() {
    // Usage errors exit with status 2 from inside parse().
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    if let Err(e) = color_eyre::install() {
        eprintln!("warning: color-eyre already installed: {e}");
    }

    if let Err(err) = real_main(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", error_fmt::format_error_json(&err));
        } else {
            eprintln!("{}", error_fmt::humanize(&err));
        }
        tracing::debug!(error = ?err, "exiting with error");
        std::process::exit(1);
    }
}

/// Explicit paths must exist; a missing default file means built-in defaults.
fn load_config(path: Option<&Path>) -> eyre::Result<Config> {
    match path {
        Some(p) => vehicle_config::load_file(p),
        None => {
            let p = Path::new(DEFAULT_CONFIG);
            if p.exists() {
                vehicle_config::load_file(p)
            } else {
                Ok(Config::default())
            }
        }
    }
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    let cfg = load_config(cli.config.as_deref())?;
    logging::init(&cli, &cfg.logging)?;
    tracing::debug!(config = ?cli.config, "configuration loaded");

    match cli.cmd {
        Commands::Run {
            duration_ms,
            sim_crash_at,
            rt,
            rt_prio,
            rt_lock,
        } => {
            if rt {
                #[cfg(unix)]
                rt::setup_rt_once(rt_prio, rt_lock);
                #[cfg(not(unix))]
                {
                    let _ = (rt_prio, rt_lock);
                    tracing::warn!("--rt is not supported on this platform");
                }
            }
            let opts = run::RunOpts {
                duration: duration_ms.map(Duration::from_millis),
                sim_crash_at,
            };
            run::run(&cfg, opts, cli.json)
        }
        Commands::SelfCheck => check::self_check(&cfg, cli.json),
        Commands::Classify {
            distance,
            direction,
        } => {
            let direction: vehicle_core::Direction = direction.into();
            let zone = classify(distance, direction, &ProximityCfg::from(&cfg.proximity));
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "zone": zone.as_str(),
                        "distance_cm": distance,
                        "direction": direction.as_str(),
                    })
                );
            } else {
                println!("{zone}");
            }
            Ok(())
        }
    }
}

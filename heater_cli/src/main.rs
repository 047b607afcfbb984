//! `heaterctl`: run the heater tick loop against the simulated plant, tune and
//! persist gains, and inspect configured heaters.
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod cli;
mod commands;
mod error_fmt;
mod logging;
mod report;
mod rt;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::WrapErr;

use crate::cli::{Cli, Commands, JSON_MODE};
use crate::commands::RunArgs;
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let _ = color_eyre::install();
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(err) = real_main(cli) {
        tracing::error!(error = %err, "heaterctl failed");
        if cli::json_mode() {
            println!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    let loaded = heater_config::load_file(&cli.config);

    // Logging comes up even when the config is broken so the failure is logged.
    let default_logging = heater_config::Logging::default();
    let logging = loaded.as_ref().map_or(&default_logging, |c| &c.logging);
    let level = cli
        .log_level
        .clone()
        .or_else(|| logging.level.clone())
        .unwrap_or_else(|| "info".to_string());
    logging::init_tracing(cli.json, &level, logging)?;

    let cfg = loaded?;
    tracing::debug!(config = %cli.config.display(), heaters = cfg.heaters.len(), "config loaded");

    match cli.cmd {
        Commands::Run {
            targets,
            ticks,
            fast,
            every,
            stats,
            rt,
            rt_prio,
            rt_lock,
            detach,
            disconnect,
            stick,
            fault_after,
        } => {
            let shutdown = Arc::new(AtomicBool::new(false));
            {
                let flag = Arc::clone(&shutdown);
                ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
                    .wrap_err("install Ctrl-C handler")?;
            }
            let args = RunArgs {
                targets,
                ticks,
                fast,
                every,
                stats,
                rt,
                rt_prio,
                rt_lock,
                detach,
                disconnect,
                stick,
                fault_after,
            };
            commands::run(&cfg, &args, &shutdown)
        }
        Commands::SetGain {
            heater,
            kind,
            value,
        } => commands::set_gain(&cfg, &heater, kind, value),
        Commands::Show { heater } => commands::show(&cfg, heater.as_deref()),
        Commands::SelfCheck => commands::self_check(&cfg),
    }
}

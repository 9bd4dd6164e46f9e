#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod app;
mod average;
mod cli;
mod error_fmt;
mod logging;
mod ops;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;

use crate::app::{App, load_config};
use crate::average::AverageArgs;
use crate::cli::{Cli, Commands, CrsCommands, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(e) = color_eyre::install() {
        eprintln!("failed to install error hook: {e}");
    }

    if let Err(err) = run(cli) {
        tracing::error!(error = %format!("{err:#}"), "command failed");
        if JSON_MODE.get().copied().unwrap_or(false) {
            println!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}

fn run(cli: Cli) -> eyre::Result<()> {
    let cfg = load_config(cli.config.as_deref())?;
    logging::init_tracing(cli.json, &cli.log_level, &cfg.logging)?;
    tracing::debug!(command = ?cli.cmd, "starting");

    let app = App::new(cfg, cli.json);
    match cli.cmd {
        Commands::Project {
            easting,
            northing,
            bearing,
            distance,
            crs,
        } => ops::project(&app, easting, northing, bearing, distance, crs.as_deref()),
        Commands::Bearing {
            from_easting,
            from_northing,
            to_easting,
            to_northing,
        } => ops::bearing(
            &app,
            (from_easting, from_northing),
            (to_easting, to_northing),
        ),
        Commands::Transform { from, to, x, y } => ops::transform(&app, &from, &to, x, y),
        Commands::Crs { cmd } => match cmd {
            CrsCommands::List { filter } => ops::crs_list(&app, filter.as_deref()),
            CrsCommands::Show { code } => ops::crs_show(&app, &code),
        },
        Commands::Locate => ops::locate(&app),
        Commands::Average {
            warmup_ms,
            collection_ms,
            fixture,
            extra_batches,
            drop,
            name,
        } => {
            let cancel = Arc::new(AtomicBool::new(false));
            let flag = Arc::clone(&cancel);
            if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
                tracing::warn!(error = %e, "Ctrl-C handler not installed");
            }
            let args = AverageArgs {
                warmup_ms,
                collection_ms,
                fixture,
                extra_batches,
                drop,
                name,
            };
            average::run(&app, &args, &cancel)
        }
    }
}

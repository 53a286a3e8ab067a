mod cli;
mod commands;
mod error;
mod notify;
mod output;

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use kubecloud_config as config;
use kubecloud_core::{App, FileStorage, KeyValueStore, MemoryStorage};

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::notify::NotificationPrinter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8, debug_logging: bool) {
    let filter = match verbosity {
        0 if debug_logging => "debug",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands must work even when the file is broken
        Command::Config(args) => {
            init_tracing(cli.global.verbose, false);
            commands::config_cmd::handle(args, &cli.global)
        }

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "kubecloud", &mut std::io::stdout());
            Ok(())
        }

        cmd => {
            let path = commands::config_cmd::resolve_path(&cli.global);
            let loaded = config::load_config_from(&path);
            init_tracing(
                cli.global.verbose,
                loaded.as_ref().is_ok_and(|c| c.debug_logging),
            );
            let app_config = loaded?.to_app_config()?;

            let storage: Arc<dyn KeyValueStore> = match app_config.storage_path {
                Some(ref file) => Arc::new(FileStorage::new(file.clone())),
                None => Arc::new(MemoryStorage::new()),
            };
            let app = App::new(app_config, storage)?;
            if let Some(user) = app.session().restore()? {
                tracing::debug!(email = %user.email, "restored session");
            }

            let color = output::should_color(cli.global.color);
            let printer = NotificationPrinter::spawn(app.notifications(), color, cli.global.quiet);

            tracing::debug!(command = ?cmd, "dispatching command");
            let result = commands::dispatch(cmd, &app, &cli.global, color).await;
            printer.finish();
            result
        }
    }
}

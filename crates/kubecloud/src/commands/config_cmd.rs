//! Config subcommand handlers.

use std::path::PathBuf;

use kubecloud_config::{self as config, Config};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

/// The file `--config` points at, or the platform default.
pub fn resolve_path(global: &GlobalOpts) -> PathBuf {
    global.config.clone().unwrap_or_else(config::config_path)
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let path = resolve_path(global);

    match args.command {
        ConfigCommand::Init { force } => {
            if path.exists() && !force {
                return Err(CliError::ConfigExists {
                    path: path.display().to_string(),
                });
            }
            config::save_config_to(&Config::default(), &path)?;
            if !global.quiet {
                eprintln!("Wrote default configuration to {}", path.display());
            }
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = config::load_config_from(&path)?;
            // Surface validation problems here rather than on the next command.
            let resolved = cfg.to_app_config()?;
            let out = match global.output {
                OutputFormat::Table | OutputFormat::Plain => {
                    let mut text = toml::to_string_pretty(&cfg)?;
                    if let (None, Some(storage)) = (&cfg.storage_path, &resolved.storage_path) {
                        text.push_str(&format!(
                            "\n# storage_path (default) = \"{}\"",
                            storage.display()
                        ));
                    }
                    text.trim_end().to_owned()
                }
                format => output::render_single(format, &cfg, |_| String::new(), |_| String::new())?,
            };
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&path.display().to_string(), false);
            Ok(())
        }
    }
}

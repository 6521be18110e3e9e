//! Config subcommand implementation.

use crate::config::{AppSettings, Paths};
use crate::error::{CliError, CliResult};
use crate::output;
use clap::{Parser, Subcommand};
use std::path::Path;

/// Show or initialise settings.
#[derive(Parser, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective settings
    Show,

    /// Write a settings file with default values
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

impl ConfigCommand {
    /// Execute the config command against `custom` or the default settings file.
    pub fn execute(&self, custom: Option<&Path>) -> CliResult<()> {
        let file = match custom {
            Some(path) => path.to_path_buf(),
            None => Paths::get()?.settings_file(),
        };

        match self.action {
            ConfigAction::Show => {
                let settings = if file.exists() {
                    AppSettings::load_from(&file)?
                } else {
                    AppSettings::default()
                };
                let json = serde_json::to_string_pretty(&settings)
                    .map_err(|e| CliError::Other(e.to_string()))?;
                output::print_info(&format!("Settings file: {}", file.display()));
                println!("{}", json);
            }
            ConfigAction::Init { force } => {
                if file.exists() && !force {
                    return Err(CliError::Other(format!(
                        "{} already exists (use --force to overwrite)",
                        file.display()
                    )));
                }
                AppSettings::default().save_to(&file)?;
                output::print_success(&format!("Wrote default settings to {}", file.display()));
            }
        }
        Ok(())
    }
}

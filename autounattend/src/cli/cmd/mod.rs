use std::path::PathBuf;

use anyhow::Result;

use crate::config::presets::Preset;

pub mod generate;
pub mod init;
pub mod parse;
pub mod script;

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub enum ScriptFormat {
    /// Batch file with the commands as literal lines
    Batch,
    /// PowerShell script with each command wrapped in a process launch
    Powershell,
}

#[derive(clap::Subcommand, Debug, Clone)]
pub enum Commands {
    /// Generate an answer file from a configuration
    Generate {
        /// The configuration JSON file
        #[clap(index = 1)]
        config: PathBuf,

        /// Output path (defaults to ./autounattend.xml)
        #[clap(long)]
        output: Option<PathBuf>,

        /// Replace the random computer-name mode with a concrete generated
        /// name instead of the installer wildcard
        #[clap(long, num_args = 0)]
        resolve_computer_name: bool,
    },

    /// Recover a configuration from an existing answer file
    Parse {
        /// The autounattend.xml file
        #[clap(index = 1)]
        xml: PathBuf,

        /// Output path for the recovered configuration (defaults to stdout)
        #[clap(long)]
        output: Option<PathBuf>,
    },

    /// Export the system tweak commands as a standalone script
    Script {
        /// The configuration JSON file
        #[clap(index = 1)]
        config: PathBuf,

        /// Target shell
        #[clap(long, value_enum, default_value = "batch")]
        format: ScriptFormat,

        /// Output path (defaults to stdout)
        #[clap(long)]
        output: Option<PathBuf>,
    },

    /// Write a starting configuration file
    Init {
        /// Start from a built-in preset instead of bare defaults
        #[clap(long, value_enum)]
        preset: Option<Preset>,

        /// Output path (defaults to ./unattend-config.json)
        #[clap(long)]
        output: Option<PathBuf>,
    },
}

impl Commands {
    pub fn run(self) -> Result<()> {
        match self {
            Commands::Generate {
                config,
                output,
                resolve_computer_name,
            } => generate::run(&config, output, resolve_computer_name),
            Commands::Parse { xml, output } => parse::run(&xml, output),
            Commands::Script {
                config,
                format,
                output,
            } => script::run(&config, format, output),
            Commands::Init { preset, output } => init::run(preset, output),
        }
    }
}

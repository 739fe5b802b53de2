mod decode;
mod settings;

use std::path::PathBuf;

use clap::{Args, Subcommand};
use log::LevelFilter;

use crate::domain::DspType;
use crate::settings::{EnvScriptError, InstallVars};

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the resolved installation settings as JSON
    Show(SourceArgs),
    /// Validate the installation settings and any existing DSP config
    Check(SourceArgs),
    /// Write the DSP config file for the backend
    WriteConfig {
        #[command(flatten)]
        source: SourceArgs,
        /// Write here instead of CONFIGURATION_FILE
        #[arg(long)]
        output: Option<PathBuf>,
        /// Replace an existing config file
        #[arg(long)]
        force: bool,
    },
    /// Print the resolved variables as `export` lines for an installer to source
    Env(SourceArgs),
    /// Decode a SigmaStudio packet header given as hex
    DecodeHeader {
        /// DSP family; defaults to DSP_TYPE from the installation settings
        #[arg(long)]
        dsp_type: Option<DspType>,
        /// Packet bytes in hex, whitespace and `:` separators allowed
        hex: String,
    },
}

/// Where installation variables come from, on top of the defaults.
#[derive(Debug, Args)]
pub struct SourceArgs {
    /// Installation env script with `NAME=value` assignments
    #[arg(long)]
    pub env_file: Option<PathBuf>,
}

impl SourceArgs {
    /// Defaults, then the env script, then the process environment.
    fn load(&self) -> Result<InstallVars, EnvScriptError> {
        let vars = match &self.env_file {
            Some(path) => InstallVars::load_env_script(path)?,
            None => InstallVars::defaults(),
        };
        Ok(vars.overlay_process_env())
    }
}

/// Initialize `env_logger` on stderr. `RUST_LOG` overrides `verbosity`.
pub fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .parse_default_env()
        .init();
}

/// Run one subcommand, writing its result to stdout.
pub fn run(command: Commands) -> miette::Result<()> {
    match command {
        Commands::Show(source) => settings::show(&source),
        Commands::Check(source) => settings::check(&source),
        Commands::WriteConfig {
            source,
            output,
            force,
        } => settings::write_config(&source, output.as_deref(), force),
        Commands::Env(source) => settings::env(&source),
        Commands::DecodeHeader { dsp_type, hex } => decode::run(dsp_type, &hex),
    }
}

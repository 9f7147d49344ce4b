//! CLI module for extrabind.
//!
//! Subcommands:
//! - `generate`: Write binders and the registrations file
//! - `check`: Validate marked fields without writing anything

mod check;
mod generate;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::Config;

pub use check::CheckCommand;
pub use generate::GenerateCommand;

/// extrabind - generated binders for caller-supplied field values
#[derive(Parser)]
#[command(name = "extrabind")]
#[command(about = "Generate binders that populate #[extra] fields from a value registry")]
#[command(version)]
pub struct App {
    /// Run in verbose mode
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate binders for every #[extra] field of a crate
    Generate(GenerateCommand),

    /// Validate #[extra] fields and print the binding graph
    Check(CheckCommand),
}

/// Source options shared by all subcommands; they override the config.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Source directory of the crate
    #[arg(long)]
    pub src: Option<PathBuf>,

    /// Crate name used for type paths
    #[arg(long)]
    pub crate_name: Option<String>,
}

impl SourceArgs {
    /// Loaded config with command-line overrides applied.
    pub fn config(&self) -> color_eyre::Result<Config> {
        let mut config = Config::load()?;
        if let Some(src) = &self.src {
            config.generate.source_dir = src.clone();
        }
        if let Some(name) = &self.crate_name {
            config.project.crate_name = Some(name.clone());
        }
        Ok(config)
    }
}

impl App {
    /// Run the CLI application.
    pub fn run(self) -> color_eyre::Result<()> {
        match self.command {
            Command::Generate(cmd) => cmd.run(),
            Command::Check(cmd) => cmd.run(),
        }
    }
}

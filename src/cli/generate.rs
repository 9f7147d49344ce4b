//! Generate subcommand - write binders for a crate.

use std::path::PathBuf;

use clap::Parser;

use super::SourceArgs;
use crate::error::AppError;
use crate::generate::{generate, GenerateOptions};

/// Generate binders and the registrations file.
#[derive(Parser)]
pub struct GenerateCommand {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Output directory for generated files
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

impl GenerateCommand {
    /// Run the generate command.
    pub fn run(self) -> color_eyre::Result<()> {
        let mut config = self.source.config()?;
        if let Some(out) = self.out {
            config.generate.out_dir = out;
        }
        let options = GenerateOptions::from_config(&config)?;
        tracing::info!(
            "Generating binders for {} from {}",
            options.crate_name,
            options.source_dir.display()
        );

        let report = generate(&options)?;
        tracing::info!(
            "{} binder(s): {} file(s) written, {} unchanged, {} removed",
            report.binders,
            report.written.len(),
            report.unchanged.len(),
            report.removed.len()
        );

        if !report.diagnostics.is_empty() {
            return Err(AppError::Validation(report.diagnostics).into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use serial_test::serial;

    fn command() -> GenerateCommand {
        GenerateCommand {
            source: SourceArgs {
                src: Some(PathBuf::from("lib")),
                crate_name: Some("app".to_string()),
            },
            out: Some(PathBuf::from("gen")),
        }
    }

    #[test]
    #[serial]
    fn test_generate_writes_to_overridden_paths() {
        Jail::expect_with(|jail| {
            std::fs::create_dir_all(jail.directory().join("lib")).unwrap();
            jail.create_file("lib/lib.rs", "pub struct Base { #[extra] pub id: Option<String> }")?;

            command().run().unwrap();

            assert!(jail.directory().join("gen/app.binders.rs").exists());
            assert!(jail.directory().join("gen/registrations.rs").exists());
            Ok(())
        });
    }

    #[test]
    #[serial]
    fn test_generate_fails_after_writing_valid_binders() {
        Jail::expect_with(|jail| {
            std::fs::create_dir_all(jail.directory().join("lib")).unwrap();
            jail.create_file(
                "lib/lib.rs",
                "pub struct Base { #[extra] pub id: Option<String>, #[extra(1)] pub bad: Option<u8> }",
            )?;

            let err = command().run().unwrap_err();

            assert!(matches!(err.downcast_ref::<AppError>(), Some(AppError::Validation(_))));
            assert!(jail.directory().join("gen/app.binders.rs").exists());
            Ok(())
        });
    }
}

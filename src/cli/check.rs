//! Check subcommand - validate without writing.

use clap::Parser;
use serde::Serialize;

use super::SourceArgs;
use crate::emit::BinderShape;
use crate::error::AppError;
use crate::generate::{analyze, load_program};
use crate::graph::Binding;
use crate::scan::Diagnostic;

/// Validate #[extra] fields and show what would be generated.
#[derive(Parser)]
pub struct CheckCommand {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct CheckOutput {
    binders: Vec<BinderSummary>,
    diagnostics: Vec<Diagnostic>,
}

#[derive(Serialize)]
struct BinderSummary {
    owner: String,
    binder: String,
    parent: Option<String>,
    shape: BinderShape,
    bindings: Vec<BindingSummary>,
}

#[derive(Serialize)]
struct BindingSummary {
    field: String,
    key: String,
    value_type: String,
}

impl From<&Binding> for BindingSummary {
    fn from(binding: &Binding) -> Self {
        Self {
            field: binding.name.clone(),
            key: binding.key.clone(),
            value_type: binding.value_type.clone(),
        }
    }
}

impl CheckCommand {
    /// Run the check command.
    pub fn run(self) -> color_eyre::Result<()> {
        let config = self.source.config()?;
        let crate_name = config.project.crate_name()?;
        let program = load_program(&crate_name, &config.generate.source_dir)?;
        let analysis = analyze(program)?;

        let output = CheckOutput {
            binders: analysis
                .sets
                .values()
                .map(|set| BinderSummary {
                    owner: set.owner_path.to_string(),
                    binder: set.binder_path.to_string(),
                    parent: set.parent.as_ref().map(|p| p.binder_path.to_string()),
                    shape: BinderShape::of(set),
                    bindings: set.bindings.iter().map(BindingSummary::from).collect(),
                })
                .collect(),
            diagnostics: analysis.scan.diagnostics,
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            print_summary(&output);
        }

        if !output.diagnostics.is_empty() {
            return Err(AppError::Validation(output.diagnostics).into());
        }
        Ok(())
    }
}

fn print_summary(output: &CheckOutput) {
    for binder in &output.binders {
        match &binder.parent {
            Some(parent) => println!("{} -> {} (extends {})", binder.owner, binder.binder, parent),
            None => println!("{} -> {}", binder.owner, binder.binder),
        }
        for binding in &binder.bindings {
            println!("    {}: {} <- \"{}\"", binding.field, binding.value_type, binding.key);
        }
    }
    for diagnostic in &output.diagnostics {
        println!("error: {}", diagnostic);
    }
}

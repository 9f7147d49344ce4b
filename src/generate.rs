//! Generation pass.
//!
//! Loads every source file of a crate into a [`Program`], validates marked
//! elements, builds the binding graph and writes one binder file per module
//! plus the registrations file. Validation problems never stop the pass:
//! binders are still written for every valid binding and the problems are
//! returned in the [`Report`].

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::config::{Config, ConfigError};
use crate::emit;
use crate::error::AppError;
use crate::graph::{self, BindingMap};
use crate::model::source::{load_file, module_path_for};
use crate::model::Program;
use crate::scan::{self, Diagnostic, ScanResult};

/// Suffix of per-module binder files; anything else in the output
/// directory is left alone.
const BINDERS_SUFFIX: &str = ".binders.rs";

/// Inputs of one pass.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub crate_name: String,
    pub source_dir: PathBuf,
    pub out_dir: PathBuf,
    pub registrations_file: String,
}

impl GenerateOptions {
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        Ok(Self {
            crate_name: config.project.crate_name()?,
            source_dir: config.generate.source_dir.clone(),
            out_dir: config.generate.out_dir.clone(),
            registrations_file: config.generate.registrations_file.clone(),
        })
    }
}

/// Validated and linked view of a crate.
#[derive(Debug)]
pub struct Analysis {
    pub program: Program,
    pub scan: ScanResult,
    pub sets: BindingMap,
}

/// Outcome of a pass.
#[derive(Debug, Default)]
pub struct Report {
    pub written: Vec<PathBuf>,
    pub unchanged: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
    pub binders: usize,
    pub diagnostics: Vec<Diagnostic>,
}

/// Reads every `.rs` file under `source_dir` into a program.
pub fn load_program(crate_name: &str, source_dir: &Path) -> Result<Program, AppError> {
    let mut program = Program::new();
    for file in source_files(source_dir)? {
        let Some(module) = module_path_for(crate_name, source_dir, &file) else {
            tracing::debug!("Skipping {}, not part of the library", file.display());
            continue;
        };
        let content = fs::read_to_string(&file).map_err(|e| AppError::io(&file, e))?;
        let syntax = syn::parse_file(&content).map_err(|source| AppError::Parse {
            path: file.clone(),
            source,
        })?;
        load_file(&mut program, &module, &syntax);
    }
    tracing::debug!(
        "Loaded {} types and {} marked elements from {}",
        program.type_count(),
        program.marked_fields().len(),
        source_dir.display()
    );
    Ok(program)
}

/// Validates the marked elements of a program and links the valid ones.
pub fn analyze(program: Program) -> Result<Analysis, AppError> {
    let scan = scan::scan(&program);
    for diagnostic in &scan.diagnostics {
        tracing::error!("{}", diagnostic);
    }
    let sets = graph::build(&program, &scan)?;
    Ok(Analysis {
        program,
        scan,
        sets,
    })
}

/// Renders all output files of a graph, keyed by file name.
pub fn render(sets: &BindingMap, registrations_file: &str) -> Result<BTreeMap<String, String>, AppError> {
    let binders = emit::emit_all(sets).map_err(AppError::Emit)?;
    let mut files = emit::render_modules(&binders);
    files.insert(
        registrations_file.to_string(),
        emit::render_registrations(sets).map_err(AppError::Emit)?,
    );
    Ok(files)
}

/// Runs a full pass and writes its output.
pub fn generate(options: &GenerateOptions) -> Result<Report, AppError> {
    let program = load_program(&options.crate_name, &options.source_dir)?;
    let analysis = analyze(program)?;
    let files = render(&analysis.sets, &options.registrations_file)?;

    fs::create_dir_all(&options.out_dir).map_err(|e| AppError::io(&options.out_dir, e))?;

    let mut report = Report {
        binders: analysis.sets.len(),
        diagnostics: analysis.scan.diagnostics,
        ..Report::default()
    };
    for (name, content) in &files {
        let path = options.out_dir.join(name);
        if write_if_changed(&path, content)? {
            tracing::info!("Wrote {}", path.display());
            report.written.push(path);
        } else {
            report.unchanged.push(path);
        }
    }
    report.removed = remove_stale(&options.out_dir, &files.keys().cloned().collect())?;

    Ok(report)
}

/// Runs a pass from a build script: sources of the package being built,
/// output in `OUT_DIR`. Validation problems become `cargo:warning` lines
/// and fail the build.
pub fn build_script() -> Result<Report, AppError> {
    let manifest_dir = PathBuf::from(cargo_env("CARGO_MANIFEST_DIR")?);
    let source_dir = manifest_dir.join("src");
    println!("cargo:rerun-if-changed={}", source_dir.display());

    let options = GenerateOptions {
        crate_name: cargo_env("CARGO_PKG_NAME")?.replace('-', "_"),
        source_dir,
        out_dir: PathBuf::from(cargo_env("OUT_DIR")?),
        registrations_file: Config::default().generate.registrations_file,
    };
    let report = generate(&options)?;
    if report.diagnostics.is_empty() {
        return Ok(report);
    }
    for diagnostic in &report.diagnostics {
        println!("cargo:warning={}", diagnostic);
    }
    Err(AppError::Validation(report.diagnostics))
}

fn cargo_env(name: &str) -> Result<String, AppError> {
    std::env::var(name).map_err(|_| {
        AppError::Config(ConfigError::from(figment::Error::from(format!(
            "{} is not set; build_script must run from a build script",
            name
        ))))
    })
}

/// All `.rs` files below `dir`, sorted, generated files excluded.
fn source_files(dir: &Path) -> Result<Vec<PathBuf>, AppError> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        let entries = fs::read_dir(&current).map_err(|e| AppError::io(&current, e))?;
        for entry in entries {
            let path = entry.map_err(|e| AppError::io(&current, e))?.path();
            if path.is_dir() {
                pending.push(path);
            } else if is_source_file(&path) {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

fn is_source_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.ends_with(".rs") && !name.ends_with(BINDERS_SUFFIX)
}

/// Atomically replaces `path` unless it already holds `content`.
fn write_if_changed(path: &Path, content: &str) -> Result<bool, AppError> {
    if fs::read_to_string(path).is_ok_and(|existing| existing == content) {
        return Ok(false);
    }
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut file = NamedTempFile::new_in(dir).map_err(|e| AppError::io(dir, e))?;
    file.write_all(content.as_bytes())
        .map_err(|e| AppError::io(file.path(), e))?;
    file.persist(path).map_err(|e| AppError::io(path, e.error))?;
    Ok(true)
}

/// Deletes binder files left over from modules that no longer have binders.
fn remove_stale(out_dir: &Path, keep: &BTreeSet<String>) -> Result<Vec<PathBuf>, AppError> {
    let mut removed = Vec::new();
    let entries = fs::read_dir(out_dir).map_err(|e| AppError::io(out_dir, e))?;
    for entry in entries {
        let path = entry.map_err(|e| AppError::io(out_dir, e))?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.ends_with(BINDERS_SUFFIX) && !keep.contains(name) {
            fs::remove_file(&path).map_err(|e| AppError::io(&path, e))?;
            tracing::info!("Removed stale {}", path.display());
            removed.push(path);
        }
    }
    removed.sort();
    Ok(removed)
}

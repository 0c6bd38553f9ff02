use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context};
use colored::Colorize;
use pathstore_sdk::{AnyArray, PathStore, StoreConfig};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref(), cli.separator)?;
    let format = cli.format;
    let mut out = std::io::stdout().lock();
    match cli.command {
        Command::Init(args) => cmd_init(&mut out, &config, &args.store, format),
        Command::Ls(args) => cmd_ls(&mut out, &config, &args.store, format),
        Command::Show(args) => cmd_show(&mut out, &config, &args.store, &args.path, format),
        Command::Stats(args) => cmd_stats(&mut out, &config, &args.store, format),
        Command::Cat(args) => cmd_cat(&mut out, &config, &args.store, &args.path, format),
    }
}

fn load_config(file: Option<&Path>, separator: Option<String>) -> anyhow::Result<StoreConfig> {
    let mut config = match file {
        Some(path) => StoreConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => StoreConfig::default(),
    };
    if let Some(separator) = separator {
        config.separator = separator;
    }
    config.validate()?;
    debug!(separator = %config.separator, suffix = %config.file_suffix, "resolved store config");
    Ok(config)
}

/// Open a store that must already exist on disk.
fn open_existing(config: &StoreConfig, store: &Path) -> anyhow::Result<PathStore> {
    let file = config.normalize_identifier(store);
    if !file.exists() {
        bail!("no store at {}", file.display());
    }
    Ok(PathStore::open_with_config(&file, config.clone())?)
}

fn print_json<W: Write, T: Serialize + ?Sized>(out: &mut W, value: &T) -> anyhow::Result<()> {
    writeln!(out, "{}", serde_json::to_string_pretty(value)?)?;
    Ok(())
}

fn cmd_init<W: Write>(
    out: &mut W,
    config: &StoreConfig,
    store: &Path,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let store = PathStore::open_with_config(store, config.clone())?;
    let location = store
        .identifier()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    match format {
        OutputFormat::Json => print_json(out, &json!({ "initialized": location }))?,
        OutputFormat::Text => writeln!(
            out,
            "{} Initialized store {}",
            "✓".green().bold(),
            location.bold()
        )?,
    }
    Ok(())
}

fn cmd_ls<W: Write>(
    out: &mut W,
    config: &StoreConfig,
    store: &Path,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let store = open_existing(config, store)?;
    let entries = store.entries()?;
    match format {
        OutputFormat::Json => {
            let rows: Vec<Value> = entries
                .iter()
                .map(|(path, id)| json!({ "path": path, "id": id }))
                .collect();
            print_json(out, &rows)?;
        }
        OutputFormat::Text if entries.is_empty() => writeln!(out, "Store is empty.")?,
        OutputFormat::Text => {
            for (path, id) in &entries {
                writeln!(out, "{:>6}  {}", id.to_string().dimmed(), path)?;
            }
        }
    }
    Ok(())
}

fn cmd_show<W: Write>(
    out: &mut W,
    config: &StoreConfig,
    store: &Path,
    path: &str,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let store = open_existing(config, store)?;
    let info = store.describe(path)?;
    match format {
        OutputFormat::Json => print_json(out, &info)?,
        OutputFormat::Text => {
            writeln!(out, "{} {}", info.kind.to_string().cyan(), info.path.bold())?;
            writeln!(out, "  Row: {}", info.id.to_string().yellow())?;
            writeln!(out, "  Size: {} bytes", info.size)?;
            if let Some(dtype) = info.dtype {
                writeln!(out, "  Dtype: {dtype}")?;
                writeln!(out, "  Shape: {}", info.annotation)?;
            } else if !info.annotation.is_empty() {
                writeln!(out, "  Info: {}", info.annotation)?;
            }
        }
    }
    Ok(())
}

fn cmd_stats<W: Write>(
    out: &mut W,
    config: &StoreConfig,
    store: &Path,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let store = open_existing(config, store)?;
    let stats = store.stats()?;
    match format {
        OutputFormat::Json => print_json(out, &stats)?,
        OutputFormat::Text => {
            writeln!(out, "Paths: {}", stats.mapped_paths.to_string().bold())?;
            writeln!(out, "Array rows: {}", stats.array_rows)?;
            writeln!(out, "Object rows: {}", stats.object_rows)?;
            writeln!(out, "Last row id: {}", stats.last_row_id)?;
        }
    }
    Ok(())
}

fn cmd_cat<W: Write>(
    out: &mut W,
    config: &StoreConfig,
    store: &Path,
    path: &str,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let store = open_existing(config, store)?;
    let array = store.load_any_array(path)?;
    match format {
        OutputFormat::Json => print_json(
            out,
            &json!({
                "path": path,
                "dtype": array.dtype().name(),
                "shape": array.shape().dims(),
                "data": array_values(&array)?,
            }),
        )?,
        OutputFormat::Text => {
            writeln!(
                out,
                "{} {} {}",
                path.bold(),
                array.dtype().to_string().cyan(),
                array.shape().descriptor()
            )?;
            for row in text_rows(&array) {
                writeln!(out, "{row}")?;
            }
        }
    }
    Ok(())
}

fn array_values(array: &AnyArray) -> anyhow::Result<Value> {
    Ok(match array {
        AnyArray::Bool(a) => serde_json::to_value(a.as_slice())?,
        AnyArray::U8(a) => serde_json::to_value(a.as_slice())?,
        AnyArray::I32(a) => serde_json::to_value(a.as_slice())?,
        AnyArray::I64(a) => serde_json::to_value(a.as_slice())?,
        AnyArray::F32(a) => serde_json::to_value(a.as_slice())?,
        AnyArray::F64(a) => serde_json::to_value(a.as_slice())?,
    })
}

/// One bracketed line per innermost row, in row-major order.
fn text_rows(array: &AnyArray) -> Vec<String> {
    let values = array.elements_as_strings();
    let width = match array.shape().dims().last() {
        Some(&n) if n > 0 && array.shape().ndim() > 1 => n,
        _ => values.len().max(1),
    };
    values
        .chunks(width)
        .map(|row| format!("[{}]", row.join(", ")))
        .collect()
}

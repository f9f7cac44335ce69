//! List command handler
//!
//! One reconciliation pass without watching: prints the display list in
//! display order, newest first.

use serde::Serialize;

use crate::cli::{ListArgs, OutputFormat};
use crate::server::events::DisplayEntry;
use crate::server::ImageStore;

use super::{to_json, CommandContext};

#[derive(Serialize)]
struct ListOutput {
    directory: String,
    available_width: u32,
    missing_directory: bool,
    images: Vec<DisplayEntry>,
    skipped: Vec<SkippedFile>,
}

#[derive(Serialize)]
struct SkippedFile {
    path: String,
    error: String,
}

/// Scan a directory once and print the display list
pub fn run_list(args: &ListArgs, ctx: &CommandContext) -> crate::Result<String> {
    let mut config = ctx.config.clone();
    if let Some(dir) = &args.dir {
        config.intake.directory = dir.clone();
    }
    if let Some(width) = args.width {
        config.display.viewport_width = width;
    }

    let mut store = ImageStore::new(
        config.intake.directory.clone(),
        config.display.scaling,
        config.available_width(),
    );
    let report = store.refresh()?;

    let output = ListOutput {
        directory: config.intake.directory.display().to_string(),
        available_width: config.available_width(),
        missing_directory: report.missing_directory,
        images: store.entries(),
        skipped: report
            .skipped
            .iter()
            .map(|(path, error)| SkippedFile {
                path: path.display().to_string(),
                error: error.clone(),
            })
            .collect(),
    };

    match ctx.format {
        OutputFormat::Json => Ok(format!("{}\n", to_json(&output)?)),
        OutputFormat::Text => Ok(render_text(&output, ctx.verbose)),
    }
}

fn render_text(output: &ListOutput, verbose: bool) -> String {
    let mut text = String::new();
    if output.missing_directory {
        text.push_str(&format!("{} does not exist\n", output.directory));
        return text;
    }

    text.push_str(&format!(
        "{} ({} images)\n",
        output.directory,
        output.images.len()
    ));
    for entry in &output.images {
        text.push_str(&format!(
            "  {:>5}x{:<5} {}  {}\n",
            entry.width,
            entry.height,
            entry.modified,
            entry.path.display()
        ));
    }

    if !output.skipped.is_empty() {
        text.push_str(&format!("skipped {} unreadable files\n", output.skipped.len()));
        if verbose {
            for skipped in &output.skipped {
                text.push_str(&format!("  {}: {}\n", skipped.path, skipped.error));
            }
        }
    }
    text
}

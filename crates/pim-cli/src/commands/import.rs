//! `pim import` command implementation
//!
//! Runs one file through the whole import workflow, shows the review, and
//! approves the accepted rows.

use crate::api::ApiClient;
use crate::config::ImportConfig;
use crate::error::{ImportError, Result};
use crate::import::{
    ChannelSink, ImportEvent, ImportSession, SelectedFile, SessionPhase, SessionSnapshot,
};
use crate::progress::{format_bytes, ImportReporter};
use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};
use pim_common::types::{JobStatus, ProductRow, ResultArtifact};
use std::io::{self, IsTerminal};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::info;

/// Import `file`, then approve all rows or the 1-based `rows` of the review table.
pub async fn run(config: &ImportConfig, file: &Path, yes: bool, rows: &[usize]) -> Result<()> {
    config.validate()?;

    let selected = SelectedFile::from_path(file).await?;
    println!(
        "Importing {} ({})",
        selected.name().cyan(),
        format_bytes(selected.len() as u64)
    );

    let api = Arc::new(ApiClient::from_config(config)?);
    let (tx, mut events) = tokio::sync::mpsc::unbounded_channel();
    let session = ImportSession::new(api, config.session_settings(), Arc::new(ChannelSink::new(tx)));
    let mut reporter = ImportReporter::new();

    session.select_file(selected);

    let outcome = {
        let run = session.run();
        tokio::pin!(run);
        loop {
            tokio::select! {
                outcome = &mut run => break outcome,
                Some(event) = events.recv() => reporter.handle(event),
            }
        }
    };
    drain(&mut events, &mut reporter);
    reporter.finish();

    let snapshot = outcome?;
    info!(job_id = ?snapshot.job_id, status = ?snapshot.job_status, "Import settled");

    if snapshot.job_status == Some(JobStatus::TimedOut) {
        if let Some(job_id) = &snapshot.job_id {
            println!();
            println!("Check the job later with:");
            println!("  pim status {}", job_id);
        }
        return Ok(());
    }

    let Some(result) = snapshot.result.as_ref() else {
        return Err(ImportError::invalid_state(format!(
            "import settled without a result (session is {})",
            snapshot.phase
        )));
    };

    print_review(result);

    if snapshot.phase != SessionPhase::AwaitingReview || result.accepted_rows.is_empty() {
        println!("{}", "No valid products to approve.".yellow());
        return Ok(());
    }

    let selection = select_rows(result, rows)?;
    if !confirm_approval(&snapshot, selection.len(), yes)? {
        println!("Approval skipped. Nothing was saved.");
        return Ok(());
    }

    let approval = session.approve(selection).await;
    drain(&mut events, &mut reporter);
    approval?;

    Ok(())
}

fn drain(events: &mut UnboundedReceiver<ImportEvent>, reporter: &mut ImportReporter) {
    while let Ok(event) = events.try_recv() {
        reporter.handle(event);
    }
}

/// Rows to approve: every accepted row, or the 1-based `indices` of the review table.
pub fn select_rows(result: &ResultArtifact, indices: &[usize]) -> Result<Vec<ProductRow>> {
    if indices.is_empty() {
        return Ok(result.accepted_rows.clone());
    }

    let mut selection = Vec::with_capacity(indices.len());
    let mut seen = Vec::with_capacity(indices.len());
    for &index in indices {
        let row = index
            .checked_sub(1)
            .and_then(|i| result.accepted_rows.get(i))
            .ok_or_else(|| {
                ImportError::InvalidSelection(format!(
                    "row {} (the review table has {} rows)",
                    index,
                    result.accepted_rows.len()
                ))
            })?;

        if !seen.contains(&index) {
            seen.push(index);
            selection.push(row.clone());
        }
    }

    Ok(selection)
}

fn confirm_approval(snapshot: &SessionSnapshot, count: usize, yes: bool) -> Result<bool> {
    if yes {
        return Ok(true);
    }

    if !(io::stdin().is_terminal() && io::stdout().is_terminal()) {
        println!(
            "Not running interactively. Re-run with {} to save {} product(s).",
            "--approve".cyan(),
            count
        );
        return Ok(false);
    }

    let file = snapshot.file_name.as_deref().unwrap_or("this file");
    let confirmed = inquire::Confirm::new(&format!("Save {} product(s) from {}?", count, file))
        .with_default(false)
        .prompt()?;

    Ok(confirmed)
}

/// Table of accepted rows, numbered from 1 as `--rows` expects.
pub fn review_table(result: &ResultArtifact) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS);

    let mut header = vec!["#".to_string()];
    header.extend(result.accepted_headers.iter().cloned());
    table.set_header(header);

    for (index, row) in result.accepted_rows.iter().enumerate() {
        let mut cells = vec![(index + 1).to_string()];
        cells.extend(result.accepted_headers.iter().map(|attribute| {
            row.get(attribute)
                .map(ToString::to_string)
                .unwrap_or_else(|| "-".to_string())
        }));
        table.add_row(cells);
    }

    table
}

fn print_review(result: &ResultArtifact) {
    println!();
    println!("{}", format!("Review: {}", result.file_name).cyan().bold());
    if let Some(message) = &result.message {
        println!("  {}", message);
    }
    println!();

    if result.accepted_rows.is_empty() {
        println!("{}", "No accepted rows.".yellow());
    } else {
        println!("{}", review_table(result));
        println!(
            "{} valid product(s){}",
            result.accepted_count(),
            result
                .total_rows_in_preview
                .map(|total| format!(" of {} row(s) read", total))
                .unwrap_or_default()
        );
    }

    if !result.has_issues() {
        return;
    }

    println!();
    println!("{}", format!("Issues ({})", result.issue_count()).yellow().bold());
    if !result.ignored_headers.is_empty() {
        println!("  Ignored columns: {}", result.ignored_headers.join(", "));
    }
    for error in &result.validation_errors {
        println!("  {} {}", "✗".red(), error);
    }
    println!();
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use pim_common::types::AttributeValue;

    fn artifact() -> ResultArtifact {
        let mut first = ProductRow::new();
        first.insert("ProductSKU", AttributeValue::Text("SKU-1".into()));
        first.insert("Price", AttributeValue::Number(24.5));
        let mut second = ProductRow::new();
        second.insert("ProductSKU", AttributeValue::Text("SKU-2".into()));

        ResultArtifact {
            file_name: "products.csv".into(),
            accepted_headers: vec!["ProductSKU".into(), "Price".into()],
            accepted_rows: vec![first, second],
            ..ResultArtifact::default()
        }
    }

    #[test]
    fn test_select_rows_defaults_to_all() {
        assert_eq!(select_rows(&artifact(), &[]).unwrap().len(), 2);
    }

    #[test]
    fn test_select_rows_by_index() {
        let rows = select_rows(&artifact(), &[2, 2]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0].get("ProductSKU"),
            Some(&AttributeValue::Text("SKU-2".into()))
        );
    }

    #[test]
    fn test_select_rows_rejects_out_of_range() {
        assert!(matches!(
            select_rows(&artifact(), &[0]),
            Err(ImportError::InvalidSelection(_))
        ));
        assert!(matches!(
            select_rows(&artifact(), &[3]),
            Err(ImportError::InvalidSelection(_))
        ));
    }

    #[test]
    fn test_review_table_fills_missing_cells() {
        let rendered = review_table(&artifact()).to_string();
        assert!(rendered.contains("SKU-1"));
        assert!(rendered.contains("24.5"));
        assert!(rendered.contains('-'));
    }
}

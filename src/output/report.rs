//! Markdown run report
//!
//! Written next to the harvested files so a run can be audited without
//! re-reading the logs: run metadata, per-page encodings, the chapter list,
//! and every failure with its reason.

use crate::pipeline::{EntryStatus, RunReport};
use crate::url::site_name;
use url::Url;

/// Formats a run report as markdown
pub fn render_report(report: &RunReport) -> String {
    let mut md = String::new();

    let site = Url::parse(report.toc.source())
        .map(|url| site_name(&url))
        .unwrap_or_else(|_| report.toc.source().to_string());
    md.push_str(&format!("# Sumi-Binder Harvest Report: {}\n\n", site));

    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Source**: {}\n", report.toc.source()));
    md.push_str(&format!("- **Started**: {}\n", report.started_at.to_rfc3339()));
    md.push_str(&format!("- **Finished**: {}\n", report.finished_at.to_rfc3339()));
    md.push_str(&format!("- **Duration**: {} seconds\n", report.duration_seconds()));
    if let Some(hash) = &report.config_hash {
        md.push_str(&format!("- **Config Hash**: {}\n", hash));
    }
    md.push_str(&format!(
        "- **Output Directory**: {}\n\n",
        report.output_dir.display()
    ));

    md.push_str("## Summary\n\n");
    md.push_str("| Outcome | Count |\n");
    md.push_str("|---------|-------|\n");
    md.push_str(&format!("| Entries | {} |\n", report.toc.len()));
    md.push_str(&format!("| Stored | {} |\n", report.stored_count()));
    md.push_str(&format!("| Skipped | {} |\n", report.skipped_count()));
    md.push_str(&format!("| Failed | {} |\n", report.failed_count()));
    md.push_str(&format!("| Cancelled | {} |\n", report.cancelled_count()));
    md.push_str(&format!(
        "| Fetch failures | {} |\n\n",
        report.fetch_failures.len()
    ));

    if !report.toc.pages().is_empty() {
        md.push_str("## Listing Pages\n\n");
        md.push_str("| Page | Encoding | New entries |\n");
        md.push_str("|------|----------|-------------|\n");
        for page in report.toc.pages() {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                page.url, page.encoding, page.entries
            ));
        }
        md.push('\n');
    }

    md.push_str("## Chapters\n\n");
    for (n, outcome) in report.outcomes.iter().enumerate() {
        let marker = match &outcome.status {
            EntryStatus::Stored(document) => format!(
                "`{}` ({}, {} image(s))",
                document.asset.file_name,
                document.encoding,
                document.images.len()
            ),
            EntryStatus::Skipped => "already stored".to_string(),
            EntryStatus::Failed(failure) => format!("**failed** at {}", failure.stage),
            EntryStatus::Cancelled => "cancelled".to_string(),
        };
        md.push_str(&format!(
            "{}. [{}]({}) - {}\n",
            n + 1,
            outcome.entry.title(),
            outcome.entry.source_url(),
            marker
        ));
    }
    md.push('\n');

    let failures = report.failures();
    if !failures.is_empty() {
        md.push_str("## Failed Entries\n\n");
        md.push_str("| URL | Stage | Reason |\n");
        md.push_str("|-----|-------|--------|\n");
        for failure in failures {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                failure.url,
                failure.stage,
                escape_cell(&failure.reason)
            ));
        }
        md.push('\n');
    }

    if !report.fetch_failures.is_empty() {
        md.push_str("## Fetch Failures\n\n");
        md.push_str("| URL | Reason |\n");
        md.push_str("|-----|--------|\n");
        for record in &report.fetch_failures {
            md.push_str(&format!(
                "| {} | {} |\n",
                record.url,
                escape_cell(&record.reason)
            ));
        }
        md.push('\n');
    }

    md
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

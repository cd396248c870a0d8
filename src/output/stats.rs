//! Console statistics for a finished run

use crate::pipeline::RunReport;

/// Prints run statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `report` - The report of the finished run
pub fn print_statistics(report: &RunReport) {
    println!("=== Harvest Statistics ===\n");

    println!("Overview:");
    println!("  Source: {}", report.toc.source());
    println!("  Listing pages: {}", report.toc.pages().len());
    println!("  TOC entries: {}", report.toc.len());
    println!("  Duration: {}s", report.duration_seconds());
    println!();

    println!("Entries:");
    let total = report.outcomes.len();
    for (label, count) in [
        ("Stored", report.stored_count()),
        ("Skipped", report.skipped_count()),
        ("Failed", report.failed_count()),
        ("Cancelled", report.cancelled_count()),
    ] {
        if count > 0 {
            println!("  {}: {} ({:.1}%)", label, count, percentage(count, total));
        }
    }
    println!();

    let failures = report.failures();
    if !failures.is_empty() {
        println!("Failed Entries ({}):", failures.len());
        for failure in failures {
            println!("  - {} [{}]: {}", failure.url, failure.stage, failure.reason);
        }
        println!();
    }

    if !report.fetch_failures.is_empty() {
        println!("Fetch Failures ({}):", report.fetch_failures.len());
        for record in &report.fetch_failures {
            println!("  - {}: {}", record.url, record.reason);
        }
        println!();
    }

    let available = report.stored_count() + report.skipped_count();
    println!(
        "Success Rate: {:.1}% ({} / {} chapters available in {})",
        percentage(available, total),
        available,
        total,
        report.output_dir.display()
    );
}

fn percentage(count: usize, total: usize) -> f64 {
    if total > 0 {
        (count as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}

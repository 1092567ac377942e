use anyhow::Result;
use std::path::Path;

use marquee_core::SyncReport;

use crate::services::{load_config, Services};

fn print_report(report: &SyncReport) {
    println!("  Section:   {}", report.section);
    println!("  Run:       {}", report.run_id);
    println!("  Processed: {}", report.items_processed);
    println!("  Skipped:   {}", report.items_skipped);
    println!("  Batches:   {}", report.batches_upserted);
    if let Some(finished) = report.finished_at {
        let elapsed = finished - report.started_at;
        println!("  Elapsed:   {:.1}s", elapsed.num_milliseconds() as f64 / 1000.0);
    }
}

pub async fn run_sync(config_path: Option<&Path>, section: Option<String>) -> Result<()> {
    let config = load_config(config_path)?;
    let services = Services::from_config(&config, false)?;

    let sections = match section {
        Some(section) => vec![section],
        None => services.sections.clone(),
    };

    for section in &sections {
        println!("⏳ Syncing '{section}'...");
        match services.ingest.sync(section).await {
            Ok(report) => {
                println!("✓ Sync of '{section}' complete");
                print_report(&report);
            }
            Err(e) => {
                eprintln!("✗ Sync of '{section}' failed in {} stage", e.stage());
                if let Some(report) = e.partial_report() {
                    print_report(report);
                }
                return Err(e.into());
            }
        }
    }

    Ok(())
}

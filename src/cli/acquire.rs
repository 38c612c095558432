use super::ui;
use crate::core::acquisition::AcquisitionReport;
use crate::core::scheduler::{DailySchedule, run_daily};
use crate::core::service::RateService;
use anyhow::Result;
use chrono::{NaiveTime, Utc};
use comfy_table::Cell;
use tracing::{info, warn};

/// Runs one acquisition over the configured pairs and prints the outcome.
pub async fn run(service: &RateService, currency: &str) -> Result<()> {
    let report = service.run_daily_acquisition().await;
    display_report(&report, currency);
    if report.succeeded.is_empty() && !report.failed.is_empty() {
        anyhow::bail!("All {} rate pairs failed to acquire", report.failed.len());
    }
    Ok(())
}

/// Runs the acquisition every day at `at` (UTC) until Ctrl-C.
pub async fn schedule(service: &RateService, at: NaiveTime, currency: &str) -> Result<()> {
    let schedule = DailySchedule::new(at);
    println!(
        "Acquiring rates daily at {} UTC. Press Ctrl-C to stop.",
        at.format("%H:%M")
    );

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };
    let runs = run_daily(
        schedule,
        Utc::now,
        || async {
            let report = service.run_daily_acquisition().await;
            display_report(&report, currency);
        },
        shutdown,
    )
    .await;

    info!(runs, "Scheduler stopped");
    Ok(())
}

fn display_report(report: &AcquisitionReport, currency: &str) {
    if !report.succeeded.is_empty() {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Metal"),
            ui::header_cell("Purity"),
            ui::header_cell("Rate / g"),
        ]);
        for record in &report.succeeded {
            table.add_row(vec![
                Cell::new(record.metal_type),
                Cell::new(record.purity),
                ui::money_cell(record.rate_per_gram, currency),
            ]);
        }
        println!(
            "\n{}",
            ui::style_text("Acquired rates", ui::StyleType::Title)
        );
        println!("{table}");
    }

    if !report.failed.is_empty() {
        println!(
            "\n{}",
            ui::style_text("Failed pairs", ui::StyleType::Error)
        );
        for failure in &report.failed {
            println!(
                "  {} {} ({}): {}",
                failure.metal,
                failure.purity,
                failure.stage,
                ui::style_text(&failure.reason, ui::StyleType::Subtle)
            );
        }
    }

    println!(
        "\n{} {} succeeded, {} failed",
        ui::style_text("Summary:", ui::StyleType::TotalLabel),
        report.succeeded.len(),
        report.failed.len()
    );
}

//! Output formatting for CLI responses

use anyhow::Error;
use colored::*;
use framepace_scheduler::SchedulerConfig;
use serde_json::json;

use crate::error::CliError;
use crate::report::{FrameRow, Report};

/// Print error in JSON format
pub fn print_error_json(error: &Error) {
    let error_json = json!({
        "success": false,
        "error": {
            "message": error.to_string(),
            "type": error_type_name(error)
        }
    });
    match serde_json::to_string_pretty(&error_json) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("Failed to format error as JSON: {}", e),
    }
}

/// Print error in human-readable format
pub fn print_error_human(error: &Error) {
    eprintln!("{} {}", "Error:".red().bold(), error);

    let mut source = error.source();
    while let Some(err) = source {
        eprintln!("  {} {}", "Caused by:".yellow(), err);
        source = err.source();
    }
}

/// Print a replay report in the specified format
pub fn print_report(config: &SchedulerConfig, report: &Report, json: bool, show_frames: bool) {
    if json {
        let output = json!({
            "success": true,
            "config": config,
            "summary": report.summary,
            "frames": report.rows
        });
        match serde_json::to_string_pretty(&output) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("Failed to format report as JSON: {}", e),
        }
        return;
    }

    if show_frames {
        print_frame_table(&report.rows);
        println!();
    }

    let summary = &report.summary;
    println!("{}", "Scheduler:".bold());
    println!("  Physics rate: {} Hz", config.physics_ticks_per_second);
    println!("  Jitter tolerance: {:.3}", config.jitter_tolerance);
    match config.fixed_fps {
        Some(fps) => println!("  Fixed FPS: {}", fps),
        None => println!("  Fixed FPS: {}", "off".dimmed()),
    }

    println!("{}", "Summary:".bold());
    println!("  Frames: {}", summary.frames);
    println!("  Elapsed: {:.3} s", summary.elapsed_seconds);
    println!(
        "  Ticks: {} (expected {:.1})",
        summary.total_ticks, summary.expected_ticks
    );
    println!("  Max ticks per frame: {}", summary.max_ticks_per_frame);
    println!("  Jitter estimate: {:.3} ms", summary.variance * 1000.0);

    println!("  {}:", "Ticks per frame".bold());
    for (ticks, frames) in &summary.tick_histogram {
        println!("    {:>3}: {}", ticks, frames);
    }

    if summary.anomalies.is_empty() {
        println!("  {}", "No anomalies".green());
    } else {
        println!("  {}:", "Anomalies".yellow().bold());
        for (kind, count) in &summary.anomalies {
            println!("    • {}: {}", kind.yellow(), count);
        }
    }
}

fn print_frame_table(rows: &[FrameRow]) {
    if rows.is_empty() {
        println!("{}", "No frames".yellow());
        return;
    }

    let headers = [
        "frame",
        "raw_ms",
        "idle_ms",
        "ticks",
        "fraction",
        "deficit_ms",
    ];
    for (i, header) in headers.iter().enumerate() {
        if i > 0 {
            print!("  ");
        }
        print!("{:>10}", header.bold());
    }
    println!();

    for (i, _) in headers.iter().enumerate() {
        if i > 0 {
            print!("  ");
        }
        print!("{}", "-".repeat(10));
    }
    println!();

    for row in rows {
        println!(
            "{:>10}  {:>10.3}  {:>10.3}  {:>10}  {:>10.4}  {:>10.3}",
            row.frame,
            row.raw_delta * 1000.0,
            row.idle_delta * 1000.0,
            row.tick_count,
            row.interpolation_fraction,
            row.time_deficit * 1000.0
        );
    }
}

fn error_type_name(error: &Error) -> &'static str {
    match error.downcast_ref::<CliError>() {
        Some(CliError::InvalidTrace(_)) => "InvalidTrace",
        Some(CliError::InvalidConfiguration(_)) => "InvalidConfiguration",
        Some(CliError::Scheduler(_)) => "Scheduler",
        Some(CliError::IoError(_)) => "IoError",
        Some(CliError::JsonError(_)) => "JsonError",
        None => "Unknown",
    }
}

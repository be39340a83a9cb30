//! Output formatting and styling module.
//!
//! Every user-facing line goes through [`OutputFormatter`], so the look of the
//! tool can be changed in one place. Diagnostics go through `tracing` instead.

use crate::engine::PassReport;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

/// Manages all CLI output with consistent styling and formatting.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use dirsweep::output::OutputFormatter;
    /// OutputFormatter::success("Deleting empty file: /tmp/a");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Creates a progress bar for long-running per-file work.
    ///
    /// The bar draws on stderr and stays hidden when stderr is not a terminal.
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        match ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            Ok(style) => pb.set_style(style.progress_chars("█▓░")),
            Err(e) => tracing::debug!("Progress bar template rejected: {}", e),
        }
        pb
    }

    /// Prints one row per pass with what it did.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use dirsweep::engine::{Pass, PassReport};
    /// use dirsweep::output::OutputFormatter;
    ///
    /// let mut report = PassReport::new(Pass::Empty);
    /// report.examined = 12;
    /// report.applied = 3;
    /// OutputFormatter::summary_table(&[report]);
    /// ```
    pub fn summary_table(reports: &[PassReport]) {
        Self::header("SUMMARY");

        if reports.is_empty() {
            println!("No passes were run.");
            return;
        }

        let labels: Vec<String> = reports.iter().map(|r| r.pass.to_string()).collect();
        let width = labels.iter().map(String::len).max().unwrap_or(0).max(4);

        println!(
            "{:<width$} | {:>8} | {:>7} | {:>8} | {:>6}",
            "Pass".bold(),
            "Examined".bold(),
            "Applied".bold(),
            "Declined".bold(),
            "Failed".bold(),
            width = width
        );
        println!("{}", "-".repeat(width + 42));

        for (label, report) in labels.iter().zip(reports) {
            let failed = if report.failed > 0 {
                report.failed.to_string().red()
            } else {
                report.failed.to_string().normal()
            };
            println!(
                "{:<width$} | {:>8} | {:>7} | {:>8} | {:>6}",
                label,
                report.examined,
                report.applied.to_string().green(),
                report.declined,
                failed,
                width = width
            );
            if report.overwritten > 0 {
                println!(
                    "{:<width$}   {} file(s) replaced an earlier file of the same name",
                    "",
                    report.overwritten.to_string().yellow(),
                    width = width
                );
            }
        }
    }

    /// Prints a dry-run notice message.
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }
}

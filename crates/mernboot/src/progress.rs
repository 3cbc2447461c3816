//! Provisioning progress log
//!
//! Renders pipeline events as a timestamped step log, shows a spinner while
//! the cluster is being created, and prints a summary at the end.

use chrono::Local;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use mernboot_provision::{
    ClusterStatus, PipelineObserver, PipelineStep, ProvisioningRecord, StepOutcome,
};
use std::time::{Duration, Instant};

const SPINNER_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] {msg}";

fn timestamp() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

/// Step log for one provisioning run
pub struct ProgressLogger {
    start_time: Instant,
    max_poll_attempts: u32,
    step_results: Vec<(PipelineStep, StepOutcome, Duration)>,
    current_step: Option<(PipelineStep, Instant)>,
    spinner: Option<ProgressBar>,
}

impl ProgressLogger {
    pub fn new(max_poll_attempts: u32) -> Self {
        Self {
            start_time: Instant::now(),
            max_poll_attempts,
            step_results: Vec::new(),
            current_step: None,
            spinner: None,
        }
    }

    fn start_spinner(&mut self) {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template(SPINNER_TEMPLATE) {
            pb.set_style(style);
        }
        pb.set_message("Waiting for cluster to be ready. This may take a few minutes...");
        pb.enable_steady_tick(Duration::from_millis(120));
        self.spinner = Some(pb);
    }

    fn stop_spinner(&mut self) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_and_clear();
        }
    }

    /// Print the run summary
    pub fn print_summary(&self, project_name: &str) {
        let total_duration = self.start_time.elapsed();

        let skipped = self
            .step_results
            .iter()
            .filter(|(_, outcome, _)| matches!(outcome, StepOutcome::AlreadySatisfied { .. }))
            .count();

        let error_count = self
            .step_results
            .iter()
            .filter(|(_, outcome, _)| !outcome.is_success())
            .count();

        let slowest_step = self
            .step_results
            .iter()
            .max_by_key(|(_, _, duration)| *duration);

        println!();
        println!("{}", "═".repeat(44));
        println!("Atlas Setup Summary: {}", project_name.cyan().bold());
        println!("{}", "─".repeat(44));
        println!("Total time:    {}", format_duration(total_duration).green());

        if let Some((step, _, duration)) = slowest_step {
            println!(
                "Slowest step:  {} ({})",
                step.name(),
                format_duration(*duration)
            );
        }

        println!("Skipped:       {}", skipped);

        if error_count > 0 {
            println!("Errors:        {}", error_count.to_string().red().bold());
        } else {
            println!("Errors:        {}", "0".green());
        }
        println!("{}", "═".repeat(44));
    }
}

impl Drop for ProgressLogger {
    fn drop(&mut self) {
        self.stop_spinner();
    }
}

impl PipelineObserver for ProgressLogger {
    fn step_started(&mut self, step: PipelineStep) {
        println!(
            "[{}] {} {} {}",
            timestamp().dimmed(),
            "▶".cyan(),
            step.name(),
            format!("({}/{})", step.index() + 1, PipelineStep::ALL.len()).dimmed()
        );
        self.current_step = Some((step, Instant::now()));

        if step == PipelineStep::AwaitReady {
            self.start_spinner();
        }
    }

    fn step_finished(&mut self, step: PipelineStep, outcome: &StepOutcome) {
        self.stop_spinner();

        let duration = match self.current_step.take() {
            Some((current, start)) if current == step => start.elapsed(),
            _ => Duration::ZERO,
        };
        let duration_str = format_duration(duration);

        match outcome {
            StepOutcome::Succeeded { message } => println!(
                "[{}] {} {} ({})",
                timestamp().dimmed(),
                "✓".green().bold(),
                message.as_deref().unwrap_or(step.name()),
                duration_str.dimmed()
            ),
            StepOutcome::AlreadySatisfied { reason } => println!(
                "[{}] {} {} ({})",
                timestamp().dimmed(),
                "⏭".yellow(),
                step.name(),
                reason.dimmed()
            ),
            StepOutcome::Failed { detail } => println!(
                "[{}] {} {}: {}",
                timestamp().dimmed(),
                "✗".red().bold(),
                step.name(),
                detail.red()
            ),
        }

        self.step_results.push((step, outcome.clone(), duration));
    }

    fn record_persisted(&mut self, record: &ProvisioningRecord, saved: bool) {
        if saved {
            self.detail("Saved project and cluster for later use");
        } else {
            println!(
                "[{}]   {} Note these values: project {} / cluster {} / user {}",
                timestamp().dimmed(),
                "!".yellow().bold(),
                record.project_id().yellow(),
                record.cluster_name().yellow(),
                record.username().yellow()
            );
        }
    }

    fn status_polled(&mut self, attempt: u32, status: &ClusterStatus) {
        if let Some(pb) = &self.spinner {
            pb.set_message(format!(
                "Cluster status: {} (check {}/{})",
                status, attempt, self.max_poll_attempts
            ));
        }
    }

    fn detail(&mut self, message: &str) {
        let line = format!("[{}]   → {}", timestamp().dimmed(), message.cyan());
        match &self.spinner {
            Some(pb) => pb.println(line),
            None => println!("{}", line),
        }
    }
}

/// Format a duration for humans
fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if total_secs >= 60 {
        let minutes = total_secs / 60;
        let secs = total_secs % 60;
        format!("{}m {}s", minutes, secs)
    } else if total_secs >= 1 {
        format!("{}.{}s", total_secs, millis / 100)
    } else {
        format!("{}ms", millis)
    }
}

//! Colored output helpers for CLI
//!
//! Provides consistent, colored terminal output for the ensemble CLI, and a
//! [`ProgressPrinter`] that renders executor progress as workers finish.

use crate::orchestrator::{ExecutionBatch, ExecutionStatus, Plan, ProgressObserver, Report};
use crate::workers::WorkerResult;
use owo_colors::OwoColorize;

/// Output style configuration
#[derive(Debug, Clone, Copy)]
pub struct Output {
    /// Whether to use colored output
    pub colored: bool,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    /// Create a new output helper with colors enabled
    pub fn new() -> Self {
        Self { colored: true }
    }

    /// Create a new output helper with colors disabled
    pub fn no_color() -> Self {
        Self { colored: false }
    }

    pub fn banner(&self) {
        let version = format!("v{}", env!("CARGO_PKG_VERSION"));
        if self.colored {
            println!(
                "\n   {} {}\n   {}\n",
                "ensemble".bright_cyan().bold(),
                version.dimmed(),
                "parallel analysis orchestrator".bright_white()
            );
        } else {
            println!("\n   ensemble {}\n   parallel analysis orchestrator\n", version);
        }
    }

    /// Print a success message with a checkmark
    pub fn success(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "✓".green().bold(), message.green());
        } else {
            println!("  [OK] {}", message);
        }
    }

    pub fn info(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "•".blue(), message);
        } else {
            println!("  [INFO] {}", message);
        }
    }

    pub fn warning(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "⚠".yellow().bold(), message.yellow());
        } else {
            println!("  [WARN] {}", message);
        }
    }

    pub fn error(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "✗".red().bold(), message.red());
        } else {
            eprintln!("  [ERROR] {}", message);
        }
    }

    /// Print a header for a section
    pub fn header(&self, title: &str) {
        if self.colored {
            println!("\n  {}", title.bright_white().bold().underline());
        } else {
            println!("\n  === {} ===", title);
        }
    }

    pub fn kv(&self, key: &str, value: &str) {
        if self.colored {
            println!("    {}: {}", key.dimmed(), value.bright_white());
        } else {
            println!("    {}: {}", key, value);
        }
    }

    pub fn list_item(&self, item: &str) {
        if self.colored {
            println!("    {} {}", "•".blue(), item);
        } else {
            println!("    - {}", item);
        }
    }

    pub fn hint(&self, message: &str) {
        if self.colored {
            println!("\n  {}", message.dimmed().italic());
        } else {
            println!("\n  [TIP] {}", message);
        }
    }

    /// Print the selected workers and their sub-queries
    pub fn plan(&self, plan: &Plan) {
        self.header("Plan");
        if plan.is_fallback() {
            self.warning("Decomposition failed, running every worker on the original query");
        }
        for worker in plan.workers() {
            let marker = if plan.priority_worker() == Some(worker.as_str()) {
                " (priority)"
            } else {
                ""
            };
            self.kv(
                &format!("{}{}", worker, marker),
                plan.sub_query(worker).unwrap_or_default(),
            );
        }
        self.kv("guidance", plan.synthesis_guidance());
    }

    /// Print one line per execution with its status and timing
    pub fn batch(&self, batch: &ExecutionBatch) {
        self.header("Workers");
        for (name, execution) in batch.executions() {
            let timing = execution
                .duration_ms()
                .map(|ms| format!("{} ms", ms))
                .unwrap_or_default();
            match execution.status() {
                ExecutionStatus::Completed => self.success(&format!("{} {}", name, timing)),
                _ => self.error(&format!(
                    "{} {}: {}",
                    name,
                    timing,
                    execution.error_message().unwrap_or("not finished")
                )),
            }
        }
        self.kv("total", &format!("{} ms", batch.total_duration_ms()));
    }

    /// Print the synthesized report and its summary line
    pub fn report(&self, report: &Report) {
        self.header("Report");
        println!("\n{}\n", report.body);

        if !report.success {
            self.error("All workers failed");
        } else if report.degraded {
            self.warning(&format!(
                "Synthesis failed ({}); showing raw worker output",
                report.synthesis_error.as_deref().unwrap_or("unknown error")
            ));
        }
        if !report.failed_worker_names.is_empty() {
            self.warning(&format!(
                "Failed workers: {}",
                report.failed_worker_names.join(", ")
            ));
        }
        self.kv(
            "workers used",
            &format!("{} ({})", report.worker_count_used, report.metadata.workers_used.join(", ")),
        );
        self.kv("synthesis", &format!("{} ms", report.synthesis_duration_ms));
        self.kv("pipeline", &format!("{} ms", report.total_pipeline_duration_ms));
    }
}

/// Prints executor progress as it happens.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressPrinter {
    output: Output,
}

impl ProgressPrinter {
    pub fn new(output: Output) -> Self {
        Self { output }
    }
}

impl ProgressObserver for ProgressPrinter {
    fn on_start(&self, worker: &str) {
        self.output.info(&format!("{} started", worker));
    }

    fn on_complete(&self, worker: &str, result: &WorkerResult) {
        self.output.success(&format!(
            "{} finished in {} ms ({:.0}% confidence)",
            worker,
            result.duration_ms(),
            result.confidence() * 100.0
        ));
    }

    fn on_error(&self, worker: &str, error: &str) {
        self.output.error(&format!("{} failed: {}", worker, error));
    }
}

//! Simulate command: drive a retrieval plan through the terminal reporters
use crate::Settings;
use crate::sim::{self, Plan, SimError};
use crate::ui::{LinePrompter, TerminalPresenter};
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tidings_core::{EventChannel, Presenter, Prompter};

/// Run the plan at `plan_path`, then print the summary and a `RESULT` line.
pub fn simulate(plan_path: &Path, settings: &Settings) -> Result<()> {
    let plan = Plan::load(plan_path)?;
    tracing::debug!(
        sources = plan.sources.len(),
        packages = plan.packages.len(),
        "plan loaded"
    );

    let channel = EventChannel::new();
    let presenter: Arc<dyn Presenter> = Arc::new(TerminalPresenter::stderr(settings.color));
    let prompter: Arc<dyn Prompter> = Arc::new(LinePrompter::stdio(
        settings.interactive,
        settings.unattended_decision,
        settings.color,
    ));

    let start = Instant::now();
    let summary = match sim::run(&plan, &channel, presenter, Some(prompter)) {
        Ok(summary) => summary,
        Err(SimError::Fatal(fatal)) => {
            print_result(&serde_json::json!({
                "operation": "simulate",
                "status": "fatal",
                "source": fatal.locator.as_str(),
                "elapsed": start.elapsed().as_secs_f64(),
            }));
            return Err(fatal).context("Retrieval stopped");
        }
        Err(err @ SimError::Session(_)) => return Err(err.into()),
    };

    println!("{summary}");
    print_result(&serde_json::json!({
        "operation": "simulate",
        "status": if summary.aborted { "aborted" } else { "success" },
        "summary": summary,
        "elapsed": start.elapsed().as_secs_f64(),
    }));
    Ok(())
}

// JSON RESULT for CI
fn print_result(value: &serde_json::Value) {
    println!("RESULT {}", serde_json::to_string(value).unwrap_or_default());
}

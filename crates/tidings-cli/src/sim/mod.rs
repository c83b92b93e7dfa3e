//! Retrieval simulator
//!
//! Plays the engine side of a retrieval run against the report handles:
//! sources are probed and refreshed, then every package is downloaded. Each
//! decision coming back from the reporters is honoured: retry re-attempts
//! the same step, ignore skips it, abort stops the batch.

pub mod plan;

pub use plan::Plan;

use plan::{PackagePlan, SourcePlan, TaskPlan};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tidings_core::{
    ChannelError, Decision, EventChannel, Fatal, OutcomeCode, ProbeReport, Presenter, Prompter,
    ReportSession, Resolvable, ResolvableKind, SourceId, SourceTaskReport, TransferReport,
};

/// A run that could not complete.
#[derive(Error, Debug)]
pub enum SimError {
    #[error(transparent)]
    Fatal(#[from] Fatal),

    #[error("Cannot open report session: {0}")]
    Session(#[from] ChannelError),
}

/// What a run achieved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub sources: usize,
    pub tasks: usize,
    pub downloaded: usize,
    pub skipped: usize,
    pub aborted: bool,
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} downloaded, {} skipped", self.downloaded, self.skipped)?;
        if self.aborted {
            write!(f, ", aborted")?;
        }
        Ok(())
    }
}

/// How one step ended.
enum Step {
    Done,
    Skipped,
    Aborted,
}

struct Simulator<'a> {
    plan: &'a Plan,
    channel: &'a EventChannel,
    summary: Summary,
}

/// Run `plan` with a fresh report session on `channel`.
///
/// # Errors
///
/// Returns [`SimError::Fatal`] when source type detection fails; nothing
/// after the failing probe is attempted.
pub fn run(
    plan: &Plan,
    channel: &EventChannel,
    presenter: Arc<dyn Presenter>,
    prompter: Option<Arc<dyn Prompter>>,
) -> Result<Summary, SimError> {
    let session = ReportSession::open(channel, presenter, prompter)?;
    let mut sim = Simulator {
        plan,
        channel,
        summary: Summary::default(),
    };
    let result = sim.run();
    session.close();
    result?;
    Ok(sim.summary)
}

impl Simulator<'_> {
    fn run(&mut self) -> Result<(), Fatal> {
        let plan = self.plan;
        for source in &plan.sources {
            self.probe(source)?;
            self.summary.sources += 1;
            if let Step::Aborted = self.refresh(source) {
                self.summary.aborted = true;
                return Ok(());
            }
        }

        let mut transfer = TransferReport::new(self.channel);
        for package in &plan.packages {
            match self.download(&mut transfer, package) {
                Step::Done => self.summary.downloaded += 1,
                Step::Skipped => self.summary.skipped += 1,
                Step::Aborted => {
                    self.summary.aborted = true;
                    break;
                }
            }
        }
        Ok(())
    }

    fn pause(&self) {
        if self.plan.step_delay_ms > 0 {
            std::thread::sleep(Duration::from_millis(self.plan.step_delay_ms));
        }
    }

    /// Progress values for one phase, ending at 100.
    fn ticks(&self) -> impl Iterator<Item = i32> {
        let steps = u64::from(self.plan.steps.max(1));
        (1..=steps).map(move |i| i32::try_from(i * 100 / steps).unwrap_or(100))
    }

    fn probe(&self, source: &SourcePlan) -> Result<(), Fatal> {
        let report = ProbeReport::new(self.channel);
        let locator = source.locator();
        report.start(&locator)?;
        for candidate in &source.candidates {
            report.progress(&locator, 0)?;
            report.failed_probe(&locator, candidate)?;
        }
        if let Some(problem) = &source.probe_problem {
            report.problem(&locator, source.outcome, problem)?;
        }
        match &source.detected {
            Some(type_name) => {
                report.progress(&locator, 100)?;
                report.success_probe(&locator, type_name)?;
                report.finish(&locator, OutcomeCode::Ok, "")
            }
            None => {
                let reason = source.reason.as_deref().unwrap_or("unknown source type");
                report.finish(&locator, source.outcome, reason)
            }
        }
    }

    fn refresh(&mut self, source: &SourcePlan) -> Step {
        let mut report = SourceTaskReport::new(self.channel);
        let id = source.id();
        for task in &source.tasks {
            match self.run_task(&mut report, &id, task) {
                Step::Done => self.summary.tasks += 1,
                Step::Skipped => tracing::debug!(task = %task.name, "task ignored"),
                Step::Aborted => return Step::Aborted,
            }
        }
        Step::Done
    }

    fn run_task(
        &self,
        report: &mut SourceTaskReport<'_>,
        id: &SourceId,
        task: &TaskPlan,
    ) -> Step {
        let mut attempt = 0;
        loop {
            report.start(id, &task.name);
            if let Some(failure) = task.failures.get(attempt) {
                report.progress(0);
                match report.problem(task.failure_outcome, failure) {
                    Decision::Retry => {
                        tracing::debug!(task = %task.name, attempt, "retrying task");
                        report.finish(task.failure_outcome, failure);
                        attempt += 1;
                        continue;
                    }
                    Decision::Ignore => {
                        report.finish(task.failure_outcome, failure);
                        return Step::Skipped;
                    }
                    Decision::Abort => {
                        report.finish(OutcomeCode::AbortedByUser, failure);
                        return Step::Aborted;
                    }
                }
            }
            for value in self.ticks() {
                self.pause();
                report.progress(value);
            }
            report.finish(OutcomeCode::Ok, "");
            return Step::Done;
        }
    }

    fn download(&self, transfer: &mut TransferReport<'_>, package: &PackagePlan) -> Step {
        let subject = package.resolvable();
        let locator = self.plan.source_for(package);
        let mut attempt = 0;
        loop {
            transfer.start(&subject, &locator);

            // Retries skip the delta.
            let via_delta = match &package.delta {
                Some(delta) if attempt == 0 => self.delta(transfer, delta),
                _ => false,
            };

            if subject.kind == ResolvableKind::Patch {
                if let Some(patch) = &package.patch {
                    self.patch(transfer, patch);
                }
            }

            if let Some(failure) = package.failures.get(attempt) {
                transfer.progress(0);
                let outcome = package.failure_outcome;
                match transfer.problem(outcome, failure) {
                    Decision::Retry => {
                        tracing::debug!(%subject, attempt, "retrying download");
                        transfer.finish(outcome, failure);
                        attempt += 1;
                        continue;
                    }
                    Decision::Ignore => {
                        transfer.finish(outcome, failure);
                        return Step::Skipped;
                    }
                    Decision::Abort => {
                        transfer.finish(OutcomeCode::AbortedByUser, failure);
                        return Step::Aborted;
                    }
                }
            }

            if via_delta {
                transfer.progress(100);
            } else {
                self.full_download(transfer, &subject);
            }
            transfer.finish(OutcomeCode::Ok, "");
            return Step::Done;
        }
    }

    fn full_download(&self, transfer: &TransferReport<'_>, subject: &Resolvable) {
        for value in self.ticks() {
            self.pause();
            if !transfer.progress(value) {
                tracing::debug!(%subject, "download interrupted by receiver");
                break;
            }
        }
    }

    /// Fetch and apply a delta. Returns whether the package was rebuilt.
    fn delta(&self, transfer: &TransferReport<'_>, delta: &plan::DeltaPlan) -> bool {
        transfer.start_delta_download(&delta.path, delta.size);
        if let Some(error) = &delta.download_error {
            transfer.problem_delta_download(error);
            transfer.finish_delta_download();
            return false;
        }
        for value in self.ticks() {
            self.pause();
            transfer.progress_delta_download(value);
        }
        transfer.finish_delta_download();

        transfer.start_delta_apply(&delta.path);
        if let Some(error) = &delta.apply_error {
            transfer.problem_delta_apply(error);
            transfer.finish_delta_apply();
            return false;
        }
        for value in self.ticks() {
            self.pause();
            transfer.progress_delta_apply(value);
        }
        transfer.finish_delta_apply();
        true
    }

    fn patch(&self, transfer: &TransferReport<'_>, patch: &plan::PatchPlan) {
        transfer.start_patch_download(&patch.path, patch.size);
        if let Some(error) = &patch.error {
            transfer.problem_patch_download(error);
        } else {
            for value in self.ticks() {
                self.pause();
                transfer.progress_patch_download(value);
            }
        }
        transfer.finish_patch_download();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidings_core::testing::{Rendered, RecordingPresenter, ScriptedPrompter};

    struct Run {
        presenter: Arc<RecordingPresenter>,
        prompter: Arc<ScriptedPrompter>,
        result: Result<Summary, SimError>,
        channel_empty: bool,
    }

    fn simulate(plan: &str, answers: &[Decision]) -> Run {
        let plan = Plan::from_toml(plan).unwrap();
        let channel = EventChannel::new();
        let presenter = Arc::new(RecordingPresenter::default());
        let prompter = Arc::new(ScriptedPrompter::new(answers));
        let shown: Arc<dyn Presenter> = presenter.clone();
        let asked: Arc<dyn Prompter> = prompter.clone();
        let result = run(&plan, &channel, shown, Some(asked));
        Run {
            presenter,
            prompter,
            result,
            channel_empty: channel.is_empty(),
        }
    }

    const SOURCE: &str = r#"
steps = 2

[[source]]
alias = "oss"
url = "https://download.example.org/oss"
candidates = ["plaindir"]
detected = "rpm-md"

[[source.task]]
name = "Reading index"
"#;

    #[test]
    fn test_clean_run() {
        let plan = format!("{SOURCE}\n[[package]]\nname = \"vim\"\nversion = \"9.1\"\n");
        let run = simulate(&plan, &[]);
        let summary = run.result.unwrap();
        assert_eq!(
            summary,
            Summary {
                sources: 1,
                tasks: 1,
                downloaded: 1,
                skipped: 0,
                aborted: false,
            }
        );
        assert_eq!(summary.to_string(), "1 downloaded, 0 skipped");
        assert_eq!(run.prompter.calls(), 0);
        assert_eq!(
            run.presenter.progress_values("Downloading vim"),
            vec![50, 100]
        );
        assert!(
            run.presenter
                .notices()
                .contains(&"https://download.example.org/oss is type rpm-md".to_string())
        );
        assert!(run.channel_empty);
    }

    #[test]
    fn test_retry_then_success() {
        let plan = format!(
            "{SOURCE}\n[[package]]\nname = \"vim\"\nversion = \"9.1\"\nfailures = [\"connection reset\"]\n"
        );
        let run = simulate(&plan, &[Decision::Retry]);
        let summary = run.result.unwrap();
        assert_eq!(summary.downloaded, 1);
        assert_eq!(run.prompter.calls(), 1);

        let rendered = run.presenter.rendered();
        // Once when the problem is reported, once when the attempt finishes.
        let errors = rendered
            .iter()
            .filter(|r| matches!(r, Rendered::Error(OutcomeCode::IoError, msg) if msg == "connection reset"))
            .count();
        assert_eq!(errors, 2);
        assert_eq!(run.presenter.count_done(), 2);
    }

    #[test]
    fn test_ignore_skips_package() {
        let plan = format!(
            "{SOURCE}\n[[package]]\nname = \"a\"\nversion = \"1\"\nfailures = [\"gone\"]\n\n[[package]]\nname = \"b\"\nversion = \"1\"\n"
        );
        let summary = simulate(&plan, &[Decision::Ignore]).result.unwrap();
        assert_eq!((summary.downloaded, summary.skipped), (1, 1));
        assert!(!summary.aborted);
    }

    #[test]
    fn test_abort_stops_batch() {
        let plan = format!(
            "{SOURCE}\n[[package]]\nname = \"a\"\nversion = \"1\"\nfailures = [\"gone\"]\n\n[[package]]\nname = \"b\"\nversion = \"1\"\n"
        );
        // Nothing scripted: the prompter answers with the offered default.
        let run = simulate(&plan, &[]);
        let summary = run.result.unwrap();
        assert_eq!(summary.to_string(), "0 downloaded, 0 skipped, aborted");
        assert_eq!(run.presenter.progress_values("Downloading b"), Vec::<u8>::new());
    }

    #[test]
    fn test_failed_probe_is_fatal() {
        let plan = r#"
[[source]]
alias = "bad"
url = "https://example.org/nothing"
candidates = ["rpm-md", "plaindir"]
reason = "no metadata"

[[package]]
name = "vim"
version = "9.1"
"#;
        let run = simulate(plan, &[]);
        let Err(SimError::Fatal(fatal)) = run.result else {
            panic!("probe failure must be fatal");
        };
        assert_eq!(fatal.outcome, OutcomeCode::InvalidFormat);
        assert_eq!(fatal.reason, "no metadata");
        assert_eq!(run.prompter.calls(), 0);
        assert!(run.presenter.progress_values("Downloading vim").is_empty());
        // The session is gone even though the run failed.
        assert!(run.channel_empty);
    }

    #[test]
    fn test_task_retry_and_abort() {
        let plan = r#"
[[source]]
alias = "oss"
url = "https://download.example.org/oss"
detected = "rpm-md"

[[source.task]]
name = "Reading index"
failures = ["checksum mismatch", "checksum mismatch"]

[[package]]
name = "vim"
version = "9.1"
"#;
        let run = simulate(plan, &[Decision::Retry, Decision::Abort]);
        let summary = run.result.unwrap();
        assert!(summary.aborted);
        assert_eq!(summary.tasks, 0);
        assert_eq!(run.prompter.calls(), 2);
    }

    #[test]
    fn test_ignored_task_is_not_counted() {
        let plan = r#"
[[source]]
alias = "oss"
url = "https://download.example.org/oss"
detected = "rpm-md"

[[source.task]]
name = "Reading index"
failures = ["bad"]

[[source.task]]
name = "Reading patches"
"#;
        let run = simulate(plan, &[Decision::Ignore]);
        let summary = run.result.unwrap();
        assert!(!summary.aborted);
        assert_eq!(summary.sources, 1);
        assert_eq!(summary.tasks, 1);
        assert_eq!(run.prompter.calls(), 1);
    }

    #[test]
    fn test_large_step_count_ends_at_full() {
        let text = SOURCE.replace("steps = 2", &format!("steps = {}", plan::MAX_STEPS));
        let run = simulate(&text, &[]);
        let values = run.presenter.progress_values("(oss) Reading index");
        assert!(values.len() > plan::MAX_STEPS as usize);
        assert_eq!(values.last(), Some(&100));
        assert!(values.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_delta_failure_falls_back_to_full_download() {
        let plan = format!(
            "{SOURCE}\n[[package]]\nname = \"vim\"\nversion = \"9.1\"\n\n[package.delta]\npath = \"vim.drpm\"\nsize = 10\napply_error = \"bad checksum\"\n"
        );
        let run = simulate(&plan, &[]);
        let summary = run.result.unwrap();
        assert_eq!(summary.downloaded, 1);
        // Sub-phase problems never ask.
        assert_eq!(run.prompter.calls(), 0);
        assert_eq!(run.presenter.progress_values("Downloading delta"), vec![50, 100]);
        assert_eq!(run.presenter.progress_values("Downloading vim"), vec![50, 100]);
        assert!(
            run.presenter
                .notices()
                .iter()
                .any(|n| n.contains("bad checksum"))
        );
    }

    #[test]
    fn test_patch_download() {
        let plan = r#"
steps = 1

[[package]]
name = "security-fix"
version = "1"
kind = "patch"

[package.patch]
path = "security-fix.xml"
size = 2048
"#;
        let run = simulate(plan, &[]);
        assert_eq!(run.result.unwrap().downloaded, 1);
        assert_eq!(run.presenter.progress_values("Downloading patch"), vec![100]);
    }
}

//! Plan file format
//!
//! A plan describes what a retrieval run would encounter: the sources to
//! probe and refresh, and the packages to download with the failures each
//! attempt runs into.
//!
//! ```toml
//! steps = 4
//!
//! [[source]]
//! alias = "oss"
//! url = "https://download.example.org/oss"
//! candidates = ["plaindir"]
//! detected = "rpm-md"
//!
//! [[source.task]]
//! name = "Reading index"
//!
//! [[package]]
//! name = "vim"
//! version = "9.1.0-3"
//! archive_size = 2097152
//! failures = ["connection reset"]
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tidings_core::{OutcomeCode, Resolvable, ResolvableKind, SourceId, SourceLocator};

/// Upper bound on progress updates per phase.
pub const MAX_STEPS: u32 = 1000;

fn default_steps() -> u32 {
    4
}

fn default_probe_outcome() -> OutcomeCode {
    OutcomeCode::InvalidFormat
}

fn default_failure_outcome() -> OutcomeCode {
    OutcomeCode::IoError
}

/// A whole simulated run.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Plan {
    /// Progress updates per phase.
    #[serde(default = "default_steps")]
    pub steps: u32,
    /// Pause between progress updates.
    #[serde(default)]
    pub step_delay_ms: u64,
    #[serde(default, rename = "source")]
    pub sources: Vec<SourcePlan>,
    #[serde(default, rename = "package")]
    pub packages: Vec<PackagePlan>,
}

/// One source: type detection followed by maintenance tasks.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourcePlan {
    pub alias: String,
    pub url: String,
    /// Types tried (and rejected) before the detected one.
    #[serde(default)]
    pub candidates: Vec<String>,
    /// Detected type; without one detection fails.
    pub detected: Option<String>,
    /// Outcome reported when detection fails.
    #[serde(default = "default_probe_outcome")]
    pub outcome: OutcomeCode,
    /// Reason reported when detection fails.
    pub reason: Option<String>,
    /// A problem raised in the middle of detection.
    pub probe_problem: Option<String>,
    #[serde(default, rename = "task")]
    pub tasks: Vec<TaskPlan>,
}

impl SourcePlan {
    pub fn locator(&self) -> SourceLocator {
        SourceLocator::new(&self.url)
    }

    pub fn id(&self) -> SourceId {
        SourceId::new(&self.alias, self.locator())
    }
}

/// A maintenance task such as reading an index.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskPlan {
    pub name: String,
    /// Failure description per attempt; later attempts succeed.
    #[serde(default)]
    pub failures: Vec<String>,
    #[serde(default = "default_failure_outcome")]
    pub failure_outcome: OutcomeCode,
}

/// A package or patch to download.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackagePlan {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub kind: ResolvableKind,
    pub archive_size: Option<u64>,
    pub installed_size: Option<u64>,
    /// Alias of the source it comes from; the first source otherwise.
    pub source: Option<String>,
    /// Failure description per attempt; later attempts succeed.
    #[serde(default)]
    pub failures: Vec<String>,
    #[serde(default = "default_failure_outcome")]
    pub failure_outcome: OutcomeCode,
    pub delta: Option<DeltaPlan>,
    pub patch: Option<PatchPlan>,
}

impl PackagePlan {
    pub fn resolvable(&self) -> Resolvable {
        Resolvable {
            kind: self.kind,
            name: self.name.clone(),
            version: self.version.clone(),
            archive_size: self.archive_size,
            installed_size: self.installed_size,
        }
    }
}

/// A delta rpm tried before the full download.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeltaPlan {
    pub path: String,
    #[serde(default)]
    pub size: u64,
    pub download_error: Option<String>,
    pub apply_error: Option<String>,
}

/// The patch payload fetched for a patch resolvable.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatchPlan {
    pub path: String,
    #[serde(default)]
    pub size: u64,
    pub error: Option<String>,
}

impl Plan {
    /// Parse a plan from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        let plan: Self = toml::from_str(text).context("Invalid plan")?;
        if !(1..=MAX_STEPS).contains(&plan.steps) {
            anyhow::bail!("Invalid plan: steps must be between 1 and {MAX_STEPS}");
        }
        Ok(plan)
    }

    /// Read and parse the plan at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read plan {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("Failed to load plan {}", path.display()))
    }

    /// The source a package is fetched from.
    pub fn source_for(&self, package: &PackagePlan) -> SourceLocator {
        package
            .source
            .as_deref()
            .and_then(|alias| self.sources.iter().find(|s| s.alias == alias))
            .or_else(|| self.sources.first())
            .map_or_else(|| SourceLocator::new("local"), SourcePlan::locator)
    }
}

//! Identity and outcome types shared by the engine and the reporters.
//!
//! Source locators and resolvable identities are opaque pass-through values:
//! the core only compares and displays them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Location of a package source (usually a URL), passed through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceLocator(String);

impl SourceLocator {
    /// Wrap a locator string as-is.
    pub fn new(locator: &str) -> Self {
        Self(locator.to_string())
    }

    /// Return the locator as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SourceLocator {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SourceLocator {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A configured source: its user-facing alias plus where it lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceId {
    /// Short name used to prefix task messages, e.g. `oss`.
    pub alias: String,
    /// Where the source lives.
    pub locator: SourceLocator,
}

impl SourceId {
    /// Create a source identity.
    pub fn new(alias: &str, locator: impl Into<SourceLocator>) -> Self {
        Self {
            alias: alias.to_string(),
            locator: locator.into(),
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}) {}", self.alias, self.locator)
    }
}

/// What kind of installable unit a resolvable is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResolvableKind {
    /// A regular package.
    #[default]
    Package,
    /// A patch (bundle of package updates).
    Patch,
}

impl fmt::Display for ResolvableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Package => write!(f, "package"),
            Self::Patch => write!(f, "patch"),
        }
    }
}

/// An installable unit identified for download.
///
/// Two resolvables are the same subject when kind, name and version match;
/// the sizes are display metadata only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolvable {
    /// Package or patch.
    pub kind: ResolvableKind,
    /// Name, e.g. `vim`.
    pub name: String,
    /// Edition string, e.g. `9.1.0-3`.
    pub version: String,
    /// Compressed size on the wire, when the metadata carries it.
    pub archive_size: Option<u64>,
    /// Size once unpacked, when the metadata carries it.
    pub installed_size: Option<u64>,
}

impl Resolvable {
    /// A package resolvable without size metadata.
    pub fn package(name: &str, version: &str) -> Self {
        Self {
            kind: ResolvableKind::Package,
            name: name.to_string(),
            version: version.to_string(),
            archive_size: None,
            installed_size: None,
        }
    }

    /// Attach size metadata.
    pub fn with_sizes(mut self, archive: u64, installed: u64) -> Self {
        self.archive_size = Some(archive);
        self.installed_size = Some(installed);
        self
    }

    /// Whether `other` denotes the same subject.
    pub fn same_subject(&self, other: &Self) -> bool {
        self.kind == other.kind && self.name == other.name && self.version == other.version
    }
}

impl PartialEq for Resolvable {
    fn eq(&self, other: &Self) -> bool {
        self.same_subject(other)
    }
}

impl Eq for Resolvable {}

impl fmt::Display for Resolvable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.name, self.version)
    }
}

/// Result code the executing layer attaches to problems and finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeCode {
    /// Completed successfully.
    #[default]
    Ok,
    /// The requested resource does not exist.
    NotFound,
    /// Reading, writing or transferring failed.
    IoError,
    /// The data was not in an understood format.
    InvalidFormat,
    /// Access was refused.
    Unauthorized,
    /// A user decision stopped the operation.
    AbortedByUser,
    /// Anything else.
    Unknown,
}

impl OutcomeCode {
    /// `true` only for [`OutcomeCode::Ok`].
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }
}

impl fmt::Display for OutcomeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Ok => "ok",
            Self::NotFound => "not found",
            Self::IoError => "i/o error",
            Self::InvalidFormat => "invalid format",
            Self::Unauthorized => "unauthorized",
            Self::AbortedByUser => "aborted by user",
            Self::Unknown => "error",
        };
        write!(f, "{s}")
    }
}

/// What the engine must do after a problem was reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    /// Re-attempt the same step.
    Retry,
    /// Skip this subject and continue with the rest.
    Ignore,
    /// Stop the whole operation.
    Abort,
}

impl Decision {
    /// Parse a user answer: `a`/`r`/`i` or the full word, case-insensitive.
    pub fn from_answer(answer: &str) -> Option<Self> {
        match answer.trim().to_ascii_lowercase().as_str() {
            "a" | "abort" => Some(Self::Abort),
            "r" | "retry" => Some(Self::Retry),
            "i" | "ignore" => Some(Self::Ignore),
            _ => None,
        }
    }

    /// Single-letter key used in prompts.
    pub fn key(self) -> char {
        match self {
            Self::Abort => 'a',
            Self::Retry => 'r',
            Self::Ignore => 'i',
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Retry => write!(f, "retry"),
            Self::Ignore => write!(f, "ignore"),
            Self::Abort => write!(f, "abort"),
        }
    }
}

impl std::str::FromStr for Decision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_answer(s).ok_or_else(|| format!("unknown decision '{s}'"))
    }
}

/// Format bytes for human-readable display
pub fn format_size(bytes: u64) -> String {
    let kb = bytes as f64 / 1024.0;
    let mb = kb / 1024.0;
    if mb >= 1024.0 {
        format!("{:.1} GB", mb / 1024.0)
    } else if kb >= 1024.0 {
        format!("{mb:.1} MB")
    } else if kb >= 1.0 {
        format!("{kb:.1} KB")
    } else {
        format!("{bytes} B")
    }
}

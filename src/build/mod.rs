//! Read-only view of a finished build as handed over by the CI host.
//!
//! A record carries its verdict, the change set that went into it and an
//! optional link to the build that ran before it.

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::notifications::{classify, BuildOutcome};

/// Build verdict on an ordered scale, best first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Success,
    Unstable,
    Failure,
    NotBuilt,
    Aborted,
}

impl Verdict {
    /// True when `self` is at least as good as `other` on the verdict scale
    pub fn is_better_or_equal_to(self, other: Verdict) -> bool {
        self <= other
    }

    /// Anything short of a clean success counts as failing
    pub fn is_passing(self) -> bool {
        self.is_better_or_equal_to(Verdict::Success)
    }

    pub const ALL: [Verdict; 5] = [
        Verdict::Success,
        Verdict::Unstable,
        Verdict::Failure,
        Verdict::NotBuilt,
        Verdict::Aborted,
    ];
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Unstable => write!(f, "unstable"),
            Self::Failure => write!(f, "failure"),
            Self::NotBuilt => write!(f, "not_built"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

impl std::str::FromStr for Verdict {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "success" => Ok(Self::Success),
            "unstable" => Ok(Self::Unstable),
            "failure" => Ok(Self::Failure),
            "not_built" => Ok(Self::NotBuilt),
            "aborted" => Ok(Self::Aborted),
            _ => Err(format!("Unknown verdict: {}", s)),
        }
    }
}

/// One change that went into a build
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangeEntry {
    /// Author display name as the build system knows it
    pub author: String,
}

impl ChangeEntry {
    pub fn new(author: impl Into<String>) -> Self {
        Self {
            author: author.into(),
        }
    }
}

/// A finished build
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildRecord {
    pub verdict: Verdict,
    pub timestamp: DateTime<FixedOffset>,
    /// Permanent link to the build page
    pub url: String,
    #[serde(default)]
    pub changes: Vec<ChangeEntry>,
    /// The chronologically preceding build, if there was one
    #[serde(default)]
    pub previous: Option<Box<BuildRecord>>,
}

impl BuildRecord {
    /// Verdict of the preceding build
    pub fn previous_verdict(&self) -> Option<Verdict> {
        self.previous.as_ref().map(|p| p.verdict)
    }

    /// Classify this build against the one before it
    pub fn outcome(&self) -> BuildOutcome {
        classify(self.verdict, self.previous_verdict())
    }

    /// Load a record from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read build record: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse build record: {}", path.display()))
    }
}

//! Four-way classification of a build against the build before it.

use serde::{Deserialize, Serialize};

use crate::build::Verdict;

/// Outcome of a build relative to its predecessor
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BuildOutcome {
    Success,
    Failure,
    ContinuousFailure,
    Recovered,
}

impl BuildOutcome {
    pub const ALL: [BuildOutcome; 4] = [
        BuildOutcome::Success,
        BuildOutcome::Failure,
        BuildOutcome::ContinuousFailure,
        BuildOutcome::Recovered,
    ];
}

impl std::fmt::Display for BuildOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
            Self::ContinuousFailure => write!(f, "continuous_failure"),
            Self::Recovered => write!(f, "recovered"),
        }
    }
}

impl std::str::FromStr for BuildOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "success" => Ok(Self::Success),
            "failure" => Ok(Self::Failure),
            "continuous_failure" => Ok(Self::ContinuousFailure),
            "recovered" => Ok(Self::Recovered),
            _ => Err(format!("Unknown build outcome: {}", s)),
        }
    }
}

/// Classify a build from its verdict and the verdict of the previous build.
///
/// Only the pass/fail split matters: an unstable or aborted build fails just
/// like a broken one.
pub fn classify(current: Verdict, previous: Option<Verdict>) -> BuildOutcome {
    let passing = current.is_passing();
    match previous.map(Verdict::is_passing) {
        // First build, or success before: success -> success, success -> fail
        None | Some(true) => {
            if passing {
                BuildOutcome::Success
            } else {
                BuildOutcome::Failure
            }
        }
        // fail -> success, fail -> fail
        Some(false) => {
            if passing {
                BuildOutcome::Recovered
            } else {
                BuildOutcome::ContinuousFailure
            }
        }
    }
}

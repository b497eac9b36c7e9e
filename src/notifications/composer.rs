//! Builds the status text for a classified build.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use super::authors::AuthorDirectory;
use super::error::ConfigurationError;
use super::outcome::BuildOutcome;
use super::template::{ArgKind, FormatArg, Template};
use crate::build::{BuildRecord, ChangeEntry};

/// Authors, timestamp and build link
const TEMPLATE_ARGS: [ArgKind; 3] = [ArgKind::Text, ArgKind::Time, ArgKind::Text];

/// One message template per outcome
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TemplateSet {
    #[serde(default)]
    pub success: Option<String>,
    #[serde(default)]
    pub failure: Option<String>,
    #[serde(default)]
    pub continuous_failure: Option<String>,
    #[serde(default)]
    pub recovered: Option<String>,
}

impl TemplateSet {
    /// Raw template for an outcome; blank templates count as missing
    pub fn get(&self, outcome: BuildOutcome) -> Option<&str> {
        let template = match outcome {
            BuildOutcome::Success => &self.success,
            BuildOutcome::Failure => &self.failure,
            BuildOutcome::ContinuousFailure => &self.continuous_failure,
            BuildOutcome::Recovered => &self.recovered,
        };
        template.as_deref().filter(|t| !t.trim().is_empty())
    }

    /// Parse and check the template for an outcome
    pub fn template(&self, outcome: BuildOutcome) -> Result<Template, ConfigurationError> {
        let source = self
            .get(outcome)
            .ok_or(ConfigurationError::MissingTemplate(outcome))?;
        let invalid = |source| ConfigurationError::InvalidTemplate { outcome, source };

        let template = Template::parse(source).map_err(invalid)?;
        template.check_args(&TEMPLATE_ARGS).map_err(invalid)?;
        Ok(template)
    }
}

/// Render the message for a build.
///
/// The timestamp is handed to the template untouched so its directive decides
/// the date layout. Whether this outcome should be announced at all is the
/// caller's decision.
pub fn compose(
    outcome: BuildOutcome,
    templates: &TemplateSet,
    changes: &[ChangeEntry],
    directory: &AuthorDirectory,
    timestamp: DateTime<FixedOffset>,
    build_link: &str,
) -> Result<String, ConfigurationError> {
    let template = templates.template(outcome)?;
    let authors = directory.resolve(changes);

    let args = [
        FormatArg::Text(authors),
        FormatArg::Time(timestamp),
        FormatArg::Text(build_link.to_string()),
    ];
    template
        .render(&args)
        .map_err(|source| ConfigurationError::InvalidTemplate { outcome, source })
}

/// Classify a build and render its message with the given link.
///
/// Shared by the notifier and the `preview` command so both produce the same
/// text. Ignores the per-outcome switches.
pub fn compose_build(
    templates: &TemplateSet,
    directory: &AuthorDirectory,
    build: &BuildRecord,
    build_link: &str,
) -> Result<(BuildOutcome, String), ConfigurationError> {
    let outcome = build.outcome();
    let message = compose(
        outcome,
        templates,
        &build.changes,
        directory,
        build.timestamp,
        build_link,
    )?;
    Ok((outcome, message))
}

//! Build notifications.
//!
//! A finished build is classified against the build before it, the matching
//! template is rendered with the change authors and a short link to the build,
//! and the result is posted through a [`Transport`]. Notification problems are
//! logged and reported back as a [`Delivery`], never as a build failure.

pub mod authors;
pub mod composer;
pub mod error;
pub mod outcome;
pub mod template;
pub mod transport;
pub mod weibo;

pub use authors::{AuthorDirectory, AuthorMapping, UNKNOWN_AUTHOR};
pub use composer::{compose, compose_build, TemplateSet};
pub use error::{ConfigurationError, TransportError};
pub use outcome::{classify, BuildOutcome};
pub use template::{ArgKind, FormatArg, Template, TemplateError};
pub use transport::Transport;
pub use weibo::WeiboTransport;

use crate::build::BuildRecord;
use crate::config::NotifyConfig;

/// What happened to the notification for one build
#[derive(Debug)]
pub enum Delivery {
    /// Notifications for this outcome are switched off
    Disabled { outcome: BuildOutcome },
    /// The job configuration could not produce a message
    Misconfigured {
        outcome: BuildOutcome,
        error: ConfigurationError,
    },
    /// The message was composed but posting it failed
    Failed {
        outcome: BuildOutcome,
        message: String,
        error: TransportError,
    },
    Sent {
        outcome: BuildOutcome,
        message: String,
    },
}

impl Delivery {
    pub fn outcome(&self) -> BuildOutcome {
        match self {
            Self::Disabled { outcome }
            | Self::Misconfigured { outcome, .. }
            | Self::Failed { outcome, .. }
            | Self::Sent { outcome, .. } => *outcome,
        }
    }

    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent { .. })
    }
}

/// Classifies, composes and sends the notification for a finished build
pub struct Notifier<T: Transport> {
    settings: NotifyConfig,
    directory: AuthorDirectory,
    transport: T,
}

impl<T: Transport> Notifier<T> {
    pub fn new(settings: NotifyConfig, directory: AuthorDirectory, transport: T) -> Self {
        Self {
            settings,
            directory,
            transport,
        }
    }

    /// Replace the author snapshot between builds
    pub fn with_directory(mut self, directory: AuthorDirectory) -> Self {
        self.directory = directory;
        self
    }

    /// Run the whole notification for a finished build
    pub async fn notify(&self, build: &BuildRecord) -> Delivery {
        let outcome = build.outcome();

        if !self.settings.is_enabled(outcome) {
            tracing::debug!(outcome = %outcome, "Notifications disabled for outcome");
            return Delivery::Disabled { outcome };
        }

        let link = match self.transport.shorten(&build.url).await {
            Ok(short) => short,
            Err(e) => {
                tracing::warn!(
                    url = %build.url,
                    error = %e,
                    "Failed to shorten build link, using full URL"
                );
                build.url.clone()
            }
        };

        let message = match compose_build(&self.settings.templates, &self.directory, build, &link) {
            Ok((_, message)) => message,
            Err(error) => {
                tracing::error!(outcome = %outcome, error = %error, "Cannot compose notification");
                return Delivery::Misconfigured { outcome, error };
            }
        };

        tracing::info!(outcome = %outcome, message = %message, "Publishing build status");

        let delivery = match self.transport.post(&message).await {
            Ok(()) => Delivery::Sent { outcome, message },
            Err(error) => {
                tracing::error!(
                    outcome = %outcome,
                    error = %error,
                    "Failed to publish build status"
                );
                Delivery::Failed {
                    outcome,
                    message,
                    error,
                }
            }
        };

        tracing::info!("Build notifier done");
        delivery
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::{ChangeEntry, Verdict};
    use async_trait::async_trait;
    use chrono::DateTime;
    use std::sync::Mutex;

    const LONG_URL: &str = "http://ci.example.com/job/web/42/";

    /// In-memory transport that records posted messages
    #[derive(Default)]
    struct FakeTransport {
        fail_shorten: bool,
        fail_post: bool,
        posted: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn shorten(&self, url: &str) -> Result<String, TransportError> {
            if self.fail_shorten {
                return Err(TransportError::Api {
                    code: 10023,
                    message: "User requests out of rate limit!".to_string(),
                });
            }
            assert_eq!(url, LONG_URL);
            Ok("http://t.cn/short".to_string())
        }

        async fn post(&self, message: &str) -> Result<(), TransportError> {
            if self.fail_post {
                return Err(TransportError::Status {
                    status: 503,
                    body: "Service Unavailable".to_string(),
                });
            }
            self.posted.lock().unwrap().push(message.to_string());
            Ok(())
        }
    }

    fn record(verdict: Verdict, previous: Option<Verdict>, authors: &[&str]) -> BuildRecord {
        let timestamp = DateTime::parse_from_rfc3339("2012-05-07T13:24:00+08:00").unwrap();
        BuildRecord {
            verdict,
            timestamp,
            url: LONG_URL.to_string(),
            changes: authors.iter().map(|a| ChangeEntry::new(*a)).collect(),
            previous: previous.map(|verdict| {
                Box::new(BuildRecord {
                    verdict,
                    timestamp,
                    url: "http://ci.example.com/job/web/41/".to_string(),
                    changes: vec![],
                    previous: None,
                })
            }),
        }
    }

    fn settings() -> NotifyConfig {
        NotifyConfig {
            on_success: false,
            on_failure: true,
            on_continuous_failure: true,
            on_recovered: true,
            templates: TemplateSet {
                success: Some("%sgreen %3$s".to_string()),
                failure: Some("%sbroke it %3$s".to_string()),
                continuous_failure: Some("%sstill broken %3$s".to_string()),
                recovered: None,
            },
        }
    }

    fn directory() -> AuthorDirectory {
        AuthorDirectory::from_mappings(&[AuthorMapping {
            member_name: "Alice".to_string(),
            handle: "alice_w".to_string(),
        }])
    }

    fn notifier(transport: FakeTransport) -> Notifier<FakeTransport> {
        Notifier::new(settings(), directory(), transport)
    }

    #[tokio::test]
    async fn test_failure_is_posted() {
        let notifier = notifier(FakeTransport::default());
        let delivery = notifier
            .notify(&record(Verdict::Failure, Some(Verdict::Success), &["Alice"]))
            .await;

        assert!(delivery.is_sent());
        assert_eq!(delivery.outcome(), BuildOutcome::Failure);
        let posted = notifier.transport.posted.lock().unwrap();
        assert_eq!(posted.as_slice(), ["@alice_w broke it http://t.cn/short"]);
    }

    #[tokio::test]
    async fn test_disabled_outcome_sends_nothing() {
        let notifier = notifier(FakeTransport::default());
        let delivery = notifier.notify(&record(Verdict::Success, None, &["Alice"])).await;

        assert!(matches!(
            delivery,
            Delivery::Disabled {
                outcome: BuildOutcome::Success
            }
        ));
        assert!(notifier.transport.posted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_template_skips_sending() {
        let notifier = notifier(FakeTransport::default());
        let delivery = notifier
            .notify(&record(Verdict::Success, Some(Verdict::Aborted), &[]))
            .await;

        match delivery {
            Delivery::Misconfigured { outcome, error } => {
                assert_eq!(outcome, BuildOutcome::Recovered);
                assert_eq!(error, ConfigurationError::MissingTemplate(BuildOutcome::Recovered));
            }
            other => panic!("Expected Misconfigured, got {:?}", other),
        }
        assert!(notifier.transport.posted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_shorten_failure_falls_back_to_full_url() {
        let notifier = notifier(FakeTransport {
            fail_shorten: true,
            ..Default::default()
        });
        let delivery = notifier
            .notify(&record(Verdict::Failure, Some(Verdict::Failure), &["Mallory"]))
            .await;

        assert!(delivery.is_sent());
        let posted = notifier.transport.posted.lock().unwrap();
        assert_eq!(
            posted.as_slice(),
            [format!("{} still broken {}", UNKNOWN_AUTHOR, LONG_URL)]
        );
    }

    #[tokio::test]
    async fn test_post_failure_keeps_message() {
        let notifier = notifier(FakeTransport {
            fail_post: true,
            ..Default::default()
        });
        let delivery = notifier
            .notify(&record(Verdict::Unstable, None, &["Alice"]))
            .await;

        match delivery {
            Delivery::Failed {
                outcome,
                message,
                error,
            } => {
                assert_eq!(outcome, BuildOutcome::Failure);
                assert_eq!(message, "@alice_w broke it http://t.cn/short");
                assert!(matches!(error, TransportError::Status { status: 503, .. }));
            }
            other => panic!("Expected Failed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_directory_snapshot_can_be_replaced() {
        let notifier =
            notifier(FakeTransport::default()).with_directory(AuthorDirectory::default());
        let delivery = notifier
            .notify(&record(Verdict::Failure, None, &["Alice"]))
            .await;

        assert!(delivery.is_sent());
        let posted = notifier.transport.posted.lock().unwrap();
        assert_eq!(
            posted.as_slice(),
            [format!("{} broke it http://t.cn/short", UNKNOWN_AUTHOR)]
        );
    }
}

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

use crate::notifications::{AuthorDirectory, AuthorMapping, BuildOutcome, TemplateSet};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub weibo: WeiboConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    /// Build-system author name -> feed handle, in configured order
    #[serde(default)]
    pub authors: Vec<AuthorMapping>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeiboConfig {
    /// OAuth access token used for both shortening and posting
    pub access_token: Option<String>,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Timeout for each API request in seconds (default: 30)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for WeiboConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            api_base: default_api_base(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_api_base() -> String {
    "https://api.weibo.com/2".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Per-job switches and templates for each build outcome
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotifyConfig {
    #[serde(default)]
    pub on_success: bool,
    #[serde(default)]
    pub on_failure: bool,
    #[serde(default)]
    pub on_continuous_failure: bool,
    #[serde(default)]
    pub on_recovered: bool,
    #[serde(default)]
    pub templates: TemplateSet,
}

impl NotifyConfig {
    pub fn is_enabled(&self, outcome: BuildOutcome) -> bool {
        match outcome {
            BuildOutcome::Success => self.on_success,
            BuildOutcome::Failure => self.on_failure,
            BuildOutcome::ContinuousFailure => self.on_continuous_failure,
            BuildOutcome::Recovered => self.on_recovered,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| "Failed to parse configuration file")?;
            Ok(config)
        } else {
            info!("No config file found, using defaults");
            Ok(Config::default())
        }
    }

    pub fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            weibo: WeiboConfig::default(),
            notify: NotifyConfig::default(),
            authors: Vec::new(),
        }
    }

    /// Snapshot of the author mappings for one notification
    pub fn author_directory(&self) -> AuthorDirectory {
        AuthorDirectory::from_mappings(&self.authors)
    }

    /// Problems that would stop notifications from going out
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.weibo.access_token.as_deref().unwrap_or("").is_empty() {
            problems.push("Please set your weibo access token".to_string());
        }
        if self.weibo.timeout_secs == 0 {
            problems.push("weibo.timeout_secs must be greater than 0".to_string());
        }

        for outcome in BuildOutcome::ALL {
            let configured = self.notify.templates.get(outcome).is_some();
            if !configured && !self.notify.is_enabled(outcome) {
                continue;
            }
            if let Err(e) = self.notify.templates.template(outcome) {
                problems.push(e.to_string());
            }
        }

        for (i, author) in self.authors.iter().enumerate() {
            if author.member_name.is_empty() || author.handle.is_empty() {
                problems.push(format!(
                    "authors[{}] needs both member_name and handle; entry is ignored",
                    i
                ));
            }
        }

        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
[logging]
level = "debug"

[weibo]
access_token = "2.00abc"
timeout_secs = 10

[notify]
on_failure = true
on_recovered = true

[notify.templates]
failure = "%s把构建弄坏了 %3$s"
recovered = "%s修好了构建 %3$s"

[[authors]]
member_name = "Alice"
handle = "alice_w"

[[authors]]
member_name = "Bob"
handle = "bobby"
"#;

    #[test]
    fn test_load_sample() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.weibo.access_token.as_deref(), Some("2.00abc"));
        assert_eq!(config.weibo.api_base, "https://api.weibo.com/2");
        assert_eq!(config.weibo.timeout_secs, 10);
        assert!(config.notify.is_enabled(BuildOutcome::Failure));
        assert!(!config.notify.is_enabled(BuildOutcome::Success));
        assert_eq!(config.authors.len(), 2);
        assert_eq!(config.author_directory().lookup("Bob"), Some("bobby"));
        assert!(config.validate().is_empty(), "{:?}", config.validate());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("buildfeed.toml")).unwrap();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.weibo.timeout_secs, 30);
        assert!(config.authors.is_empty());
        for outcome in BuildOutcome::ALL {
            assert!(!config.notify.is_enabled(outcome));
        }
    }

    #[test]
    fn test_invalid_toml_has_context() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"[notify\non_success = ").unwrap();

        let err = Config::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse configuration file"));
    }

    #[test]
    fn test_validate_reports_problems() {
        let config: Config = toml::from_str(
            r#"
[notify]
on_success = true
on_failure = true

[notify.templates]
failure = "%s %s %s %s"
continuous_failure = "%q"

[[authors]]
member_name = "Alice"
handle = ""
"#,
        )
        .unwrap();

        let problems = config.validate();
        assert_eq!(problems.len(), 5, "{:?}", problems);
        assert_eq!(problems[0], "Please set your weibo access token");
        assert!(problems[1].contains("No template configured for success"));
        assert!(problems[2].contains("failure"));
        assert!(problems[3].contains("continuous_failure"));
        assert!(problems[4].starts_with("authors[0]"));
    }

    #[test]
    fn test_validate_reports_date_directive_on_text() {
        let config: Config = toml::from_str(
            r#"
[weibo]
access_token = "2.00abc"

[notify]
on_failure = true

[notify.templates]
failure = "%tF %3$s"
"#,
        )
        .unwrap();

        let problems = config.validate();
        assert_eq!(problems.len(), 1, "{:?}", problems);
        assert!(problems[0].contains("failure"));
        assert!(problems[0].contains("Date/time conversion applied to text argument 1"));
    }

    #[test]
    fn test_validate_reports_oversized_width() {
        let config: Config = toml::from_str(
            r#"
[weibo]
access_token = "2.00abc"

[notify.templates]
recovered = "%99999999999999999999s"
"#,
        )
        .unwrap();

        let problems = config.validate();
        assert_eq!(problems.len(), 1, "{:?}", problems);
        assert!(problems[0].contains("too large"));
    }
}

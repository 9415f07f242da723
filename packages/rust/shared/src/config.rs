//! Application configuration for EventFeed.
//!
//! User config lives at `~/.eventfeed/eventfeed.toml`.
//! CLI flags override config file values, which override defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{EventFeedError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "eventfeed.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".eventfeed";

// ---------------------------------------------------------------------------
// Config structs (matching eventfeed.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where events are scraped from.
    #[serde(default)]
    pub source: SourceConfig,

    /// Fetch driver settings.
    #[serde(default)]
    pub fetch: FetchSettings,

    /// Feed and summary rendering.
    #[serde(default)]
    pub feed: FeedConfig,

    /// Output file locations.
    #[serde(default)]
    pub output: OutputConfig,
}

/// `[source]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Calendar page queried once per period.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Facet filters, JSON-encoded into the `facets` query parameter.
    #[serde(default = "default_facets")]
    pub facets: BTreeMap<String, String>,

    /// Display name of the source site, used in item descriptions.
    #[serde(default = "default_site_name")]
    pub site_name: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            facets: default_facets(),
            site_name: default_site_name(),
        }
    }
}

fn default_base_url() -> String {
    "https://www.flograppling.com/events".into()
}
fn default_facets() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("Event Type".to_string(), "Brazilian Jiu-Jitsu".to_string()),
        ("Streaming Source".to_string(), "FloSports".to_string()),
    ])
}
fn default_site_name() -> String {
    "FloGrappling".into()
}

/// `[fetch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchSettings {
    /// Maximum concurrent period fetches.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Politeness delay in ms before each request.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User-Agent header sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            delay_ms: default_delay_ms(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_concurrency() -> u32 {
    2
}
fn default_delay_ms() -> u64 {
    1000
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_user_agent() -> String {
    concat!("EventFeed/", env!("CARGO_PKG_VERSION")).into()
}

/// What the assembler does with events whose date could not be parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownDatePolicy {
    /// Publish with the processing-time fallback, as if the date were known.
    #[default]
    Include,
    /// Publish, but mark the title as unconfirmed.
    Flag,
    /// Leave the event out of the feed and summary.
    Exclude,
}

/// `[feed]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Channel title.
    #[serde(default = "default_feed_title")]
    pub title: String,

    /// Channel description.
    #[serde(default = "default_feed_description")]
    pub description: String,

    /// Number of events listed in the summary page.
    #[serde(default = "default_summary_limit")]
    pub summary_limit: usize,

    /// Offset applied to naive event timestamps when rendering dates.
    #[serde(default)]
    pub utc_offset_minutes: i32,

    /// Handling of events with unparsed dates.
    #[serde(default)]
    pub unknown_dates: UnknownDatePolicy,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            title: default_feed_title(),
            description: default_feed_description(),
            summary_limit: default_summary_limit(),
            utc_offset_minutes: 0,
            unknown_dates: UnknownDatePolicy::default(),
        }
    }
}

fn default_feed_title() -> String {
    "FloGrappling BJJ Events".into()
}
fn default_feed_description() -> String {
    "Upcoming and past BJJ events from FloGrappling".into()
}
fn default_summary_limit() -> usize {
    10
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving the feed and summary page.
    #[serde(default = "default_output_dir")]
    pub dir: String,

    /// Feed file name inside `dir`.
    #[serde(default = "default_feed_file")]
    pub feed_file: String,

    /// Summary page file name inside `dir`.
    #[serde(default = "default_summary_file")]
    pub summary_file: String,

    /// When set, raw page snapshots are dumped here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_dir: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            feed_file: default_feed_file(),
            summary_file: default_summary_file(),
            debug_dir: None,
        }
    }
}

fn default_output_dir() -> String {
    "docs".into()
}
fn default_feed_file() -> String {
    "events.xml".into()
}
fn default_summary_file() -> String {
    "index.html".into()
}

// ---------------------------------------------------------------------------
// Fetch config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime fetch configuration: merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Calendar page queried once per period.
    pub base_url: String,
    /// Facet filters for the `facets` query parameter.
    pub facets: BTreeMap<String, String>,
    /// Maximum concurrent period fetches.
    pub concurrency: u32,
    /// Politeness delay in ms before each request.
    pub delay_ms: u64,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// User-Agent header.
    pub user_agent: String,
    /// Directory receiving raw page dumps, if any.
    pub debug_dir: Option<PathBuf>,
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            base_url: config.source.base_url.clone(),
            facets: config.source.facets.clone(),
            concurrency: config.fetch.concurrency,
            delay_ms: config.fetch.delay_ms,
            timeout_secs: config.fetch.timeout_secs,
            user_agent: config.fetch.user_agent.clone(),
            debug_dir: config.output.debug_dir.as_ref().map(PathBuf::from),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.eventfeed/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| EventFeedError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.eventfeed/eventfeed.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| EventFeedError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        EventFeedError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    config.validate()?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| EventFeedError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| EventFeedError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| EventFeedError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

impl AppConfig {
    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.source.base_url).map_err(|e| {
            EventFeedError::config(format!("invalid base_url '{}': {e}", self.source.base_url))
        })?;
        if self.fetch.concurrency == 0 {
            return Err(EventFeedError::config("fetch.concurrency must be at least 1"));
        }
        // chrono::FixedOffset accepts strictly less than one day
        if self.feed.utc_offset_minutes.abs() >= 24 * 60 {
            return Err(EventFeedError::config(format!(
                "feed.utc_offset_minutes {} is out of range",
                self.feed.utc_offset_minutes
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("base_url"));
        assert!(toml_str.contains("Brazilian Jiu-Jitsu"));
        assert!(!toml_str.contains("debug_dir"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.feed.summary_limit, 10);
        assert_eq!(parsed.feed.unknown_dates, UnknownDatePolicy::Include);
        assert_eq!(parsed.source.facets.len(), 2);
    }

    #[test]
    fn partial_config_uses_defaults() {
        let toml_str = r#"
[source]
base_url = "https://calendar.example.com/events"

[feed]
unknown_dates = "exclude"
utc_offset_minutes = -300
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.source.base_url, "https://calendar.example.com/events");
        assert_eq!(config.source.site_name, "FloGrappling");
        assert_eq!(config.feed.unknown_dates, UnknownDatePolicy::Exclude);
        assert_eq!(config.feed.utc_offset_minutes, -300);
        assert_eq!(config.fetch.concurrency, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn fetch_config_from_app_config() {
        let mut app = AppConfig::default();
        app.output.debug_dir = Some("debug".into());
        let fetch = FetchConfig::from(&app);
        assert_eq!(fetch.concurrency, 2);
        assert_eq!(fetch.delay_ms, 1000);
        assert_eq!(fetch.debug_dir, Some(PathBuf::from("debug")));
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.source.base_url = "not a url".into();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.fetch.concurrency = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.feed.utc_offset_minutes = 24 * 60;
        assert!(config.validate().is_err());
    }
}

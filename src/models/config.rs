//! Application configuration structures.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Longest accepted sleep or heartbeat period: one week.
pub const MAX_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP client behavior
    #[serde(default)]
    pub http: HttpConfig,

    /// Sweep cadence and heartbeat
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Where snapshots and archives go
    #[serde(default)]
    pub output: OutputConfig,

    /// Notification behavior
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Structured-API endpoints
    #[serde(default)]
    pub vendors: VendorConfig,

    /// Browser-navigation script
    #[serde(default)]
    pub browser: BrowserConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        if self.schedule.request_rate_secs == 0 {
            return Err(AppError::validation(
                "schedule.request_rate_secs must be > 0",
            ));
        }
        let schedule = &self.schedule;
        for (name, secs) in [
            ("request_rate_secs", schedule.request_rate_secs),
            ("variance_secs", schedule.variance_secs),
            ("min_rate_secs", schedule.min_rate_secs),
            ("heartbeat_mins", schedule.heartbeat_mins.saturating_mul(60)),
        ] {
            if secs > MAX_INTERVAL_SECS {
                return Err(AppError::validation(format!(
                    "schedule.{name} exceeds {MAX_INTERVAL_SECS} seconds"
                )));
            }
        }
        if schedule.heartbeat_enabled && schedule.heartbeat_mins == 0 {
            return Err(AppError::validation("schedule.heartbeat_mins must be > 0"));
        }
        if self.output.status_file.trim().is_empty() {
            return Err(AppError::validation("output.status_file is empty"));
        }
        if !self.vendors.cvs_url_template.contains("{state}") {
            return Err(AppError::validation(
                "vendors.cvs_url_template must contain {state}",
            ));
        }
        if self.browser.poll_interval_ms == 0 {
            return Err(AppError::validation("browser.poll_interval_ms must be > 0"));
        }
        if self.browser.wait_timeout_secs == 0 {
            return Err(AppError::validation("browser.wait_timeout_secs must be > 0"));
        }
        Ok(())
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Sweep loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Base interval between sweeps
    #[serde(default = "defaults::request_rate")]
    pub request_rate_secs: u64,

    /// Random +/- spread applied to the base interval
    #[serde(default = "defaults::variance")]
    pub variance_secs: u64,

    /// Lower bound for any sleep
    #[serde(default = "defaults::min_rate")]
    pub min_rate_secs: u64,

    /// Stop after this many sweeps (0 = run until interrupted)
    #[serde(default)]
    pub max_sweeps: u64,

    #[serde(default = "defaults::enabled")]
    pub heartbeat_enabled: bool,

    #[serde(default = "defaults::heartbeat")]
    pub heartbeat_mins: u64,
}

impl ScheduleConfig {
    pub fn heartbeat_period(&self) -> Option<Duration> {
        self.heartbeat_enabled
            .then(|| Duration::from_secs(self.heartbeat_mins.saturating_mul(60)))
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            request_rate_secs: defaults::request_rate(),
            variance_secs: defaults::variance(),
            min_rate_secs: defaults::min_rate(),
            max_sweeps: 0,
            heartbeat_enabled: defaults::enabled(),
            heartbeat_mins: defaults::heartbeat(),
        }
    }
}

/// Snapshot output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "defaults::output_dir")]
    pub dir: String,

    /// Canonical snapshot file name inside `dir`
    #[serde(default = "defaults::status_file")]
    pub status_file: String,

    /// Keep timestamped copies of snapshots and evidence
    #[serde(default = "defaults::enabled")]
    pub archive: bool,

    /// Archive directory, relative to `dir`
    #[serde(default = "defaults::archive_dir")]
    pub archive_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: defaults::output_dir(),
            status_file: defaults::status_file(),
            archive: defaults::enabled(),
            archive_dir: defaults::archive_dir(),
        }
    }
}

/// Notification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Send email; when off, notifications are only logged
    #[serde(default = "defaults::enabled")]
    pub enabled: bool,

    #[serde(default = "defaults::subject")]
    pub subject: String,

    /// Announce process start
    #[serde(default = "defaults::enabled")]
    pub startup_message: bool,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::enabled(),
            subject: defaults::subject(),
            startup_message: defaults::enabled(),
        }
    }
}

/// Structured-API endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorConfig {
    /// CVS status feed; `{state}` is replaced by the two-letter state
    #[serde(default = "defaults::cvs_url_template")]
    pub cvs_url_template: String,

    /// HEB location feed
    #[serde(default = "defaults::heb_url")]
    pub heb_url: String,
}

impl VendorConfig {
    pub fn cvs_url(&self, state: &str) -> String {
        self.cvs_url_template.replace("{state}", state)
    }
}

impl Default for VendorConfig {
    fn default() -> Self {
        Self {
            cvs_url_template: defaults::cvs_url_template(),
            heb_url: defaults::heb_url(),
        }
    }
}

/// Browser-navigation script settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// WebDriver server (chromedriver, geckodriver, selenium)
    #[serde(default = "defaults::webdriver_url")]
    pub webdriver_url: String,

    #[serde(default = "defaults::enabled")]
    pub headless: bool,

    #[serde(default = "defaults::landing_url")]
    pub landing_url: String,

    /// Acknowledgement control clicked on the landing page
    #[serde(default = "defaults::ack_selector")]
    pub ack_selector: String,

    #[serde(default = "defaults::search_url")]
    pub search_url: String,

    #[serde(default = "defaults::query_selector")]
    pub query_selector: String,

    #[serde(default = "defaults::submit_selector")]
    pub submit_selector: String,

    /// Element that carries the search outcome
    #[serde(default = "defaults::result_selector")]
    pub result_selector: String,

    #[serde(default = "defaults::poll_interval")]
    pub poll_interval_ms: u64,

    #[serde(default = "defaults::wait_timeout")]
    pub wait_timeout_secs: u64,
}

impl BrowserConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout_secs)
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: defaults::webdriver_url(),
            headless: defaults::enabled(),
            landing_url: defaults::landing_url(),
            ack_selector: defaults::ack_selector(),
            search_url: defaults::search_url(),
            query_selector: defaults::query_selector(),
            submit_selector: defaults::submit_selector(),
            result_selector: defaults::result_selector(),
            poll_interval_ms: defaults::poll_interval(),
            wait_timeout_secs: defaults::wait_timeout(),
        }
    }
}

mod defaults {
    pub fn enabled() -> bool {
        true
    }

    // HTTP defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; slot-monitor/0.1)".into()
    }
    pub fn timeout() -> u64 {
        10
    }

    // Schedule defaults
    pub fn request_rate() -> u64 {
        5 * 60
    }
    pub fn variance() -> u64 {
        10
    }
    pub fn min_rate() -> u64 {
        5
    }
    pub fn heartbeat() -> u64 {
        30
    }

    // Output defaults
    pub fn output_dir() -> String {
        "status".into()
    }
    pub fn status_file() -> String {
        "status.json".into()
    }
    pub fn archive_dir() -> String {
        "archive".into()
    }

    pub fn subject() -> String {
        "Vaccine Checker".into()
    }

    // Vendor defaults
    pub fn cvs_url_template() -> String {
        "https://www.cvs.com/immunizations/covid-19-vaccine.vaccine-status.{state}.json?vaccineinfo"
            .into()
    }
    pub fn heb_url() -> String {
        "https://heb-ecom-covid-vaccine.hebdigital-prd.com/vaccine_locations.json".into()
    }

    // Browser defaults
    pub fn webdriver_url() -> String {
        "http://localhost:4444".into()
    }
    pub fn landing_url() -> String {
        "https://www.walgreens.com/findcare/vaccination/covid-19".into()
    }
    pub fn ack_selector() -> String {
        "a[href*='location-screening']".into()
    }
    pub fn search_url() -> String {
        "https://www.walgreens.com/findcare/vaccination/covid-19/location-screening".into()
    }
    pub fn query_selector() -> String {
        "input#inputLocation".into()
    }
    pub fn submit_selector() -> String {
        "button[type='submit']".into()
    }
    pub fn result_selector() -> String {
        "section.LocationScreeningResult p.fs16".into()
    }
    pub fn poll_interval() -> u64 {
        500
    }
    pub fn wait_timeout() -> u64 {
        30
    }
}

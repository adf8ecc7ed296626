use serde::Deserialize;

/// Default storage location template for agent output files
pub const DEFAULT_STORAGE_TEMPLATE: &str =
    "https://phantombuster.s3.amazonaws.com/{orgS3Folder}/{s3Folder}/{filename}.json";

/// Main configuration structure for Company-Miner
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub platform: PlatformConfig,
    pub agents: AgentsConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub source: SourceConfig,
}

/// Automation platform connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformConfig {
    /// API key sent in the `X-Phantombuster-Key` header
    #[serde(rename = "api-key")]
    pub api_key: String,

    /// Endpoint that launches an agent and returns a container id
    #[serde(rename = "launch-endpoint")]
    pub launch_endpoint: String,

    /// Endpoint that returns the output metadata of an agent
    #[serde(rename = "fetch-endpoint")]
    pub fetch_endpoint: String,

    /// Endpoint that reports the status of a container
    #[serde(rename = "container-endpoint")]
    pub container_endpoint: String,

    /// Template for the final output location.
    /// Placeholders: `{orgS3Folder}`, `{s3Folder}`, `{filename}`
    #[serde(rename = "storage-template", default = "default_storage_template")]
    pub storage_template: String,

    /// Session cookie handed to the scraping agent
    #[serde(rename = "session-cookie", default)]
    pub session_cookie: Option<String>,

    /// Timeout for launch, status and metadata requests (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Timeout for the final output download (seconds)
    #[serde(rename = "output-timeout-secs", default = "default_output_timeout")]
    pub output_timeout_secs: u64,
}

/// Agent identifiers on the automation platform
#[derive(Debug, Clone, Deserialize)]
pub struct AgentsConfig {
    /// Agent that scrapes company profile pages
    #[serde(rename = "company-scraper")]
    pub company_scraper: String,

    /// Agent that searches for company profile URLs
    pub discovery: String,

    /// File name (without extension) the agents write their output to
    #[serde(rename = "output-filename", default = "default_output_filename")]
    pub output_filename: String,
}

/// Poll loop timing. All values are in seconds.
#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    #[serde(rename = "base-interval-secs", default = "default_base_interval")]
    pub base_interval_secs: u64,

    /// Delay after the status endpoint answered with an error status
    #[serde(rename = "http-error-delay-secs", default = "default_http_error_delay")]
    pub http_error_delay_secs: u64,

    /// Delay after the status request timed out
    #[serde(rename = "timeout-delay-secs", default = "default_timeout_delay")]
    pub timeout_delay_secs: u64,

    /// Delay after any other failure
    #[serde(
        rename = "unexpected-error-delay-secs",
        default = "default_unexpected_error_delay"
    )]
    pub unexpected_error_delay_secs: u64,

    /// Hard ceiling on the time spent waiting for one job
    #[serde(rename = "maximum-runtime-secs", default = "default_maximum_runtime")]
    pub maximum_runtime_secs: u64,
}

/// Downstream analytics service settings
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsConfig {
    #[serde(rename = "base-url")]
    pub base_url: String,
}

/// Source identity and inbound request interpretation
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Source tag written to every canonical record
    #[serde(default = "default_source_name")]
    pub name: String,

    /// Substring a value must contain to be treated as a profile URL
    #[serde(rename = "domain-marker", default = "default_domain_marker")]
    pub domain_marker: String,

    /// Field types of the inbound request that carry profile URLs
    #[serde(rename = "url-channels", default = "default_url_channels")]
    pub url_channels: Vec<String>,

    /// Crawl frequency reported when the source registers with analytics
    #[serde(default = "default_frequency")]
    pub frequency: String,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            base_interval_secs: default_base_interval(),
            http_error_delay_secs: default_http_error_delay(),
            timeout_delay_secs: default_timeout_delay(),
            unexpected_error_delay_secs: default_unexpected_error_delay(),
            maximum_runtime_secs: default_maximum_runtime(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            name: default_source_name(),
            domain_marker: default_domain_marker(),
            url_channels: default_url_channels(),
            frequency: default_frequency(),
        }
    }
}

fn default_storage_template() -> String {
    DEFAULT_STORAGE_TEMPLATE.to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_output_timeout() -> u64 {
    600
}

fn default_output_filename() -> String {
    "result".to_string()
}

fn default_base_interval() -> u64 {
    10
}

fn default_http_error_delay() -> u64 {
    20
}

fn default_timeout_delay() -> u64 {
    20
}

fn default_unexpected_error_delay() -> u64 {
    30
}

fn default_maximum_runtime() -> u64 {
    600
}

fn default_source_name() -> String {
    "linkedin".to_string()
}

fn default_domain_marker() -> String {
    "linkedin.com".to_string()
}

fn default_url_channels() -> Vec<String> {
    vec!["url".to_string(), "urls".to_string()]
}

fn default_frequency() -> String {
    "WEEKLY".to_string()
}

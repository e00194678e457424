use serde::Deserialize;

/// Root application configuration. Loaded from an optional TOML file and
/// environment variables with the prefix `BULK_MAILER__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub sending: SendingConfig,
    #[serde(default)]
    pub attachments: AttachmentsConfig,
    #[serde(default)]
    pub directory: DirectoryConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

/// Defaults used when the policy settings row is first materialised.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyConfig {
    /// When false, departmental campaigns fall back to the generic approver.
    #[serde(default = "default_dept_approval_enabled")]
    pub dept_approval_enabled: bool,
    #[serde(default = "default_max_test_recipients")]
    pub max_test_recipients: u32,
    #[serde(default = "default_throttle_per_minute")]
    pub default_throttle_per_minute: u32,
    #[serde(default = "default_send_window_hours")]
    pub send_window_hours: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendingConfig {
    /// Domains test sends may target. Empty or containing `*` allows all.
    #[serde(default)]
    pub internal_domains: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttachmentsConfig {
    #[serde(default = "default_attachments_path")]
    pub path: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirectoryConfig {
    /// JSON array of employees loaded into the in-memory directory at startup.
    #[serde(default)]
    pub seed_path: Option<String>,
}

// Default functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    8080
}
fn default_metrics_port() -> u16 {
    9091
}
fn default_dept_approval_enabled() -> bool {
    true
}
fn default_max_test_recipients() -> u32 {
    5
}
fn default_throttle_per_minute() -> u32 {
    60
}
fn default_send_window_hours() -> u32 {
    2
}
fn default_attachments_path() -> String {
    "./data/attachments".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            port: default_metrics_port(),
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            dept_approval_enabled: default_dept_approval_enabled(),
            max_test_recipients: default_max_test_recipients(),
            default_throttle_per_minute: default_throttle_per_minute(),
            send_window_hours: default_send_window_hours(),
        }
    }
}

impl Default for SendingConfig {
    fn default() -> Self {
        Self {
            internal_domains: Vec::new(),
        }
    }
}

impl Default for AttachmentsConfig {
    fn default() -> Self {
        Self {
            path: default_attachments_path(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            metrics: MetricsConfig::default(),
            policy: PolicyConfig::default(),
            sending: SendingConfig::default(),
            attachments: AttachmentsConfig::default(),
            directory: DirectoryConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `config_file` (if present) layered under
    /// `BULK_MAILER__*` environment variables.
    pub fn load_from(config_file: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = config_file {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }
        let builder = builder.add_source(
            config::Environment::with_prefix("BULK_MAILER")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("sending.internal_domains"),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(Some("config/bulk-mailer"))
    }
}

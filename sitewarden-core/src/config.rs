// Settings, loaded once at startup and passed down explicitly

use crate::error::ReportError;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::{Deserialize, Serialize};
use sitewarden_scanner::ClientSettings;
use std::path::{Path, PathBuf};

/// Written by `sitewarden init` and used as the lowest-priority source
pub const DEFAULT_CONFIG: &str = r#"# SiteWarden configuration
#
# Every key can be overridden with an environment variable prefixed with
# SITEWARDEN_, e.g. SITEWARDEN_TENANT_URL or SITEWARDEN_ACCESS_TOKEN.

# Root used to resolve server-relative site URLs such as /sites/hr
# tenant_url = "https://contoso.sharepoint.com"

# Bearer token issued by your identity provider. Prefer the environment
# variable over storing it here.
# access_token = ""

# Per-request timeout in seconds
timeout_secs = 30

# Default output format for reports: text, json, csv, markdown
default_format = "text"

# Walk sub-sites by default
recursive = false
"#;

pub const ENV_PREFIX: &str = "SITEWARDEN_";
pub const DEFAULT_CONFIG_DIR: &str = "~/.config/sitewarden/";
pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub tenant_url: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default = "default_format")]
    pub default_format: String,
    #[serde(default)]
    pub recursive: bool,
}

fn default_timeout() -> u64 {
    30
}

fn default_format() -> String {
    "text".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tenant_url: None,
            access_token: None,
            timeout_secs: default_timeout(),
            user_agent: None,
            default_format: default_format(),
            recursive: false,
        }
    }
}

impl Settings {
    /// Defaults, then the user config file, then `SITEWARDEN_*` variables
    pub fn load() -> Result<Self, ReportError> {
        Self::load_from(Some(&default_config_path()))
    }

    /// Same as [`Settings::load`] but reading `config_file` instead of the
    /// user config. A missing file is not an error.
    pub fn load_from(config_file: Option<&Path>) -> Result<Self, ReportError> {
        let mut figment = Figment::new().merge(Toml::string(DEFAULT_CONFIG));
        if let Some(path) = config_file {
            figment = figment.merge(Toml::file(path));
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX));

        Ok(figment.extract()?)
    }

    pub fn client_settings(&self) -> ClientSettings {
        let defaults = ClientSettings::default();
        ClientSettings {
            base_url: self.tenant_url.clone(),
            access_token: self.access_token.clone(),
            timeout_secs: self.timeout_secs,
            user_agent: self.user_agent.clone().unwrap_or(defaults.user_agent),
        }
    }
}

/// Expand `~` in a config directory argument
pub fn expand_config_dir(dir: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(dir).as_ref())
}

pub fn default_config_path() -> PathBuf {
    expand_config_dir(DEFAULT_CONFIG_DIR).join(CONFIG_FILE_NAME)
}

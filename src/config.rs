use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Daemon settings, taken from defaults, `routeglue.toml` and the environment.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    /// Base URL of the router control API.
    pub router_api_url: String,
    /// Docker endpoint: a unix socket path, `unix://` or `http://` URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docker_host: Option<String>,
    /// Host address used to build backends for discovered containers.
    pub host_ip: String,
    /// Routing file, re-read on every cycle.
    pub config_path: PathBuf,
    /// Container label holding the comma separated slug list.
    pub slug_label: String,
    /// Periodic rescan interval in milliseconds.
    pub interval_ms: u64,
    /// Skip a trigger while another cycle is still running.
    pub skip_overlapping: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            router_api_url: "http://127.0.0.1:8080".into(),
            docker_host: None,
            host_ip: "127.0.0.1".into(),
            config_path: PathBuf::from("routes.yaml"),
            slug_label: "routeglue.slug".into(),
            interval_ms: 5000,
            skip_overlapping: false,
        }
    }
}

impl Settings {
    pub fn load() -> anyhow::Result<Self> {
        let settings: Settings = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("routeglue.toml"))
            .merge(Env::prefixed("ROUTEGLUE_"))
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to load settings: {}", e))?;

        if settings.interval_ms == 0 {
            anyhow::bail!("interval_ms must be greater than zero");
        }
        Ok(settings)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Static route declaration for one slug.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ManualEntry {
    pub host: String,
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_suffix: Option<Vec<String>>,
}

impl ManualEntry {
    pub fn backend(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Contents of the routing file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RouteConfig {
    #[serde(default)]
    pub default_domain_suffix: Vec<String>,
    #[serde(default)]
    pub manual: BTreeMap<String, ManualEntry>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: Box<figment::Error>,
    },
}

impl RouteConfig {
    /// Read and parse the routing file.
    ///
    /// The format follows the extension: `.toml`, `.json`, anything else is
    /// YAML.  A missing file is an error, an empty one is an empty config.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if content.trim().is_empty() {
            return Ok(RouteConfig::default());
        }

        let figment = Figment::from(Serialized::defaults(RouteConfig::default()));
        let figment = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => figment.merge(Toml::string(&content)),
            Some("json") => figment.merge(Json::string(&content)),
            _ => figment.merge(Yaml::string(&content)),
        };

        figment.extract().map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: Box::new(e),
        })
    }
}

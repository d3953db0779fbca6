//! Configuration for the ChronoLog MCP server.
//!
//! Settings come from built-in defaults, optionally a TOML file, and then
//! environment variables, in that order of increasing precedence.
//!
//! # Environment Variables
//!
//! | Variable | Setting |
//! |---|---|
//! | `CHRONO_PROTOCOL` | `portal.protocol` |
//! | `CHRONO_HOST` | `portal.host` |
//! | `CHRONO_PORT` | `portal.port` |
//! | `CHRONO_TIMEOUT` | `portal.timeout_secs` |
//! | `CHRONICLE_NAME` | `session.default_chronicle` |
//! | `STORY_NAME` | `session.default_story` |
//! | `CHRONO_JOURNAL_DIR` | `session.journal_dir` |
//! | `HDF5_READER_BIN` | `reader.binary` |
//! | `CHRONO_CONF` | `reader.config_file` |
//! | `CHRONO_READER_TIMEOUT` | `reader.timeout_secs` |
//! | `CHRONO_RECORDS_DIR` | `reader.output_dir` |

use chronolog_common::{ChronologError, Result};
use chronolog_retrieval::ReaderConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Main server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    /// ChronoVisor portal connection
    #[serde(default)]
    pub portal: PortalConfig,

    /// Session defaults
    #[serde(default)]
    pub session: SessionConfig,

    /// External record reader
    #[serde(default)]
    pub reader: ReaderSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    /// Transport protocol, e.g. "ofi+sockets"
    #[serde(default = "default_protocol")]
    pub protocol: String,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Connect timeout in seconds
    #[serde(default = "default_portal_timeout")]
    pub timeout_secs: u64,
}

fn default_protocol() -> String {
    "ofi+sockets".into()
}

fn default_host() -> String {
    "127.0.0.1".into()
}

fn default_port() -> u16 {
    5555
}

fn default_portal_timeout() -> u64 {
    55
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            protocol: default_protocol(),
            host: default_host(),
            port: default_port(),
            timeout_secs: default_portal_timeout(),
        }
    }
}

impl PortalConfig {
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Chronicle used when a tool call names none
    #[serde(default = "default_chronicle")]
    pub default_chronicle: String,

    /// Story used when a tool call names none
    #[serde(default = "default_story")]
    pub default_story: String,

    /// Root directory of the journal backend
    #[serde(default = "default_journal_dir")]
    pub journal_dir: PathBuf,
}

fn default_chronicle() -> String {
    "LLM".into()
}

fn default_story() -> String {
    "conversation".into()
}

fn default_journal_dir() -> PathBuf {
    PathBuf::from("./chronolog-journal")
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_chronicle: default_chronicle(),
            default_story: default_story(),
            journal_dir: default_journal_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaderSettings {
    /// Path to the HDF5 record reader executable
    #[serde(default = "default_reader_binary")]
    pub binary: PathBuf,

    /// Configuration file passed to the reader
    #[serde(default = "default_reader_conf")]
    pub config_file: PathBuf,

    /// Kill the reader after this many seconds
    #[serde(default = "default_reader_timeout")]
    pub timeout_secs: u64,

    /// Where retrieval artifacts are written
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_reader_binary() -> PathBuf {
    PathBuf::from("hdf5_file_reader")
}

fn default_reader_conf() -> PathBuf {
    PathBuf::from("grapher_conf.json")
}

fn default_reader_timeout() -> u64 {
    120
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            binary: default_reader_binary(),
            config_file: default_reader_conf(),
            timeout_secs: default_reader_timeout(),
            output_dir: default_output_dir(),
        }
    }
}

impl ReaderSettings {
    pub fn to_reader_config(&self) -> ReaderConfig {
        ReaderConfig {
            binary: self.binary.clone(),
            config_file: self.config_file.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            output_dir: self.output_dir.clone(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            ChronologError::Config(format!("invalid config file '{}': {}", path.display(), e))
        })
    }

    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("CHRONO_PROTOCOL") {
            self.portal.protocol = v;
        }
        if let Some(v) = lookup("CHRONO_HOST") {
            self.portal.host = v;
        }
        if let Some(v) = lookup("CHRONO_PORT") {
            self.portal.port = parse_var("CHRONO_PORT", &v)?;
        }
        if let Some(v) = lookup("CHRONO_TIMEOUT") {
            self.portal.timeout_secs = parse_var("CHRONO_TIMEOUT", &v)?;
        }
        if let Some(v) = lookup("CHRONICLE_NAME") {
            self.session.default_chronicle = v;
        }
        if let Some(v) = lookup("STORY_NAME") {
            self.session.default_story = v;
        }
        if let Some(v) = lookup("CHRONO_JOURNAL_DIR") {
            self.session.journal_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("HDF5_READER_BIN") {
            self.reader.binary = PathBuf::from(v);
        }
        if let Some(v) = lookup("CHRONO_CONF") {
            self.reader.config_file = PathBuf::from(v);
        }
        if let Some(v) = lookup("CHRONO_READER_TIMEOUT") {
            self.reader.timeout_secs = parse_var("CHRONO_READER_TIMEOUT", &v)?;
        }
        if let Some(v) = lookup("CHRONO_RECORDS_DIR") {
            self.reader.output_dir = PathBuf::from(v);
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ChronologError::Config(format!("{name} has invalid value '{value}'")))
}

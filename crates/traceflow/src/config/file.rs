use crate::config::{constants, LogFormat, ReportFormat};
use anyhow::Context;
use encoding_rs_io::DecodeReaderBytes;
use etcetera::BaseStrategy;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::net::Ipv4Addr;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use traceflow_core::defaults;

const DEFAULT_CONFIG_FILE: &str = "traceflow.toml";
const DEFAULT_HIDDEN_CONFIG_FILE: &str = ".traceflow.toml";

/// Read the config from the default location of user config for the platform.
///
/// Returns the parsed `Some(ConfigFile)` if the config file exists, `None` otherwise.
///
/// A `traceflow.toml` or `.traceflow.toml` file is searched for in:
///     - the current directory
///     - the user home directory
///     - the XDG config directory (Unix only): `$XDG_CONFIG_HOME` or `~/.config`
///     - the XDG app config directory (Unix only): `$XDG_CONFIG_HOME/traceflow` or `~/.config/traceflow`
///
/// Only the first file found is used.
pub fn read_default_config_file() -> anyhow::Result<Option<ConfigFile>> {
    use etcetera::base_strategy as base;
    if let Some(file) = read_files("")? {
        Ok(Some(file))
    } else {
        let basedirs = base::choose_base_strategy()?;
        if let Some(file) = read_files(basedirs.home_dir())? {
            Ok(Some(file))
        } else if let Some(file) = read_files(basedirs.config_dir())? {
            Ok(Some(file))
        } else if let Some(file) = read_files(basedirs.config_dir().join("traceflow"))? {
            Ok(Some(file))
        } else {
            Ok(None)
        }
    }
}

/// Read the config from the given path.
pub fn read_config_file<P: AsRef<Path>>(path: P) -> anyhow::Result<ConfigFile> {
    let file = File::open(path.as_ref())
        .with_context(|| format!("config file not found: {}", path.as_ref().display()))?;
    let mut decoder = DecodeReaderBytes::new(BufReader::new(file));
    let mut dest = String::new();
    decoder.read_to_string(&mut dest)?;
    Ok(toml::from_str(&dest)?)
}

fn read_files<P: AsRef<Path>>(dir: P) -> anyhow::Result<Option<ConfigFile>> {
    if let Some(file) = read_file(dir.as_ref(), DEFAULT_CONFIG_FILE)? {
        Ok(Some(file))
    } else if let Some(file) = read_file(dir.as_ref(), DEFAULT_HIDDEN_CONFIG_FILE)? {
        Ok(Some(file))
    } else {
        Ok(None)
    }
}

fn read_file<P: AsRef<Path>>(dir: P, file: &str) -> anyhow::Result<Option<ConfigFile>> {
    let path = dir.as_ref().join(file);
    if path.exists() {
        Ok(Some(read_config_file(path)?))
    } else {
        Ok(None)
    }
}

#[derive(Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ConfigFile {
    pub trace: Option<ConfigTrace>,
    pub report: Option<ConfigReport>,
    pub log: Option<ConfigLog>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            trace: Some(ConfigTrace::default()),
            report: Some(ConfigReport::default()),
            log: Some(ConfigLog::default()),
        }
    }
}

#[derive(Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ConfigTrace {
    pub paths: Option<u16>,
    pub max_ttl: Option<u8>,
    pub src_port: Option<u16>,
    pub dst_port: Option<u16>,
    pub tos: Option<u8>,
    #[serde(default)]
    #[serde(deserialize_with = "humantime_deser")]
    pub wait: Option<Duration>,
    #[serde(default)]
    #[serde(deserialize_with = "humantime_deser")]
    pub read_timeout: Option<Duration>,
    #[serde(default)]
    #[serde(deserialize_with = "addr_deser")]
    pub source_address: Option<Ipv4Addr>,
    pub interface: Option<String>,
}

impl Default for ConfigTrace {
    fn default() -> Self {
        Self {
            paths: Some(u16::from(defaults::DEFAULT_PATHS)),
            max_ttl: Some(defaults::DEFAULT_MAX_TTL),
            src_port: Some(defaults::DEFAULT_SOURCE_PORT),
            dst_port: Some(defaults::DEFAULT_DESTINATION_PORT),
            tos: Some(defaults::DEFAULT_TOS),
            wait: Some(defaults::DEFAULT_PROBE_WAIT),
            read_timeout: Some(defaults::DEFAULT_READ_TIMEOUT),
            source_address: None,
            interface: None,
        }
    }
}

#[derive(Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ConfigReport {
    pub format: Option<ReportFormat>,
    pub dedup: Option<bool>,
}

impl Default for ConfigReport {
    fn default() -> Self {
        Self {
            format: Some(constants::DEFAULT_REPORT_FORMAT),
            dedup: Some(constants::DEFAULT_DEDUP),
        }
    }
}

#[derive(Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ConfigLog {
    pub log_format: Option<LogFormat>,
    pub log_filter: Option<String>,
}

impl Default for ConfigLog {
    fn default() -> Self {
        Self {
            log_format: Some(constants::DEFAULT_LOG_FORMAT),
            log_filter: Some(String::from(constants::DEFAULT_LOG_FILTER)),
        }
    }
}

fn humantime_deser<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    humantime::parse_duration(&String::deserialize(deserializer)?)
        .map_err(serde::de::Error::custom)
        .map(Some)
}

fn addr_deser<'de, D>(deserializer: D) -> Result<Option<Ipv4Addr>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ipv4Addr::from_str(&String::deserialize(deserializer)?)
        .map_err(serde::de::Error::custom)
        .map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_sample() {
        let config: ConfigFile =
            toml::from_str(include_str!("../../traceflow-config-sample.toml")).unwrap();
        pretty_assertions::assert_eq!(ConfigFile::default(), config);
    }

    #[test]
    fn test_parse_partial_config() {
        let config: ConfigFile = toml::from_str(
            r#"
            [trace]
            paths = 8
            source-address = "10.0.0.1"
            wait = "250ms"
            "#,
        )
        .unwrap();
        let trace = config.trace.unwrap();
        assert_eq!(Some(8), trace.paths);
        assert_eq!(Some(Ipv4Addr::new(10, 0, 0, 1)), trace.source_address);
        assert_eq!(Some(Duration::from_millis(250)), trace.wait);
        assert_eq!(None, trace.max_ttl);
        assert_eq!(None, config.report);
    }

    #[test]
    fn test_reject_unknown_field() {
        let res = toml::from_str::<ConfigFile>("[trace]\nprotocol = \"tcp\"\n");
        assert!(res.is_err());
    }

    #[test]
    fn test_reject_bad_address() {
        let res = toml::from_str::<ConfigFile>("[trace]\nsource-address = \"::1\"\n");
        assert!(res.is_err());
    }
}

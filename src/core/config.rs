use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::core::{Error, Hz, Result};

/// Address and display name of one RigCTL endpoint
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    /// Host name or IP
    pub host: String,
    /// TCP port
    pub port: u16,
    /// Name used in log lines
    pub name: String,
}

impl EndpointConfig {
    /// Creates a new endpoint config
    pub fn new(host: impl Into<String>, port: u16, name: impl Into<String>) -> Self {
        EndpointConfig {
            host: host.into(),
            port,
            name: name.into(),
        }
    }
}

/// Resolved process configuration, immutable for the process lifetime
#[derive(Debug, Clone)]
pub struct Config {
    /// First endpoint, queried first every tick (wfview)
    pub primary: EndpointConfig,
    /// Second endpoint (rigctl)
    pub secondary: EndpointConfig,
    /// Tick spacing
    pub poll_interval: Duration,
    /// Per-call socket timeout
    pub io_timeout: Duration,
    /// Backoff after a connect or session failure
    pub reconnect_wait: Duration,
    /// Minimum Hz delta considered a real change rather than noise
    pub change_threshold_hz: Hz,
    /// Log verbosity, used when RUST_LOG is unset
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            primary: EndpointConfig::new("127.0.0.1", 4533, "wfview"),
            secondary: EndpointConfig::new("192.168.155.245", 4532, "rigctl"),
            poll_interval: Duration::from_millis(200),
            io_timeout: Duration::from_secs_f64(3.0),
            reconnect_wait: Duration::from_secs_f64(2.0),
            change_threshold_hz: 50,
            log_level: "DEBUG".to_string(),
        }
    }
}

impl Config {
    /// Resolves the configuration from the process environment, falling back
    /// to the first readable env file and then to the defaults.
    ///
    /// Env file search order: `$SDRSYNC_ENV_FILE`, `./.env`,
    /// `/etc/sdrsync/sdrsync.env`. The process environment always wins over
    /// file values.
    pub fn from_env() -> Result<Self> {
        let file_vars = load_env_file();
        Self::resolve(|key| std::env::var(key).ok().or_else(|| file_vars.get(key).cloned()))
    }

    /// Resolves the configuration through an arbitrary key lookup
    pub fn resolve<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let primary = EndpointConfig::new(
            lookup("WF_HOST").unwrap_or(defaults.primary.host),
            parse_port(&lookup, "WF_PORT", defaults.primary.port)?,
            defaults.primary.name,
        );
        let secondary = EndpointConfig::new(
            lookup("SDR_HOST").unwrap_or(defaults.secondary.host),
            parse_port(&lookup, "SDR_PORT", defaults.secondary.port)?,
            defaults.secondary.name,
        );

        let poll_ms = parse_int(&lookup, "POLL_MS", 200)?;
        let io_timeout = parse_duration_secs(&lookup, "TIMEOUT", 3.0)?;
        let reconnect_wait = parse_duration_secs(&lookup, "RECONNECT_WAIT", 2.0)?;
        let threshold = parse_int(&lookup, "CHANGE_THRESHOLD_HZ", 50)?;

        if poll_ms < 0 || threshold < 0 {
            return Err(Error::config("negative intervals/thresholds are not valid"));
        }

        Ok(Config {
            primary,
            secondary,
            poll_interval: Duration::from_millis(poll_ms as u64),
            io_timeout,
            reconnect_wait,
            change_threshold_hz: threshold as Hz,
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
        })
    }
}

/// Parses an integer config value, accepting float syntax ("200.0")
fn parse_int<F>(lookup: &F, key: &str, default: i64) -> Result<i64>
where
    F: Fn(&str) -> Option<String>,
{
    Ok(parse_float(lookup, key, default as f64)?.trunc() as i64)
}

/// Parses a TCP port config value, rejecting anything outside 1..=65535
fn parse_port<F>(lookup: &F, key: &str, default: u16) -> Result<u16>
where
    F: Fn(&str) -> Option<String>,
{
    let val = parse_int(lookup, key, default as i64)?;
    if !(1..=65535).contains(&val) {
        return Err(Error::config(format!("{}: port out of range: {}", key, val)));
    }
    Ok(val as u16)
}

/// Parses a duration config value given in seconds. Negative, non-finite and
/// overflowing values are configuration errors, not panics.
fn parse_duration_secs<F>(lookup: &F, key: &str, default: f64) -> Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    let secs = parse_float(lookup, key, default)?;
    Duration::try_from_secs_f64(secs)
        .map_err(|_| Error::config(format!("{}: not a valid duration in seconds: {}", key, secs)))
}

/// Parses a float config value; non-finite input is a configuration error
fn parse_float<F>(lookup: &F, key: &str, default: f64) -> Result<f64>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => {
            let val = raw
                .trim()
                .parse::<f64>()
                .map_err(|_| Error::config(format!("{}: not a number: '{}'", key, raw)))?;
            if !val.is_finite() {
                return Err(Error::config(format!("{}: not a finite number: '{}'", key, raw)));
            }
            Ok(val)
        }
    }
}

/// Loads KEY=VALUE pairs from the first readable env file. Blank lines and
/// `#` comments are skipped; single or double quotes around values are
/// stripped. Returns an empty map if no candidate file exists.
pub fn load_env_file() -> HashMap<String, String> {
    let mut candidates: Vec<String> = Vec::new();
    if let Ok(path) = std::env::var("SDRSYNC_ENV_FILE") {
        candidates.push(path);
    }
    candidates.push(".env".to_string());
    candidates.push("/etc/sdrsync/sdrsync.env".to_string());

    for path in candidates {
        if Path::new(&path).is_file() {
            return parse_env_file(&path);
        }
    }
    HashMap::new()
}

fn parse_env_file(path: &str) -> HashMap<String, String> {
    let mut vars = HashMap::new();
    // Fail-soft: an unreadable env file means defaults, not a startup error.
    let Ok(contents) = fs::read_to_string(path) else {
        return vars;
    };
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let value = value
            .trim()
            .trim_matches('"')
            .trim_matches('\'');
        if !key.is_empty() {
            vars.insert(key.to_string(), value.to_string());
        }
    }
    vars
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn lookup_from<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn test_defaults() {
        let config = Config::resolve(|_| None).unwrap();
        assert_eq!(config.primary.host, "127.0.0.1");
        assert_eq!(config.primary.port, 4533);
        assert_eq!(config.secondary.port, 4532);
        assert_eq!(config.poll_interval, Duration::from_millis(200));
        assert_eq!(config.change_threshold_hz, 50);
        assert_eq!(config.log_level, "DEBUG");
    }

    #[test]
    fn test_overrides_with_float_syntax() {
        let lookup = lookup_from(&[
            ("WF_HOST", "10.0.0.7"),
            ("WF_PORT", "4540.0"),
            ("POLL_MS", "500.0"),
            ("TIMEOUT", "1.5"),
            ("CHANGE_THRESHOLD_HZ", "100"),
        ]);
        let config = Config::resolve(lookup).unwrap();
        assert_eq!(config.primary.host, "10.0.0.7");
        assert_eq!(config.primary.port, 4540);
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.io_timeout, Duration::from_secs_f64(1.5));
        assert_eq!(config.change_threshold_hz, 100);
    }

    #[test]
    fn test_malformed_value_is_config_error() {
        let lookup = lookup_from(&[("POLL_MS", "fast")]);
        let err = Config::resolve(lookup).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_nonfinite_duration_is_config_error() {
        for (key, raw) in [
            ("TIMEOUT", "nan"),
            ("TIMEOUT", "inf"),
            ("RECONNECT_WAIT", "nan"),
            ("POLL_MS", "inf"),
        ] {
            let pairs = [(key, raw)];
            let err = Config::resolve(lookup_from(&pairs)).unwrap_err();
            assert!(matches!(err, Error::Config(_)), "{}={}", key, raw);
        }
    }

    #[test]
    fn test_overflowing_duration_is_config_error() {
        // Finite but beyond what a Duration can hold
        for key in ["TIMEOUT", "RECONNECT_WAIT"] {
            let pairs = [(key, "1e30")];
            let err = Config::resolve(lookup_from(&pairs)).unwrap_err();
            assert!(matches!(err, Error::Config(_)), "{}", key);
        }
    }

    #[test]
    fn test_negative_duration_is_config_error() {
        let pairs = [("TIMEOUT", "-1")];
        let err = Config::resolve(lookup_from(&pairs)).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_out_of_range_port_is_config_error() {
        for (key, raw) in [("WF_PORT", "70000"), ("WF_PORT", "0"), ("SDR_PORT", "-1")] {
            let pairs = [(key, raw)];
            let err = Config::resolve(lookup_from(&pairs)).unwrap_err();
            assert!(matches!(err, Error::Config(_)), "{}={}", key, raw);
        }
    }

    #[test]
    fn test_env_file_parsing() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# comment").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "WF_HOST=10.1.1.1").unwrap();
        writeln!(file, "SDR_HOST=\"10.2.2.2\"").unwrap();
        writeln!(file, "LOG_LEVEL='info'").unwrap();
        writeln!(file, "not a pair").unwrap();

        let vars = parse_env_file(file.path().to_str().unwrap());
        assert_eq!(vars.get("WF_HOST").unwrap(), "10.1.1.1");
        assert_eq!(vars.get("SDR_HOST").unwrap(), "10.2.2.2");
        assert_eq!(vars.get("LOG_LEVEL").unwrap(), "info");
        assert!(!vars.contains_key("not a pair"));
        assert_eq!(vars.len(), 3);
    }
}

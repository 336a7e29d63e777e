//! Configuration loading for the call generator.
//!
//! Two INI files, not one TOML file: `asterisk.ini` (ARI connection) and
//! `calls.ini` (origination parameters), matching the wire format of the
//! original implementation this crate ports. Loading otherwise follows the
//! same raw-then-validated two-stage parse as the rest of this codebase's
//! config loaders: deserialize into an all-`Option` shape, then fill
//! defaults and reject missing/invalid required fields.

use std::path::Path;

use ini::Ini;

pub const DEFAULT_ASTERISK_CONFIG_PATH: &str = "configs/asterisk.ini";
pub const DEFAULT_CALLS_CONFIG_PATH: &str = "configs/calls.ini";

/// `[ari]` section of `asterisk.ini`.
#[derive(Debug, Clone)]
pub struct AsteriskConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub secret: String,
    pub app: String,
}

/// `[calls]` section of `calls.ini`.
#[derive(Debug, Clone)]
pub struct CallsConfig {
    pub count: u32,
    pub driver: String,
    pub trunk: String,
    pub phone: String,
    pub callerid: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing ini file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: ini::Error,
    },
    #[error("missing required field '{0}'")]
    MissingField(String),
    #[error("invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

pub fn load_asterisk_config_from_path(path: &Path) -> Result<AsteriskConfig, ConfigError> {
    let ini = read_ini(path)?;
    let section = ini.section(Some("ari"));

    let get = |key: &str| -> Result<String, ConfigError> {
        section
            .and_then(|s| s.get(key))
            .map(str::to_owned)
            .ok_or_else(|| ConfigError::MissingField(format!("ari.{key}")))
    };

    let host = get("host")?;
    let port_str = get("port")?;
    let port: u16 = port_str.parse().map_err(|_| ConfigError::InvalidValue {
        field: "ari.port".to_owned(),
        reason: format!("'{port_str}' is not a valid port number"),
    })?;
    let username = get("username")?;
    let secret = get("secret")?;
    let app = get("app")?;

    Ok(AsteriskConfig { host, port, username, secret, app })
}

pub fn load_asterisk_config() -> Result<AsteriskConfig, ConfigError> {
    load_asterisk_config_from_path(Path::new(DEFAULT_ASTERISK_CONFIG_PATH))
}

pub fn load_calls_config_from_path(path: &Path) -> Result<CallsConfig, ConfigError> {
    let ini = read_ini(path)?;
    let section = ini.section(Some("calls"));

    let get = |key: &str| -> Result<String, ConfigError> {
        section
            .and_then(|s| s.get(key))
            .map(str::to_owned)
            .ok_or_else(|| ConfigError::MissingField(format!("calls.{key}")))
    };

    let count_str = get("count")?;
    let count: u32 = count_str.parse().ok().filter(|&c| c > 0).ok_or_else(|| ConfigError::InvalidValue {
        field: "calls.count".to_owned(),
        reason: format!("'{count_str}' must be a positive integer"),
    })?;

    Ok(CallsConfig {
        count,
        driver: get("driver")?,
        trunk: get("trunk")?,
        phone: get("phone")?,
        callerid: get("callerid")?,
    })
}

pub fn load_calls_config() -> Result<CallsConfig, ConfigError> {
    load_calls_config_from_path(Path::new(DEFAULT_CALLS_CONFIG_PATH))
}

fn read_ini(path: &Path) -> Result<Ini, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::Io {
            path: path.display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
        });
    }
    Ini::load_from_file(path).map_err(|e| ConfigError::Parse { path: path.display().to_string(), source: e })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        file.write_all(contents.as_bytes()).expect("write temp file");
        file
    }

    #[test]
    fn loads_asterisk_config_with_all_fields() {
        let file = write_temp(
            "[ari]\nhost = 127.0.0.1\nport = 8088\nusername = asterisk\nsecret = secret\napp = calls\n",
        );
        let config = load_asterisk_config_from_path(file.path()).expect("should load");
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8088);
        assert_eq!(config.app, "calls");
    }

    #[test]
    fn missing_field_is_an_error() {
        let file = write_temp("[ari]\nhost = 127.0.0.1\n");
        let err = load_asterisk_config_from_path(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(_)));
    }

    #[test]
    fn count_must_be_a_positive_integer() {
        let file = write_temp("[calls]\ncount = 0\ndriver = PJSIP\ntrunk = t\nphone = 100\ncallerid = c\n");
        let err = load_calls_config_from_path(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let file = write_temp("[calls]\ncount = 4\ndriver = PJSIP\ntrunk = t\nphone = 100\ncallerid = c\n");
        let config = load_calls_config_from_path(file.path()).expect("should load");
        assert_eq!(config.count, 4);
    }
}

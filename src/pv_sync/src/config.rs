//! Job configuration: a TOML file plus environment fallbacks for secrets.
//!
//! Entrypoints:
//! - [`load_config_str`] / [`load_config_path`]: parse and validate the file.
//! - [`Config::pvoutput`], [`Config::tibber`], [`Config::goteborg_energi`],
//!   [`Config::eon`]:
//!   resolve one section, pulling missing secrets from the environment.
//!
//! Sections are resolved on demand, so a Tibber run never asks for Göteborg
//! Energi credentials.

use std::{fmt, fs, num::NonZeroU32, path::Path};

use chrono_tz::Tz;
use nonzero_ext::nonzero;
use secrecy::SecretString;
use serde::Deserialize;
use shared_utils::env::{MissingEnvVarError, configured_or_env};

use crate::{gaps::DEFAULT_LOOKBACK_DAYS, tz};

/// Free PVOutput accounts get 60 requests per hour.
pub fn default_requests_per_hour() -> NonZeroU32 {
    nonzero!(60u32)
}

/// Invalid or incomplete configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{field} is not configured and {source}")]
    MissingSecret {
        field: &'static str,
        source: MissingEnvVarError,
    },

    #[error("missing [{0}] section")]
    MissingSection(&'static str),

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("unknown timezone: {0}")]
    Timezone(String),

    #[error("lookback_days must be between 1 and {max}, got {got}")]
    Lookback { got: usize, max: usize },
}

/// Failure to produce a [`Config`] from a file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    timezone: Option<String>,
    lookback_days: Option<usize>,
    #[serde(default)]
    pvoutput: PvOutputSection,
    tibber: Option<TibberSection>,
    goteborg_energi: Option<GoteborgEnergiSection>,
    eon: Option<EonSection>,
}

#[derive(Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PvOutputSection {
    api_key: Option<String>,
    system_id: Option<String>,
    requests_per_hour: Option<NonZeroU32>,
}

#[derive(Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TibberSection {
    token: Option<String>,
    home_id: Option<String>,
}

#[derive(Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct GoteborgEnergiSection {
    username: Option<String>,
    password: Option<String>,
    import_pod: Option<String>,
    export_pod: Option<String>,
}

/// Parsed configuration. Secrets stay unresolved until a section is asked for.
pub struct Config {
    pub timezone: Tz,
    pub lookback_days: usize,
    file: ConfigFile,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("timezone", &self.timezone)
            .field("lookback_days", &self.lookback_days)
            .finish_non_exhaustive()
    }
}

pub struct PvOutputConfig {
    pub api_key: SecretString,
    pub system_id: String,
    pub requests_per_hour: NonZeroU32,
}

pub struct TibberConfig {
    pub token: SecretString,
    pub home_id: Option<String>,
}

#[derive(Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct EonSection {
    user_id: Option<String>,
    password: Option<String>,
    installation: Option<String>,
}

pub struct EonConfig {
    pub user_id: String,
    pub password: SecretString,
    pub installation: String,
}

pub struct GoteborgEnergiConfig {
    pub username: String,
    pub password: SecretString,
    pub import_pod: String,
    pub export_pod: String,
}

fn secret(
    configured: Option<String>,
    field: &'static str,
    env: &str,
) -> Result<String, ConfigError> {
    configured_or_env(configured, env).map_err(|source| ConfigError::MissingSecret { field, source })
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ConfigError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(ConfigError::Empty(field)),
    }
}

/// Parse and validate a TOML config.
pub fn load_config_str(s: &str) -> Result<Config, ConfigLoadError> {
    let file: ConfigFile = toml::from_str(s)?;

    let timezone = match file.timezone.as_deref() {
        Some(name) => tz::parse_tz(name).map_err(|_| ConfigError::Timezone(name.to_string()))?,
        None => tz::DEFAULT_TZ,
    };

    let lookback_days = file.lookback_days.unwrap_or(DEFAULT_LOOKBACK_DAYS);
    let max = crate::ledger::pvoutput::MAX_OUTPUTS;
    if !(1..=max).contains(&lookback_days) {
        return Err(ConfigError::Lookback {
            got: lookback_days,
            max,
        }
        .into());
    }

    Ok(Config {
        timezone,
        lookback_days,
        file,
    })
}

/// Read, parse and validate a TOML config file.
pub fn load_config_path(path: impl AsRef<Path>) -> Result<Config, ConfigLoadError> {
    let path = path.as_ref();
    let s = fs::read_to_string(path).map_err(|source| ConfigLoadError::Read {
        path: path.display().to_string(),
        source,
    })?;
    load_config_str(&s)
}

impl Config {
    /// PVOutput credentials; `PVOUTPUT_API_KEY` / `PVOUTPUT_SYSTEM_ID` fill gaps.
    pub fn pvoutput(&self) -> Result<PvOutputConfig, ConfigError> {
        let section = &self.file.pvoutput;
        Ok(PvOutputConfig {
            api_key: secret(section.api_key.clone(), "pvoutput.api_key", "PVOUTPUT_API_KEY")?
                .into(),
            system_id: secret(
                section.system_id.clone(),
                "pvoutput.system_id",
                "PVOUTPUT_SYSTEM_ID",
            )?
            .trim()
            .to_string(),
            requests_per_hour: section
                .requests_per_hour
                .unwrap_or_else(default_requests_per_hour),
        })
    }

    /// Tibber token (or `TIBBER_TOKEN`) and optional home id.
    ///
    /// The section may be omitted entirely when the token comes from the
    /// environment.
    pub fn tibber(&self) -> Result<TibberConfig, ConfigError> {
        let default = TibberSection::default();
        let section = self.file.tibber.as_ref().unwrap_or(&default);
        Ok(TibberConfig {
            token: secret(section.token.clone(), "tibber.token", "TIBBER_TOKEN")?.into(),
            home_id: section
                .home_id
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        })
    }

    /// Portal login plus the two metering point ids.
    pub fn goteborg_energi(&self) -> Result<GoteborgEnergiConfig, ConfigError> {
        let section = self
            .file
            .goteborg_energi
            .as_ref()
            .ok_or(ConfigError::MissingSection("goteborg_energi"))?;
        Ok(GoteborgEnergiConfig {
            username: secret(
                section.username.clone(),
                "goteborg_energi.username",
                "GOTEBORG_ENERGI_USERNAME",
            )?,
            password: secret(
                section.password.clone(),
                "goteborg_energi.password",
                "GOTEBORG_ENERGI_PASSWORD",
            )?
            .into(),
            import_pod: required(section.import_pod.clone(), "goteborg_energi.import_pod")?,
            export_pod: required(section.export_pod.clone(), "goteborg_energi.export_pod")?,
        })
    }

    /// E.ON login (or `EON_USER_ID` / `EON_PASSWORD`) and installation id.
    pub fn eon(&self) -> Result<EonConfig, ConfigError> {
        let section = self
            .file
            .eon
            .as_ref()
            .ok_or(ConfigError::MissingSection("eon"))?;
        Ok(EonConfig {
            user_id: secret(section.user_id.clone(), "eon.user_id", "EON_USER_ID")?,
            password: secret(section.password.clone(), "eon.password", "EON_PASSWORD")?.into(),
            installation: required(section.installation.clone(), "eon.installation")?,
        })
    }
}

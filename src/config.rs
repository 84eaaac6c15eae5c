//! Configuration module for the resource group report
//! Handles CLI argument parsing, validation, and credential resolution

use crate::error_handling::{ErrorContext, ReportError, ReportResult};
use clap::Parser;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Default number of concurrent window queries
pub const MAX_THREADS: usize = 8;

/// Longest lookback accepted, in days
pub const MAX_LOOKBACK_DAYS: u32 = 366;

/// Profile used when none is selected
pub const DEFAULT_PROFILE: &str = "default";

/// Domain appended to bare account names
pub const ACCOUNT_DOMAIN: &str = "lacework.net";

#[derive(Parser, Clone, Debug)]
#[command(name = "siem_rg_report", about = "Count alerts and events per cloud resource group")]
#[command(version)]
pub struct Args {
    /// The Lacework account to use
    #[arg(long, env = "LW_ACCOUNT")]
    pub account: Option<String>,

    /// The Lacework sub-account to use
    #[arg(long, env = "LW_SUBACCOUNT")]
    pub subaccount: Option<String>,

    /// The Lacework API key to use
    #[arg(long = "api-key", env = "LW_API_KEY")]
    pub api_key: Option<String>,

    /// The Lacework API secret to use
    #[arg(long = "api-secret", env = "LW_API_SECRET", hide_env_values = true)]
    pub api_secret: Option<String>,

    /// The Lacework CLI profile to use
    #[arg(short, long, env = "LW_PROFILE")]
    pub profile: Option<String>,

    /// Number of days to look back for alerts and events
    #[arg(long, env = "LOOKBACK_DAYS", default_value_t = 7)]
    pub days: u32,

    /// Maximum number of concurrent window queries
    #[arg(long = "max-threads", default_value_t = MAX_THREADS)]
    pub max_threads: usize,

    /// Enable debug logging
    #[arg(long, env = "LW_DEBUG")]
    pub debug: bool,

    /// Directory the report is written to
    #[arg(long = "output-dir", default_value = ".")]
    pub output_dir: PathBuf,
}

impl Args {
    pub fn report_config(&self) -> ReportResult<ReportConfig> {
        let config = ReportConfig {
            lookback_days: self.days,
            max_threads: self.max_threads,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn logging_config(&self) -> LoggingConfig {
        LoggingConfig { debug: self.debug }
    }

    /// Resolve credentials from flags, environment, and the CLI profile file
    pub fn credentials(&self) -> ReportResult<Credentials> {
        let overrides = ProfileEntry {
            account: self.account.clone(),
            subaccount: self.subaccount.clone(),
            api_key: self.api_key.clone(),
            api_secret: self.api_secret.clone(),
        };

        if overrides.is_complete() && self.profile.is_none() {
            return Credentials::resolve(overrides, None);
        }

        let profile_name = self.profile.as_deref().unwrap_or(DEFAULT_PROFILE);
        let profile = match default_profile_path() {
            Some(path) if path.exists() => ProfileFile::load(&path)?.get(profile_name).cloned(),
            _ => None,
        };

        if profile.is_none() && self.profile.is_some() {
            return Err(ReportError::configuration(format!(
                "Profile '{}' not found in ~/.lacework.toml",
                profile_name
            )));
        }

        Credentials::resolve(overrides, profile)
    }
}

/// Settings that shape the report itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportConfig {
    pub lookback_days: u32,
    pub max_threads: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            lookback_days: 7,
            max_threads: MAX_THREADS,
        }
    }
}

impl ReportConfig {
    pub fn validate(&self) -> ReportResult<()> {
        if self.lookback_days == 0 {
            return Err(crate::config_error!("Lookback days must be greater than 0"));
        }

        if self.lookback_days > MAX_LOOKBACK_DAYS {
            return Err(crate::config_error!(format!(
                "Lookback days must not exceed {}",
                MAX_LOOKBACK_DAYS
            )));
        }

        if self.max_threads == 0 {
            return Err(crate::config_error!("Max threads must be greater than 0"));
        }

        Ok(())
    }
}

impl fmt::Display for ReportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ReportConfig {{ lookback_days: {}, max_threads: {} }}",
            self.lookback_days, self.max_threads
        )
    }
}

/// Logging settings handed to the tracing setup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoggingConfig {
    pub debug: bool,
}

/// One section of `~/.lacework.toml`
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ProfileEntry {
    pub account: Option<String>,
    pub subaccount: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
}

impl ProfileEntry {
    fn is_complete(&self) -> bool {
        self.account.is_some() && self.api_key.is_some() && self.api_secret.is_some()
    }

    /// Fill unset fields from `fallback`
    fn or(self, fallback: ProfileEntry) -> ProfileEntry {
        ProfileEntry {
            account: self.account.or(fallback.account),
            subaccount: self.subaccount.or(fallback.subaccount),
            api_key: self.api_key.or(fallback.api_key),
            api_secret: self.api_secret.or(fallback.api_secret),
        }
    }
}

/// Parsed `~/.lacework.toml`, one entry per profile name
#[derive(Debug, Clone, Default)]
pub struct ProfileFile {
    profiles: HashMap<String, ProfileEntry>,
}

impl ProfileFile {
    pub fn load(path: &Path) -> ReportResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| {
                ReportError::configuration_with_source(
                    format!("Failed to read profile file: {:?}", path),
                    e.into(),
                )
            })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> ReportResult<Self> {
        let profiles: HashMap<String, ProfileEntry> = toml::from_str(content)
            .map_err(|e| ReportError::configuration_with_source("Failed to parse profile file", e.into()))?;
        Ok(Self { profiles })
    }

    pub fn get(&self, name: &str) -> Option<&ProfileEntry> {
        self.profiles.get(name)
    }
}

fn default_profile_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".lacework.toml"))
}

/// Fully resolved API credentials
#[derive(Clone, PartialEq)]
pub struct Credentials {
    pub account: String,
    pub subaccount: Option<String>,
    pub api_key: String,
    pub api_secret: String,
}

impl Credentials {
    /// Merge explicit settings over a profile and check required fields
    pub fn resolve(overrides: ProfileEntry, profile: Option<ProfileEntry>) -> ReportResult<Self> {
        let merged = match profile {
            Some(profile) => overrides.or(profile),
            None => overrides,
        };

        let account = required(merged.account, "account")?;
        let api_key = required(merged.api_key, "api key")?;
        let api_secret = required(merged.api_secret, "api secret")?;

        Ok(Self {
            account,
            subaccount: merged.subaccount.filter(|s| !s.trim().is_empty()),
            api_key,
            api_secret,
        })
    }

    /// API host; bare account names get the vendor domain
    pub fn host(&self) -> String {
        if self.account.contains('.') {
            self.account.clone()
        } else {
            format!("{}.{}", self.account, ACCOUNT_DOMAIN)
        }
    }

    pub fn base_url(&self) -> String {
        format!("https://{}", self.host())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("account", &self.account)
            .field("subaccount", &self.subaccount)
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

fn required(value: Option<String>, name: &str) -> ReportResult<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            ReportError::configuration(format!(
                "Missing {}: pass it as a flag, set the LW_* variable, or add it to ~/.lacework.toml",
                name
            ))
        })
}

/// Ensure the output directory exists and is a directory
pub fn check_output_dir(dir: &Path) -> ReportResult<()> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)
            .with_output_context(|| format!("Failed to create output directory {:?}", dir))?;
    } else if !dir.is_dir() {
        return Err(ReportError::configuration(format!(
            "Output path {:?} is not a directory",
            dir
        )));
    }
    Ok(())
}

//! Configuration for the live OTP view.
//!
//! Resolution order: built-in defaults, then an optional JSON file, then
//! `OTP_*` environment variables. Command-line flags are applied by the
//! binary on top of the result.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::otp::qr::{DEFAULT_QR_SERVICE_URL, DEFAULT_QR_SIZE};
use crate::otp::types::*;

/// Default redraw cadence (~60 frames per second).
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 16;

/// View configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OtpViewConfig {
    /// Time step in seconds.
    pub period: u32,
    pub digits: u8,
    pub algorithm: Algorithm,
    /// Redraw cadence of the countdown driver.
    pub frame_interval_ms: u64,
    /// External QR image service endpoint.
    pub qr_service_url: String,
    pub qr_size: u32,
}

impl Default for OtpViewConfig {
    fn default() -> Self {
        Self {
            period: DEFAULT_PERIOD,
            digits: DEFAULT_DIGITS,
            algorithm: Algorithm::Sha1,
            frame_interval_ms: DEFAULT_FRAME_INTERVAL_MS,
            qr_service_url: DEFAULT_QR_SERVICE_URL.to_string(),
            qr_size: DEFAULT_QR_SIZE,
        }
    }
}

impl OtpViewConfig {
    /// Parse a JSON document; missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, TotpError> {
        serde_json::from_str(json).map_err(|e| {
            TotpError::invalid_config("Failed to parse configuration").with_detail(e.to_string())
        })
    }

    /// Load a JSON config file.
    pub fn load(path: &Path) -> Result<Self, TotpError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            TotpError::from(e).with_detail(format!("reading {}", path.display()))
        })?;
        let cfg = Self::from_json_str(&text)?;
        log::debug!("Loaded OTP view config from {}", path.display());
        Ok(cfg)
    }

    /// Apply `OTP_*` overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, TotpError> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply `OTP_*` overrides from an arbitrary lookup.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self, TotpError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("OTP_PERIOD") {
            self.period = parse_var("OTP_PERIOD", &v)?;
        }
        if let Some(v) = lookup("OTP_DIGITS") {
            self.digits = parse_var("OTP_DIGITS", &v)?;
        }
        if let Some(v) = lookup("OTP_ALGORITHM") {
            self.algorithm = Algorithm::from_str_loose(&v).ok_or_else(|| {
                TotpError::new(
                    TotpErrorKind::InvalidAlgorithm,
                    format!("OTP_ALGORITHM: unknown algorithm '{}'", v),
                )
            })?;
        }
        if let Some(v) = lookup("OTP_FRAME_INTERVAL_MS") {
            self.frame_interval_ms = parse_var("OTP_FRAME_INTERVAL_MS", &v)?;
        }
        if let Some(v) = lookup("OTP_QR_SERVICE_URL") {
            self.qr_service_url = v;
        }
        Ok(self)
    }

    /// Reject settings that would break generation or the refresh loop.
    pub fn validate(&self) -> Result<(), TotpError> {
        self.params().validate()?;
        if self.frame_interval_ms == 0 {
            return Err(TotpError::invalid_config("frameIntervalMs must be greater than zero"));
        }
        if self.qr_size == 0 {
            return Err(TotpError::invalid_config("qrSize must be greater than zero"));
        }
        url::Url::parse(&self.qr_service_url).map_err(|e| {
            TotpError::invalid_config(format!("Invalid qrServiceUrl '{}'", self.qr_service_url))
                .with_detail(e.to_string())
        })?;
        Ok(())
    }

    pub fn params(&self) -> OtpParams {
        OtpParams {
            period: self.period,
            digits: self.digits,
            algorithm: self.algorithm,
        }
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, TotpError>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse::<T>().map_err(|e| {
        TotpError::invalid_config(format!("{}: cannot parse '{}'", name, value)).with_detail(e.to_string())
    })
}

//! Core types for the live OTP engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroize;

/// Default TOTP time step in seconds (RFC 6238 `X`).
pub const DEFAULT_PERIOD: u32 = 30;
/// Default number of digits in a generated code.
pub const DEFAULT_DIGITS: u8 = 6;
/// Smallest accepted code width.
pub const MIN_DIGITS: u8 = 6;
/// Largest accepted code width; 10^10 already exceeds the 31-bit truncated range.
pub const MAX_DIGITS: u8 = 10;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Algorithm
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Hash algorithm used for HMAC-based OTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Algorithm {
    Sha1,
    Sha256,
    Sha512,
}

impl Default for Algorithm {
    fn default() -> Self {
        Self::Sha1
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.uri_name())
    }
}

impl Algorithm {
    /// Parse from a case-insensitive string.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "SHA1" | "SHA-1" | "HMACSHA1" | "HMAC-SHA1" => Some(Self::Sha1),
            "SHA256" | "SHA-256" | "HMACSHA256" | "HMAC-SHA256" => Some(Self::Sha256),
            "SHA512" | "SHA-512" | "HMACSHA512" | "HMAC-SHA512" => Some(Self::Sha512),
            _ => None,
        }
    }

    /// URI-safe name for `otpauth://` parameters.
    pub fn uri_name(&self) -> &'static str {
        match self {
            Self::Sha1 => "SHA1",
            Self::Sha256 => "SHA256",
            Self::Sha512 => "SHA512",
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Secret key
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Decoded shared secret. Wiped from memory when dropped.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey(Vec<u8>);

impl SecretKey {
    /// Decode a base-32 secret leniently (see [`crate::otp::base32::decode`]).
    ///
    /// Never fails: junk input yields a short or empty key. Callers that
    /// want to refuse empty keys must check [`SecretKey::is_empty`].
    pub fn from_base32(secret: &str) -> Self {
        Self(crate::otp::base32::decode(secret))
    }

    /// Wrap raw key bytes. No length validation is performed.
    pub fn from_bytes(bytes: impl AsRef<[u8]>) -> Self {
        Self(bytes.as_ref().to_vec())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Drop for SecretKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretKey")
            .field("len", &self.0.len())
            .finish_non_exhaustive()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Code parameters
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Generation parameters shared implicitly with the verifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpParams {
    /// Time step in seconds.
    pub period: u32,
    /// Code width.
    pub digits: u8,
    /// HMAC digest.
    pub algorithm: Algorithm,
}

impl Default for OtpParams {
    fn default() -> Self {
        Self {
            period: DEFAULT_PERIOD,
            digits: DEFAULT_DIGITS,
            algorithm: Algorithm::Sha1,
        }
    }
}

impl OtpParams {
    /// Reject parameters that cannot produce a meaningful code.
    pub fn validate(&self) -> Result<(), TotpError> {
        if self.period == 0 {
            return Err(TotpError::new(
                TotpErrorKind::InvalidPeriod,
                "Time step must be a positive number of seconds",
            ));
        }
        check_digits(self.digits)
    }
}

pub(crate) fn check_digits(digits: u8) -> Result<(), TotpError> {
    if !(MIN_DIGITS..=MAX_DIGITS).contains(&digits) {
        return Err(TotpError::new(
            TotpErrorKind::InvalidDigits,
            format!(
                "Digits must be between {} and {}, got {}",
                MIN_DIGITS, MAX_DIGITS, digits
            ),
        ));
    }
    Ok(())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  OTP descriptor
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Structured form of an `otpauth://totp/...` URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpDescriptor {
    /// Account label (e.g. "user@example.com").
    pub account: String,
    /// Issuer (e.g. "GitHub").
    pub issuer: Option<String>,
    /// Base-32 encoded secret, as supplied.
    pub secret: String,
    pub algorithm: Algorithm,
    pub digits: u8,
    pub period: u32,
}

impl OtpDescriptor {
    /// Create a descriptor with RFC 6238 defaults (SHA1, 6 digits, 30 s).
    /// Surrounding whitespace is stripped from the account label.
    pub fn new(account: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            account: account.into().trim().to_string(),
            issuer: None,
            secret: secret.into(),
            algorithm: Algorithm::default(),
            digits: DEFAULT_DIGITS,
            period: DEFAULT_PERIOD,
        }
    }

    /// Builder: set issuer.
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into().trim().to_string());
        self
    }

    /// Builder: set algorithm.
    pub fn with_algorithm(mut self, algo: Algorithm) -> Self {
        self.algorithm = algo;
        self
    }

    /// Builder: set digit count.
    pub fn with_digits(mut self, digits: u8) -> Self {
        self.digits = digits;
        self
    }

    /// Builder: set time period.
    pub fn with_period(mut self, period: u32) -> Self {
        self.period = period;
        self
    }

    /// Display name: "Issuer (account)" or just "account".
    pub fn display_name(&self) -> String {
        match &self.issuer {
            Some(iss) if !iss.is_empty() => format!("{} ({})", iss, self.account),
            _ => self.account.clone(),
        }
    }

    /// Generation parameters carried by this descriptor.
    pub fn params(&self) -> OtpParams {
        OtpParams {
            period: self.period,
            digits: self.digits,
            algorithm: self.algorithm,
        }
    }

    /// Normalise the secret (uppercase, no spaces/dashes).
    pub fn normalised_secret(&self) -> String {
        crate::otp::base32::normalise(&self.secret)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Generated code / display state
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A generated OTP code with associated timing info.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedCode {
    /// The OTP code string (e.g. "123456").
    pub code: String,
    /// Whole seconds until the code expires, in `[1, period]`.
    pub remaining_seconds: u32,
    /// Total period in seconds.
    pub period: u32,
    /// The time-step counter used.
    pub counter: u64,
    /// Unix time at which this code's window opened.
    pub window_start: u64,
}

/// What the countdown driver publishes to the rendering layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayState {
    pub session_id: String,
    /// Current code, `None` until the first successful generation.
    pub code: Option<String>,
    /// Fraction of the current window still remaining, in `(0, 1]`.
    pub fraction_remaining: f64,
    pub seconds_remaining: u32,
    /// Message of the most recent failed recomputation, cleared on success.
    pub error: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Error type
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Error kind for this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TotpErrorKind {
    InvalidSecret,
    InvalidUri,
    InvalidAlgorithm,
    InvalidDigits,
    InvalidPeriod,
    /// The keyed-hash primitive is missing or refused the operation.
    PrimitiveUnavailable,
    InvalidConfig,
    IoError,
}

/// Crate-level error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotpError {
    pub kind: TotpErrorKind,
    pub message: String,
    pub detail: Option<String>,
}

impl fmt::Display for TotpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.kind, self.message)?;
        if let Some(d) = &self.detail {
            write!(f, " ({})", d)?;
        }
        Ok(())
    }
}

impl std::error::Error for TotpError {}

impl TotpError {
    pub fn new(kind: TotpErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            message: msg.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn invalid_secret(msg: impl Into<String>) -> Self {
        Self::new(TotpErrorKind::InvalidSecret, msg)
    }

    pub fn invalid_uri(msg: impl Into<String>) -> Self {
        Self::new(TotpErrorKind::InvalidUri, msg)
    }

    pub fn primitive_unavailable(msg: impl Into<String>) -> Self {
        Self::new(TotpErrorKind::PrimitiveUnavailable, msg)
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::new(TotpErrorKind::InvalidConfig, msg)
    }
}

impl From<TotpError> for String {
    fn from(e: TotpError) -> String {
        e.to_string()
    }
}

impl From<std::io::Error> for TotpError {
    fn from(e: std::io::Error) -> Self {
        Self::new(TotpErrorKind::IoError, e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Algorithm ────────────────────────────────────────────────

    #[test]
    fn algorithm_default_is_sha1() {
        assert_eq!(Algorithm::default(), Algorithm::Sha1);
    }

    #[test]
    fn algorithm_display() {
        assert_eq!(Algorithm::Sha1.to_string(), "SHA1");
        assert_eq!(Algorithm::Sha256.to_string(), "SHA256");
        assert_eq!(Algorithm::Sha512.to_string(), "SHA512");
    }

    #[test]
    fn algorithm_from_str_loose() {
        assert_eq!(Algorithm::from_str_loose("sha1"), Some(Algorithm::Sha1));
        assert_eq!(Algorithm::from_str_loose(" SHA-256 "), Some(Algorithm::Sha256));
        assert_eq!(Algorithm::from_str_loose("HMAC-SHA512"), Some(Algorithm::Sha512));
        assert_eq!(Algorithm::from_str_loose("MD5"), None);
    }

    #[test]
    fn algorithm_serde_roundtrip() {
        let json = serde_json::to_string(&Algorithm::Sha256).unwrap();
        assert_eq!(json, "\"SHA256\"");
        let back: Algorithm = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Algorithm::Sha256);
    }

    // ── SecretKey ────────────────────────────────────────────────

    #[test]
    fn secret_key_from_base32() {
        let key = SecretKey::from_base32("GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ");
        assert_eq!(key.as_bytes(), b"12345678901234567890");
        assert_eq!(key.len(), 20);
    }

    #[test]
    fn secret_key_junk_is_empty() {
        assert!(SecretKey::from_base32("!!!").is_empty());
        assert!(SecretKey::from_base32("").is_empty());
    }

    #[test]
    fn secret_key_debug_hides_bytes() {
        let key = SecretKey::from_bytes(b"hunter2hunter2");
        let dbg = format!("{:?}", key);
        assert!(dbg.contains("len: 14"));
        assert!(!dbg.contains("104"));
    }

    // ── OtpParams ────────────────────────────────────────────────

    #[test]
    fn params_defaults_valid() {
        let p = OtpParams::default();
        assert_eq!(p.period, 30);
        assert_eq!(p.digits, 6);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn params_reject_zero_period() {
        let p = OtpParams { period: 0, ..Default::default() };
        assert_eq!(p.validate().unwrap_err().kind, TotpErrorKind::InvalidPeriod);
    }

    #[test]
    fn params_digit_bounds() {
        for d in [0u8, 5, 11, 255] {
            let p = OtpParams { digits: d, ..Default::default() };
            assert_eq!(p.validate().unwrap_err().kind, TotpErrorKind::InvalidDigits);
        }
        for d in 6u8..=10 {
            let p = OtpParams { digits: d, ..Default::default() };
            assert!(p.validate().is_ok());
        }
    }

    // ── OtpDescriptor ────────────────────────────────────────────

    #[test]
    fn descriptor_defaults() {
        let d = OtpDescriptor::new("alice@example.com", "JBSWY3DPEHPK3PXP");
        assert_eq!(d.algorithm, Algorithm::Sha1);
        assert_eq!(d.digits, 6);
        assert_eq!(d.period, 30);
        assert!(d.issuer.is_none());
    }

    #[test]
    fn descriptor_display_name() {
        let d1 = OtpDescriptor::new("user@ex.com", "S").with_issuer("GitHub");
        assert_eq!(d1.display_name(), "GitHub (user@ex.com)");
        let d2 = OtpDescriptor::new("user@ex.com", "S");
        assert_eq!(d2.display_name(), "user@ex.com");
    }

    #[test]
    fn descriptor_labels_are_trimmed() {
        let d = OtpDescriptor::new(" alice ", "S").with_issuer("\tACME ");
        assert_eq!(d.account, "alice");
        assert_eq!(d.issuer.as_deref(), Some("ACME"));
    }

    #[test]
    fn descriptor_params() {
        let d = OtpDescriptor::new("u", "S")
            .with_algorithm(Algorithm::Sha512)
            .with_digits(8)
            .with_period(60);
        assert_eq!(
            d.params(),
            OtpParams { period: 60, digits: 8, algorithm: Algorithm::Sha512 }
        );
    }

    #[test]
    fn descriptor_normalise_secret() {
        let d = OtpDescriptor::new("u", "jbsw y3dp-ehpk 3pxp");
        assert_eq!(d.normalised_secret(), "JBSWY3DPEHPK3PXP");
    }

    // ── Error ────────────────────────────────────────────────────

    #[test]
    fn error_display() {
        let err = TotpError::primitive_unavailable("HMAC-SHA1 missing").with_detail("no provider");
        let s = err.to_string();
        assert!(s.contains("PrimitiveUnavailable"));
        assert!(s.contains("HMAC-SHA1 missing"));
        assert!(s.contains("no provider"));
    }

    #[test]
    fn error_into_string() {
        let s: String = TotpError::invalid_uri("bad").into();
        assert!(s.contains("InvalidUri"));
    }
}

//! Core OTP generation: RFC 4226 (HOTP truncation) and RFC 6238 (TOTP).
//!
//! Counter derivation, keyed hashing through a [`KeyedHash`] provider,
//! dynamic truncation, and the time-window helpers the countdown driver
//! builds on.

use std::time::Duration;

use crate::otp::countdown::{Clock, SystemClock};
use crate::otp::hash::{KeyedHash, RustCryptoHmac};
use crate::otp::types::*;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Raw HMAC-OTP (RFC 4226 §5.3)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Compute the code for raw key bytes and a counter. `digits` outside
/// `MIN_DIGITS..=MAX_DIGITS` is rejected with `InvalidDigits`.
pub fn hotp_raw(
    hasher: &dyn KeyedHash,
    key: &[u8],
    counter: u64,
    digits: u8,
    algo: Algorithm,
) -> Result<String, TotpError> {
    check_digits(digits)?;
    let mac = hasher.mac(algo, key, &counter.to_be_bytes())?;
    let binary = truncate(&mac)?;
    Ok(format_code(binary, digits))
}

/// Dynamic truncation per RFC 4226 §5.3: a 31-bit value picked by the
/// digest's trailing nibble.
pub fn truncate(mac: &[u8]) -> Result<u32, TotpError> {
    let last = mac
        .last()
        .ok_or_else(|| TotpError::primitive_unavailable("Keyed hash returned an empty digest"))?;
    let offset = (last & 0x0f) as usize;
    let window = mac.get(offset..offset + 4).ok_or_else(|| {
        TotpError::primitive_unavailable(format!(
            "Keyed hash digest too short for truncation ({} bytes)",
            mac.len()
        ))
    })?;
    Ok(u32::from_be_bytes([window[0] & 0x7f, window[1], window[2], window[3]]))
}

/// `binary mod 10^digits`, left-padded with zeros to exactly `digits`.
fn format_code(binary: u32, digits: u8) -> String {
    let modulus = 10u64.pow(digits as u32);
    let code = binary as u64 % modulus;
    format!("{:0>width$}", code, width = digits as usize)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Time windows
//
//  A zero `period` is treated as one second here; the generation paths
//  reject it through `OtpParams::validate` before getting this far.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Compute the time-step counter for a given unix timestamp.
pub fn time_step_at(unix_seconds: u64, period: u32) -> u64 {
    unix_seconds / step(period)
}

/// Unix time at which the window containing `unix_seconds` opened.
pub fn window_start_at(unix_seconds: u64, period: u32) -> u64 {
    time_step_at(unix_seconds, period) * step(period)
}

/// Seconds remaining until the current time-step expires.
pub fn seconds_remaining(period: u32) -> u32 {
    seconds_remaining_at(current_unix_time(), period)
}

/// Seconds remaining for a specific timestamp, in `[1, period]`.
pub fn seconds_remaining_at(unix_seconds: u64, period: u32) -> u32 {
    let p = step(period);
    (p - (unix_seconds % p)) as u32
}

/// Fraction of the window still left at `now`, in `(0, 1]`.
///
/// Uses the sub-second part of `now` so the value decays smoothly between
/// whole seconds; `1.0` exactly at a boundary.
pub fn fraction_remaining_at(now: Duration, period: u32) -> f64 {
    let start = window_start_at(now.as_secs(), period);
    let elapsed = now.as_secs_f64() - start as f64;
    (1.0 - elapsed / step(period) as f64).clamp(0.0, 1.0)
}

fn step(period: u32) -> u64 {
    u64::from(period.max(1))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  TOTP (time-based, RFC 6238)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Generate a TOTP code from a base-32 secret, at the current time.
pub fn generate_totp(
    secret_b32: &str,
    period: u32,
    digits: u8,
    algo: Algorithm,
) -> Result<String, TotpError> {
    generate_totp_at(secret_b32, period, digits, algo, current_unix_time())
}

/// Generate a TOTP code at an explicit unix timestamp.
///
/// The secret is decoded leniently; an empty key still yields a code.
pub fn generate_totp_at(
    secret_b32: &str,
    period: u32,
    digits: u8,
    algo: Algorithm,
    unix_seconds: u64,
) -> Result<String, TotpError> {
    let key = SecretKey::from_base32(secret_b32);
    let params = OtpParams { period, digits, algorithm: algo };
    generate_with_key(&RustCryptoHmac, &key, &params, unix_seconds).map(|g| g.code)
}

/// Generate a [`GeneratedCode`] from an already-decoded key.
pub fn generate_with_key(
    hasher: &dyn KeyedHash,
    key: &SecretKey,
    params: &OtpParams,
    unix_seconds: u64,
) -> Result<GeneratedCode, TotpError> {
    params.validate()?;
    let counter = time_step_at(unix_seconds, params.period);
    let code = hotp_raw(hasher, key.as_bytes(), counter, params.digits, params.algorithm)?;
    Ok(GeneratedCode {
        code,
        remaining_seconds: seconds_remaining_at(unix_seconds, params.period),
        period: params.period,
        counter,
        window_start: window_start_at(unix_seconds, params.period),
    })
}

/// Generate a [`GeneratedCode`] for a descriptor at a specific unix timestamp.
pub fn generate_code_at(desc: &OtpDescriptor, unix_seconds: u64) -> Result<GeneratedCode, TotpError> {
    let key = SecretKey::from_base32(&desc.secret);
    generate_with_key(&RustCryptoHmac, &key, &desc.params(), unix_seconds)
}

/// Generate a [`GeneratedCode`] for a descriptor at the current time.
pub fn generate_code(desc: &OtpDescriptor) -> Result<GeneratedCode, TotpError> {
    generate_code_at(desc, current_unix_time())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Utility helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Current unix time since the epoch, read from [`SystemClock`] so code
/// generation and the countdown driver agree on "now".
pub fn unix_now() -> Duration {
    SystemClock.now()
}

/// Current unix timestamp in whole seconds, fractional part truncated.
pub fn current_unix_time() -> u64 {
    unix_now().as_secs()
}

/// Format an OTP code with a space in the middle (e.g. "123 456").
pub fn format_code_display(code: &str) -> String {
    if code.len() <= 4 {
        return code.to_string();
    }
    let mid = code.len() / 2;
    format!("{} {}", &code[..mid], &code[mid..])
}

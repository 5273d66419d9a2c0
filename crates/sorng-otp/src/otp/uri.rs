//! `otpauth://` URI building and parsing per the Google Authenticator
//! key-URI format:
//! <https://github.com/google/google-authenticator/wiki/Key-Uri-Format>
//!
//! Format: `otpauth://totp/ISSUER:ACCOUNT?secret=BASE32&issuer=ISSUER&algorithm=SHA1&digits=6&period=30`

use crate::otp::types::*;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Parse
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Parse an `otpauth://totp/...` URI, or `None` if it does not have that shape.
pub fn parse_otpauth_uri(uri: &str) -> Option<OtpDescriptor> {
    match try_parse_otpauth_uri(uri) {
        Ok(desc) => Some(desc),
        Err(e) => {
            log::debug!("Rejected OTP URI: {}", e);
            None
        }
    }
}

/// Parse an `otpauth://totp/...` URI, reporting why it was rejected.
///
/// Missing `algorithm`, `digits` and `period` fall back to SHA1 / 6 / 30;
/// out-of-range values are ignored the same way.
pub fn try_parse_otpauth_uri(uri: &str) -> Result<OtpDescriptor, TotpError> {
    let url = url::Url::parse(uri.trim())
        .map_err(|e| TotpError::invalid_uri(format!("Invalid URI: {}", e)))?;

    if url.scheme() != "otpauth" {
        return Err(TotpError::invalid_uri(format!(
            "Expected scheme 'otpauth', got '{}'",
            url.scheme()
        )));
    }

    match url.host_str() {
        Some(t) if t.eq_ignore_ascii_case("totp") => {}
        other => {
            return Err(TotpError::invalid_uri(format!(
                "Unsupported OTP type: {:?}",
                other
            )))
        }
    }

    // Path is "/ACCOUNT" or "/ISSUER:ACCOUNT"; the colon may itself be encoded.
    let raw_path = url.path();
    let raw_path = raw_path.strip_prefix('/').unwrap_or(raw_path);
    let (path_issuer, account) = match raw_path.split_once(':') {
        Some((iss, acct)) => (Some(url_decode(iss)), url_decode(acct)),
        None => {
            let decoded = url_decode(raw_path);
            match decoded.split_once(':') {
                Some((iss, acct)) => (Some(iss.to_string()), acct.to_string()),
                None => (None, decoded),
            }
        }
    };
    let account = account.trim().to_string();
    let path_issuer = path_issuer
        .map(|i| i.trim().to_string())
        .filter(|i| !i.is_empty());

    let mut secret = None;
    let mut param_issuer = None;
    let mut algorithm = Algorithm::Sha1;
    let mut digits = DEFAULT_DIGITS;
    let mut period = DEFAULT_PERIOD;

    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "secret" => secret = Some(value.to_string()),
            "issuer" => param_issuer = Some(value.to_string()),
            "algorithm" => {
                if let Some(algo) = Algorithm::from_str_loose(&value) {
                    algorithm = algo;
                }
            }
            "digits" => {
                if let Ok(d) = value.parse::<u8>() {
                    if (MIN_DIGITS..=MAX_DIGITS).contains(&d) {
                        digits = d;
                    }
                }
            }
            "period" => {
                if let Ok(p) = value.parse::<u32>() {
                    if p > 0 {
                        period = p;
                    }
                }
            }
            _ => {} // ignore unknown params
        }
    }

    let secret = secret
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| TotpError::invalid_uri("Missing 'secret' parameter"))?;

    // Prefer issuer from query param, then from path prefix
    let issuer = param_issuer.filter(|i| !i.is_empty()).or(path_issuer);

    let mut desc = OtpDescriptor::new(account, secret)
        .with_algorithm(algorithm)
        .with_digits(digits)
        .with_period(period);
    desc.issuer = issuer;
    Ok(desc)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Build
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Build an `otpauth://totp/` URI from a descriptor.
///
/// Algorithm, digits and period are only emitted when they differ from the
/// RFC 6238 defaults. Labels are trimmed the same way the parser trims them.
pub fn build_otpauth_uri(desc: &OtpDescriptor) -> String {
    let account = url_encode(desc.account.trim());
    let issuer = desc.issuer.as_deref().map(str::trim).filter(|i| !i.is_empty());

    // An empty issuer prefix keeps an account containing ':' from being
    // split on its encoded colon when parsed back.
    let path = match issuer {
        Some(iss) => format!("{}:{}", url_encode(iss), account),
        None if desc.account.contains(':') => format!(":{}", account),
        None => account,
    };

    let mut params = vec![format!("secret={}", url_encode(&desc.normalised_secret()))];

    if let Some(iss) = issuer {
        params.push(format!("issuer={}", url_encode(iss)));
    }

    if desc.algorithm != Algorithm::Sha1 {
        params.push(format!("algorithm={}", desc.algorithm.uri_name()));
    }

    if desc.digits != DEFAULT_DIGITS {
        params.push(format!("digits={}", desc.digits));
    }

    if desc.period != DEFAULT_PERIOD {
        params.push(format!("period={}", desc.period));
    }

    format!("otpauth://totp/{}?{}", path, params.join("&"))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Percent-encoding helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Percent-encode everything outside the RFC 3986 unreserved set.
pub fn url_encode(s: &str) -> String {
    let mut output = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                output.push(byte as char);
            }
            _ => output.push_str(&format!("%{:02X}", byte)),
        }
    }
    output
}

/// Decode `%XX` escapes (UTF-8 aware); malformed escapes are kept verbatim.
pub fn url_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(byte) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

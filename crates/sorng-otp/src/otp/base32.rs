//! RFC 4648 base-32 for shared secrets.
//!
//! [`decode`] is deliberately lenient: it keeps whatever alphabet symbols are
//! present and silently drops everything else (padding, whitespace, dashes,
//! typos). [`decode_strict`] is the validating variant for callers that want
//! to reject malformed secrets up front.

use crate::otp::types::*;

const ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// 5-bit value of an (uppercase) alphabet symbol.
fn symbol_value(c: u8) -> Option<u32> {
    match c {
        b'A'..=b'Z' => Some((c - b'A') as u32),
        b'2'..=b'7' => Some((c - b'2') as u32 + 26),
        _ => None,
    }
}

/// Decode a base-32 string into raw key bytes.
///
/// Input is uppercased, then every character outside `A–Z2–7` is ignored.
/// Bits left over after the last whole byte are discarded, so canonical
/// padded input round-trips exactly. Never fails; junk yields an empty vec.
pub fn decode(input: &str) -> Vec<u8> {
    let upper = input.to_uppercase();
    let mut out = Vec::with_capacity(upper.len() * 5 / 8);
    let mut buffer: u32 = 0;
    let mut bits: u32 = 0;

    for value in upper.bytes().filter_map(symbol_value) {
        buffer = (buffer << 5) | value;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push((buffer >> bits) as u8);
            buffer &= (1 << bits) - 1;
        }
    }

    out
}

/// Encode raw bytes as canonical, `=`-padded RFC 4648 base-32.
pub fn encode(bytes: &[u8]) -> String {
    base32::encode(base32::Alphabet::Rfc4648 { padding: true }, bytes)
}

/// Encode raw bytes to base-32 without padding (authenticator-app style).
pub fn encode_unpadded(bytes: &[u8]) -> String {
    base32::encode(base32::Alphabet::Rfc4648 { padding: false }, bytes)
}

/// Strip spaces and dashes and uppercase.
pub fn normalise(secret: &str) -> String {
    secret.replace([' ', '-'], "").to_uppercase()
}

/// Decode a base-32 secret, rejecting anything that is not well-formed.
///
/// Spaces and dashes are tolerated as grouping characters and trailing `=`
/// padding is optional. An input that decodes to zero bytes is rejected.
pub fn decode_strict(b32: &str) -> Result<Vec<u8>, TotpError> {
    let cleaned = normalise(b32);
    if cleaned.is_empty() {
        return Err(TotpError::invalid_secret("Empty base-32 secret"));
    }
    if let Some(bad) = cleaned
        .trim_end_matches('=')
        .chars()
        .find(|c| !ALPHABET.contains(&(*c as u8)) || !c.is_ascii())
    {
        return Err(TotpError::invalid_secret("Invalid base-32 secret")
            .with_detail(format!("unexpected character {:?}", bad)));
    }

    let padded = pad_base32(&cleaned);
    let bytes = base32::decode(base32::Alphabet::Rfc4648 { padding: true }, &padded)
        .or_else(|| base32::decode(base32::Alphabet::Rfc4648 { padding: false }, &cleaned))
        .ok_or_else(|| TotpError::invalid_secret("Invalid base-32 secret"))?;

    if bytes.is_empty() {
        return Err(TotpError::invalid_secret("Base-32 secret decodes to an empty key"));
    }
    Ok(bytes)
}

/// Check if a string is a well-formed base-32 secret.
pub fn is_valid_base32(s: &str) -> bool {
    decode_strict(s).is_ok()
}

/// Generate a cryptographically-random base-32 secret (unpadded).
pub fn generate_secret(byte_length: usize) -> String {
    use rand::RngCore;
    let mut buf = vec![0u8; byte_length];
    rand::thread_rng().fill_bytes(&mut buf);
    let encoded = encode_unpadded(&buf);
    zeroize::Zeroize::zeroize(&mut buf);
    encoded
}

/// Pad a base-32 string to a multiple of 8 with '='.
fn pad_base32(s: &str) -> String {
    let trimmed = s.trim_end_matches('=');
    let remainder = trimmed.len() % 8;
    if remainder == 0 {
        trimmed.to_string()
    } else {
        format!("{}{}", trimmed, "=".repeat(8 - remainder))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_rfc_secret() {
        assert_eq!(
            decode("GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ"),
            b"12345678901234567890"
        );
    }

    #[test]
    fn decode_rfc4648_vectors() {
        assert_eq!(decode(""), b"");
        assert_eq!(decode("MY======"), b"f");
        assert_eq!(decode("MZXQ===="), b"fo");
        assert_eq!(decode("MZXW6==="), b"foo");
        assert_eq!(decode("MZXW6YQ="), b"foob");
        assert_eq!(decode("MZXW6YTB"), b"fooba");
        assert_eq!(decode("MZXW6YTBOI======"), b"foobar");
    }

    #[test]
    fn decode_is_case_insensitive() {
        assert_eq!(decode("mzxw6ytboi"), decode("MZXW6YTBOI"));
    }

    #[test]
    fn decode_ignores_junk() {
        let clean = decode("JBSWY3DPEHPK3PXP");
        assert_eq!(decode("JBSW Y3DP-EHPK 3PXP"), clean);
        assert_eq!(decode("jbsw.y3dp/ehpk_3pxp!!"), clean);
        assert_eq!(decode("JBSWY3DPEHPK3PXP===="), clean);
    }

    #[test]
    fn decode_all_invalid_is_empty() {
        assert!(decode("!!!").is_empty());
        assert!(decode("0189").is_empty());
        assert!(decode("====").is_empty());
    }

    #[test]
    fn decode_discards_partial_trailing_bits() {
        // One symbol = 5 bits, not enough for a byte.
        assert!(decode("M").is_empty());
        // Two symbols = 10 bits → one byte, 2 bits dropped.
        assert_eq!(decode("MY"), b"f");
    }

    #[test]
    fn decode_stripped_equals_decode_raw() {
        let raw = "ge zd-gn bv gy3t#qojq";
        let stripped: String = raw
            .to_uppercase()
            .chars()
            .filter(|c| c.is_ascii_uppercase() || ('2'..='7').contains(c))
            .collect();
        assert_eq!(decode(raw), decode(&stripped));
    }

    #[test]
    fn decode_left_inverse_of_encode() {
        let samples: [&[u8]; 4] = [
            b"",
            b"hello",
            b"12345678901234567890",
            &[0x00, 0xff, 0x10, 0x80, 0x7f, 0xde, 0xad, 0xbe, 0xef, 0x01],
        ];
        for bytes in samples {
            let encoded = encode(bytes);
            assert_eq!(encoded.len() % 8, 0);
            assert_eq!(decode(&encoded), bytes);
        }
    }

    #[test]
    fn decode_left_inverse_for_unaligned_lengths() {
        let bytes = b"hello world secret";
        assert_eq!(decode(&encode(bytes)), bytes);
        assert_eq!(decode(&encode_unpadded(bytes)), bytes);
    }

    #[test]
    fn normalise_strips_groupings() {
        assert_eq!(normalise("jbsw y3dp-ehpk"), "JBSWY3DPEHPK");
    }

    #[test]
    fn strict_accepts_well_formed() {
        assert_eq!(
            decode_strict("GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ").unwrap(),
            b"12345678901234567890"
        );
        assert!(decode_strict("jbsw y3dp ehpk 3pxp").is_ok());
        assert!(decode_strict("MZXW6===").is_ok());
    }

    #[test]
    fn strict_rejects_junk() {
        assert_eq!(
            decode_strict("!!!").unwrap_err().kind,
            TotpErrorKind::InvalidSecret
        );
        assert!(decode_strict("").is_err());
        assert!(decode_strict("JBSW1Y3DP").is_err());
        assert!(decode_strict("JB=SWY3DP").is_err());
    }

    #[test]
    fn is_valid_base32_check() {
        assert!(is_valid_base32("JBSWY3DPEHPK3PXP"));
        assert!(is_valid_base32("jbsw y3dp ehpk 3pxp"));
        assert!(!is_valid_base32(""));
        assert!(!is_valid_base32("!!!"));
    }

    #[test]
    fn generate_secret_length() {
        let s = generate_secret(20);
        assert_eq!(s.len(), 32);
        assert_eq!(decode(&s).len(), 20);
        assert_ne!(generate_secret(20), s);
    }
}

//! # SortOfRemote NG – Live OTP engine
//!
//! Time-based one-time password engine behind the credential view:
//!
//! - **Base32** – lenient RFC 4648 secret decoding (junk characters ignored)
//! - **RFC 4226 / 6238** – TOTP generation, SHA-1 by default, SHA-256/512 selectable
//! - **otpauth:// URIs** – building and parsing descriptors for QR hand-off
//! - **QR service links** – external image-service URLs for an OTP URI
//! - **Countdown driver** – frame-paced refresh task publishing the current
//!   code and a decaying "fraction remaining" value, cancellable on teardown

pub mod otp;

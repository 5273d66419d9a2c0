//! OTP crate: sub-modules.

pub mod types;
pub mod base32;
pub mod hash;
pub mod core;
pub mod uri;
pub mod qr;
pub mod config;
pub mod countdown;

// Re-export top-level items for convenience.
pub use types::*;
pub use config::OtpViewConfig;
pub use countdown::{Clock, CountdownDriver, CountdownHandle, CountdownSession, SystemClock};
pub use hash::{KeyedHash, RustCryptoHmac};

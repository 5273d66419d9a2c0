//! Command-line surface and config resolution for the OTP view.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use sorng_otp::otp::{self, Algorithm, OtpDescriptor, OtpViewConfig};

/// Show a live one-time password for a shared secret.
#[derive(Parser, Debug, Clone)]
#[command(name = "otp-view")]
#[command(version, about, long_about = None)]
pub struct Cli {
  /// Base-32 shared secret (junk characters are ignored)
  #[arg(conflicts_with = "uri")]
  pub secret: Option<String>,

  /// Full otpauth://totp/... URI instead of a bare secret
  #[arg(long)]
  pub uri: Option<String>,

  /// Account label used for the QR link and header
  #[arg(long, default_value = "account")]
  pub account: String,

  /// Issuer used for the QR link and header
  #[arg(long)]
  pub issuer: Option<String>,

  /// Path to a JSON configuration file
  #[arg(short, long)]
  pub config: Option<PathBuf>,

  /// Time step in seconds
  #[arg(long)]
  pub period: Option<u32>,

  /// Code width (6-10)
  #[arg(long)]
  pub digits: Option<u8>,

  /// HMAC digest (SHA1, SHA256, SHA512)
  #[arg(long)]
  pub algorithm: Option<String>,

  /// Reject secrets containing non-base-32 characters
  #[arg(long)]
  pub strict: bool,

  /// Print the current code once and exit
  #[arg(long)]
  pub once: bool,

  /// With --once, print JSON instead of text
  #[arg(long, requires = "once")]
  pub json: bool,

  /// Print the QR image-service link for this secret and exit
  #[arg(long)]
  pub qr: bool,

  /// Log level (trace, debug, info, warn, error)
  #[arg(long, default_value = "warn")]
  pub log_level: String,
}

/// Everything the view needs, after merging config, env, URI and flags.
#[derive(Debug, Clone)]
pub struct ResolvedView {
  pub config: OtpViewConfig,
  pub descriptor: OtpDescriptor,
}

impl Cli {
  /// Merge defaults, config file, `OTP_*` env, the URI's own parameters and
  /// command-line flags (later wins), then validate.
  pub fn resolve(&self) -> Result<ResolvedView> {
    self.resolve_with_env(|key| std::env::var(key).ok())
  }

  pub fn resolve_with_env<F>(&self, lookup: F) -> Result<ResolvedView>
  where
    F: Fn(&str) -> Option<String>,
  {
    let base = match &self.config {
      Some(path) => OtpViewConfig::load(path)?,
      None => OtpViewConfig::default(),
    };
    let mut config = base.with_overrides_from(lookup)?;

    let mut descriptor = match (&self.uri, &self.secret) {
      (Some(uri), _) => {
        let desc = otp::uri::parse_otpauth_uri(uri)
          .context("not a valid otpauth://totp URI")?;
        config.period = desc.period;
        config.digits = desc.digits;
        config.algorithm = desc.algorithm;
        desc
      }
      (None, Some(secret)) => {
        let mut desc = OtpDescriptor::new(self.account.clone(), secret.clone());
        if let Some(iss) = &self.issuer {
          desc = desc.with_issuer(iss.clone());
        }
        desc
      }
      (None, None) => bail!("a secret or --uri is required"),
    };

    if let Some(p) = self.period {
      config.period = p;
    }
    if let Some(d) = self.digits {
      config.digits = d;
    }
    if let Some(a) = &self.algorithm {
      config.algorithm = match Algorithm::from_str_loose(a) {
        Some(algo) => algo,
        None => bail!("unknown algorithm '{}'", a),
      };
    }
    config.validate()?;

    if self.strict {
      otp::base32::decode_strict(&descriptor.secret)?;
    }

    descriptor.period = config.period;
    descriptor.digits = config.digits;
    descriptor.algorithm = config.algorithm;

    Ok(ResolvedView { config, descriptor })
  }
}

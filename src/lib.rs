pub mod cli;
pub mod render;

use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use sorng_otp::otp::{self, CountdownDriver, CountdownSession, SystemClock};
use tracing_subscriber::EnvFilter;

use cli::{Cli, ResolvedView};

/// Install the fmt subscriber; `log` records from the engine are bridged in.
/// `RUST_LOG` wins over `--log-level` when set.
pub fn init_logging(level: &str) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
  let _ = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .try_init();
}

pub async fn run() -> Result<()> {
  let args = Cli::parse();
  init_logging(&args.log_level);

  let view = args.resolve()?;
  if args.qr {
    println!("{}", qr_output(&view)?);
    return Ok(());
  }
  if args.once {
    println!("{}", once_output(&view, otp::core::current_unix_time(), args.json)?);
    return Ok(());
  }
  run_live(view).await
}

/// External QR image link for the resolved descriptor.
pub fn qr_output(view: &ResolvedView) -> Result<String> {
  Ok(otp::qr::descriptor_qr_url(
    &view.config.qr_service_url,
    &view.descriptor,
    view.config.qr_size,
  )?)
}

/// Code and seconds remaining at `unix_seconds`, as text or JSON.
pub fn once_output(view: &ResolvedView, unix_seconds: u64, json: bool) -> Result<String> {
  let generated = otp::core::generate_code_at(&view.descriptor, unix_seconds)?;
  if json {
    Ok(serde_json::to_string(&generated)?)
  } else {
    Ok(format!("{} {}s", generated.code, generated.remaining_seconds))
  }
}

/// Redraw the code and decay bar until Ctrl-C.
async fn run_live(view: ResolvedView) -> Result<()> {
  let label = view.descriptor.display_name();
  let session = CountdownSession::from_descriptor(&view.descriptor)?;
  let handle = CountdownDriver::spawn(session, Arc::new(SystemClock), view.config.frame_interval());
  let mut rx = handle.subscribe();

  let mut shown = String::new();
  let mut stdout = std::io::stdout();
  let ctrl_c = tokio::signal::ctrl_c();
  tokio::pin!(ctrl_c);
  loop {
    let line = render::render_line(&label, &rx.borrow_and_update(), render::BAR_WIDTH);
    if line != shown {
      write!(stdout, "\r\x1b[2K{}", line)?;
      stdout.flush()?;
      shown = line;
    }

    tokio::select! {
      changed = rx.changed() => {
        if changed.is_err() {
          break;
        }
      }
      _ = &mut ctrl_c => {
        break;
      }
    }
  }

  writeln!(stdout)?;
  handle.stop().await;
  log::info!("OTP view closed");
  Ok(())
}

//! Terminal rendering of a [`DisplayState`].

use sorng_otp::otp::core::format_code_display;
use sorng_otp::otp::DisplayState;

/// Width of the decay bar in cells.
pub const BAR_WIDTH: usize = 30;

/// Decay bar: `#` for the remaining fraction, `.` for the elapsed part.
pub fn decay_bar(fraction_remaining: f64, width: usize) -> String {
  let filled = (fraction_remaining.clamp(0.0, 1.0) * width as f64).ceil() as usize;
  let filled = filled.min(width);
  format!("{}{}", "#".repeat(filled), ".".repeat(width - filled))
}

/// One status line: label, grouped code, decay bar, seconds left.
pub fn render_line(label: &str, state: &DisplayState, width: usize) -> String {
  let bar = decay_bar(state.fraction_remaining, width);
  match (&state.code, &state.error) {
    (Some(code), _) => format!(
      "{}  {}  [{}] {:>2}s",
      label,
      format_code_display(code),
      bar,
      state.seconds_remaining
    ),
    (None, Some(err)) => format!("{}  unavailable: {}", label, err),
    (None, None) => format!("{}  …  [{}] {:>2}s", label, bar, state.seconds_remaining),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn state(code: Option<&str>, fraction: f64, secs: u32) -> DisplayState {
    DisplayState {
      session_id: "s".into(),
      code: code.map(str::to_string),
      fraction_remaining: fraction,
      seconds_remaining: secs,
      error: None,
    }
  }

  #[test]
  fn bar_fills_proportionally() {
    assert_eq!(decay_bar(1.0, 10), "##########");
    assert_eq!(decay_bar(0.5, 10), "#####.....");
    assert_eq!(decay_bar(0.01, 10), "#.........");
    assert_eq!(decay_bar(0.0, 4), "....");
    assert_eq!(decay_bar(7.0, 4), "####");
  }

  #[test]
  fn line_with_code() {
    let line = render_line("GitHub (me)", &state(Some("287082"), 0.5, 15), 4);
    assert_eq!(line, "GitHub (me)  287 082  [##..] 15s");
  }

  #[test]
  fn line_with_error() {
    let mut s = state(None, 0.5, 15);
    s.error = Some("[PrimitiveUnavailable] no HMAC".into());
    assert_eq!(render_line("x", &s, 4), "x  unavailable: [PrimitiveUnavailable] no HMAC");
  }
}

//! Countdown / refresh driver.
//!
//! A [`CountdownSession`] owns one decoded secret and the state of a single
//! OTP display: which window the shown code belongs to, the code itself, and
//! the smooth "fraction remaining" value for the decay bar. It is stepped with
//! explicit timestamps, so tests can drive it frame by frame.
//!
//! [`CountdownDriver::spawn`] runs a session as a frame-paced tokio task. Every
//! frame re-reads the [`Clock`] rather than counting ticks, so a suspended
//! process resumes on the right code. The task publishes [`DisplayState`]
//! through a `watch` channel and stops when its [`CountdownHandle`] is stopped
//! or dropped.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::otp::core::{self, generate_with_key};
use crate::otp::hash::{KeyedHash, RustCryptoHmac};
use crate::otp::types::*;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Clocks
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Wall-clock source, as time since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now(&self) -> Duration;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        let now = Utc::now();
        match u64::try_from(now.timestamp()) {
            Ok(secs) => Duration::new(secs, now.timestamp_subsec_nanos()),
            Err(_) => Duration::ZERO,
        }
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Mutex<Duration>,
}

impl ManualClock {
    pub fn new(now: Duration) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn set(&self, now: Duration) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *guard += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Session
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// What a single [`CountdownSession::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Same window as before; only the decay values moved.
    Unchanged,
    /// A new window started and a fresh code was generated.
    Refreshed,
    /// A new window started but generation failed; retried next tick.
    Failed,
}

/// State of one live OTP display.
pub struct CountdownSession {
    id: String,
    key: SecretKey,
    params: OtpParams,
    hasher: Arc<dyn KeyedHash>,
    /// Window-start (unix seconds) of the code currently shown.
    last_window_start: Option<u64>,
    current: Option<GeneratedCode>,
    fraction_remaining: f64,
    seconds_remaining: u32,
    last_error: Option<TotpError>,
}

impl std::fmt::Debug for CountdownSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CountdownSession")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("params", &self.params)
            .field("last_window_start", &self.last_window_start)
            .field("fraction_remaining", &self.fraction_remaining)
            .finish_non_exhaustive()
    }
}

impl CountdownSession {
    /// Create a session for an already-decoded key.
    pub fn new(key: SecretKey, params: OtpParams) -> Result<Self, TotpError> {
        params.validate()?;
        if key.is_empty() {
            log::warn!("OTP session created with an empty key; codes will not authenticate");
        }
        let session = Self {
            id: uuid::Uuid::new_v4().to_string(),
            key,
            params,
            hasher: Arc::new(RustCryptoHmac),
            last_window_start: None,
            current: None,
            fraction_remaining: 1.0,
            seconds_remaining: params.period,
            last_error: None,
        };
        log::debug!(
            "OTP session {} created ({} byte key, {}s/{} digits/{})",
            session.id,
            session.key.len(),
            params.period,
            params.digits,
            params.algorithm
        );
        Ok(session)
    }

    /// Create a session from a base-32 secret (decoded leniently).
    pub fn from_base32(secret_b32: &str, params: OtpParams) -> Result<Self, TotpError> {
        Self::new(SecretKey::from_base32(secret_b32), params)
    }

    /// Create a session from an `otpauth://` descriptor.
    pub fn from_descriptor(desc: &OtpDescriptor) -> Result<Self, TotpError> {
        Self::from_base32(&desc.secret, desc.params())
    }

    /// Builder: use a different keyed-hash provider.
    pub fn with_hasher(mut self, hasher: Arc<dyn KeyedHash>) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn params(&self) -> OtpParams {
        self.params
    }

    /// Advance the session to wall-clock time `now`.
    ///
    /// Regenerates only when `now` falls in a different window than the code
    /// on display (in either direction, so clock jumps are handled). A failed
    /// generation clears the stale code, is logged once per distinct error,
    /// and is retried on the next tick.
    pub fn tick(&mut self, now: Duration) -> TickOutcome {
        let secs = now.as_secs();
        let period = self.params.period;
        let window_start = core::window_start_at(secs, period);

        self.fraction_remaining = core::fraction_remaining_at(now, period);
        self.seconds_remaining = core::seconds_remaining_at(secs, period);

        if self.last_window_start == Some(window_start) {
            return TickOutcome::Unchanged;
        }

        match generate_with_key(self.hasher.as_ref(), &self.key, &self.params, secs) {
            Ok(generated) => {
                if self.last_error.take().is_some() {
                    log::info!("OTP session {} recovered", self.id);
                }
                log::debug!(
                    "OTP session {} refreshed for window {} (counter {})",
                    self.id,
                    generated.window_start,
                    generated.counter
                );
                self.last_window_start = Some(window_start);
                self.current = Some(generated);
                TickOutcome::Refreshed
            }
            Err(e) => {
                if self.last_error.as_ref() != Some(&e) {
                    log::warn!("OTP session {}: code generation failed: {}", self.id, e);
                }
                self.current = None;
                self.last_error = Some(e);
                TickOutcome::Failed
            }
        }
    }

    /// Code on display, if one has been generated for the current window.
    pub fn current_code(&self) -> Option<&str> {
        self.current.as_ref().map(|g| g.code.as_str())
    }

    pub fn current(&self) -> Option<&GeneratedCode> {
        self.current.as_ref()
    }

    /// Fraction of the current window still left, in `(0, 1]`.
    pub fn fraction_remaining(&self) -> f64 {
        self.fraction_remaining
    }

    pub fn seconds_remaining(&self) -> u32 {
        self.seconds_remaining
    }

    pub fn last_error(&self) -> Option<&TotpError> {
        self.last_error.as_ref()
    }

    /// Values for the rendering layer.
    pub fn snapshot(&self) -> DisplayState {
        DisplayState {
            session_id: self.id.clone(),
            code: self.current.as_ref().map(|g| g.code.clone()),
            fraction_remaining: self.fraction_remaining,
            seconds_remaining: self.seconds_remaining,
            error: self.last_error.as_ref().map(|e| e.to_string()),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Driver
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Shortest frame interval the driver will pace at.
pub const MIN_FRAME_INTERVAL: Duration = Duration::from_millis(1);

/// Spawns frame-paced refresh tasks for sessions.
pub struct CountdownDriver;

impl CountdownDriver {
    /// Start ticking `session` every `frame_interval` on the current tokio
    /// runtime. The first frame runs immediately. Intervals shorter than
    /// [`MIN_FRAME_INTERVAL`] (including zero) are raised to it.
    pub fn spawn(
        mut session: CountdownSession,
        clock: Arc<dyn Clock>,
        frame_interval: Duration,
    ) -> CountdownHandle {
        let frame_interval = frame_interval.max(MIN_FRAME_INTERVAL);
        session.tick(clock.now());
        let (state_tx, state_rx) = watch::channel(session.snapshot());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let id = session.id().to_string();

        log::info!(
            "Starting OTP countdown {} (frame every {:?})",
            id,
            frame_interval
        );

        let task = tokio::spawn(run_countdown_loop(
            session,
            clock,
            frame_interval,
            state_tx,
            shutdown_rx,
        ));

        CountdownHandle {
            id,
            state_rx,
            shutdown_tx,
            task: Some(task),
        }
    }
}

/// Handle to a running countdown task. Dropping it stops the task.
pub struct CountdownHandle {
    id: String,
    state_rx: watch::Receiver<DisplayState>,
    shutdown_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl CountdownHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// A receiver that observes every published [`DisplayState`].
    pub fn subscribe(&self) -> watch::Receiver<DisplayState> {
        self.state_rx.clone()
    }

    /// Most recently published state.
    pub fn current(&self) -> DisplayState {
        self.state_rx.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop the task and wait for it to exit. Nothing is published after
    /// this returns.
    pub async fn stop(mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                log::warn!("OTP countdown {} ended abnormally: {}", self.id, e);
            }
        }
    }
}

impl Drop for CountdownHandle {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}

async fn run_countdown_loop(
    mut session: CountdownSession,
    clock: Arc<dyn Clock>,
    frame_interval: Duration,
    state_tx: watch::Sender<DisplayState>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut frames = tokio::time::interval(frame_interval);
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    log::debug!("OTP countdown {} shutting down", session.id());
                    break;
                }
            }

            _ = frames.tick() => {
                session.tick(clock.now());
                let snapshot = session.snapshot();
                state_tx.send_if_modified(|shown| {
                    if *shown == snapshot {
                        false
                    } else {
                        *shown = snapshot;
                        true
                    }
                });
            }
        }
    }
}

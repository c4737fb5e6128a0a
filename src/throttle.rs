//! Outgoing message throttling.
//!
//! A [`Throttle`] counts the lines it admits inside a fixed window.
//! Once `max_messages` lines have been admitted, every further line is
//! denied until `period` has passed since the window started. The next
//! call after that starts a fresh window.

use std::fmt::Display;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Limits for a [`Throttle`].
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ThrottleConfig {
  /// Maximum number of lines admitted per window.
  pub max_messages: u32,

  /// Length of a window.
  pub period: Duration,

  /// Lines shorter than this (in characters) are denied.
  pub min_length: Option<usize>,

  /// Lines longer than this (in characters) are denied.
  pub max_length: Option<usize>,
}

impl ThrottleConfig {
  pub fn new(max_messages: u32, period: Duration) -> Self {
    Self {
      max_messages,
      period,
      min_length: None,
      max_length: None,
    }
  }

  /// Default limits for regular chat messages: 20 per 30 seconds.
  pub fn chat() -> Self {
    Self::new(20, Duration::from_secs(30))
  }

  /// Default limits for whispers: 3 per second.
  pub fn whisper() -> Self {
    Self::new(3, Duration::from_secs(1))
  }

  pub fn min_length(mut self, min: usize) -> Self {
    self.min_length = Some(min);
    self
  }

  pub fn max_length(mut self, max: usize) -> Self {
    self.max_length = Some(max);
    self
  }
}

/// Why a line was denied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Violation {
  TooShort,
  TooLong,
  TooManyMessages,
}

impl Display for Violation {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Violation::TooShort => f.write_str("message too short"),
      Violation::TooLong => f.write_str("message too long"),
      Violation::TooManyMessages => f.write_str("too many messages"),
    }
  }
}

impl std::error::Error for Violation {}

#[derive(Debug)]
struct Window {
  started_at: Option<Instant>,
  count: u32,
}

/// A fixed-window rate limiter.
///
/// The check and the increment happen under one lock, so concurrent
/// senders can never both take the last slot of a window.
#[derive(Debug)]
pub struct Throttle {
  config: ThrottleConfig,
  window: Mutex<Window>,
}

impl Throttle {
  pub fn new(config: ThrottleConfig) -> Self {
    Self {
      config,
      window: Mutex::new(Window {
        started_at: None,
        count: 0,
      }),
    }
  }

  pub fn config(&self) -> &ThrottleConfig {
    &self.config
  }

  /// Returns `true` if `line` may be sent now, and counts it.
  pub fn admit(&self, line: &str) -> bool {
    self.check(line).is_ok()
  }

  /// Like [`Throttle::admit`], but reports why the line was denied.
  pub fn check(&self, line: &str) -> Result<(), Violation> {
    self.check_at(line, Instant::now())
  }

  /// [`Throttle::admit`] at a given point in time.
  pub fn admit_at(&self, line: &str, now: Instant) -> bool {
    self.check_at(line, now).is_ok()
  }

  /// [`Throttle::check`] at a given point in time.
  pub fn check_at(&self, line: &str, now: Instant) -> Result<(), Violation> {
    let length = line.chars().count();
    if self.config.min_length.is_some_and(|min| length < min) {
      return Err(Violation::TooShort);
    }
    if self.config.max_length.is_some_and(|max| length > max) {
      return Err(Violation::TooLong);
    }

    let mut window = self
      .window
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner());

    let expired = match window.started_at {
      None => true,
      Some(started_at) => now.saturating_duration_since(started_at) >= self.config.period,
    };
    if expired {
      window.started_at = Some(now);
      window.count = 0;
    }

    if window.count < self.config.max_messages {
      window.count += 1;
      Ok(())
    } else {
      Err(Violation::TooManyMessages)
    }
  }

  /// Number of lines admitted in the current window.
  pub fn used(&self) -> u32 {
    self
      .window
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
      .count
  }
}

static_assert_send!(Throttle);
static_assert_sync!(Throttle);

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn window_fills_then_resets() {
    let throttle = Throttle::new(ThrottleConfig::new(3, Duration::from_secs(1)));
    let t0 = Instant::now();
    let results = [0, 300, 600, 900]
      .map(|ms| throttle.admit_at("hello", t0 + Duration::from_millis(ms)));
    assert_eq!(results, [true, true, true, false]);

    assert!(throttle.admit_at("hello", t0 + Duration::from_millis(1001)));
    assert_eq!(throttle.used(), 1);
  }

  #[test]
  fn window_starts_at_first_call() {
    let throttle = Throttle::new(ThrottleConfig::new(1, Duration::from_secs(1)));
    let t0 = Instant::now();
    assert!(throttle.admit_at("a", t0 + Duration::from_secs(5)));
    assert!(!throttle.admit_at("a", t0 + Duration::from_millis(5500)));
    assert!(throttle.admit_at("a", t0 + Duration::from_secs(6)));
  }

  #[test]
  fn length_limits() {
    let throttle = Throttle::new(
      ThrottleConfig::new(10, Duration::from_secs(1))
        .min_length(2)
        .max_length(5),
    );
    assert_eq!(throttle.check("a"), Err(Violation::TooShort));
    assert_eq!(throttle.check("abcdef"), Err(Violation::TooLong));
    assert_eq!(throttle.check("abc"), Ok(()));
    // denied lines are not counted
    assert_eq!(throttle.used(), 1);
  }

  #[test]
  fn too_many_messages() {
    let throttle = Throttle::new(ThrottleConfig::new(1, Duration::from_secs(60)));
    assert_eq!(throttle.check("a"), Ok(()));
    assert_eq!(throttle.check("a"), Err(Violation::TooManyMessages));
  }

  #[test]
  fn concurrent_senders_share_the_window() {
    let throttle = std::sync::Arc::new(Throttle::new(ThrottleConfig::new(
      50,
      Duration::from_secs(3600),
    )));
    let handles = (0..8)
      .map(|_| {
        let throttle = throttle.clone();
        std::thread::spawn(move || (0..20).filter(|_| throttle.admit("x")).count())
      })
      .collect::<Vec<_>>();
    let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(admitted, 50);
  }
}

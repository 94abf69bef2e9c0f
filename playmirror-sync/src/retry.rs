//! Fixed-delay retry around remote calls.

use std::fmt::Display;
use std::time::Duration;

use playmirror_core::config::RetrySettings;

/// Call an operation up to `attempts` times, sleeping `delay` in between.
///
/// Every error is retried the same way; the last one is returned once the
/// attempts run out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetrySettings::default())
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            attempts: settings.attempts,
            delay: settings.delay(),
        }
    }
}

impl RetryPolicy {
    /// No sleeping between attempts.
    pub fn immediate(attempts: u32) -> Self {
        Self {
            attempts,
            delay: Duration::ZERO,
        }
    }

    pub fn run<T, E, F>(&self, label: &str, mut op: F) -> Result<T, E>
    where
        E: Display,
        F: FnMut() -> Result<T, E>,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) => {
                    tracing::warn!("{label} failed (attempt {attempt}/{attempts}): {e}");
                    if attempt >= attempts {
                        return Err(e);
                    }
                    attempt += 1;
                    if !self.delay.is_zero() {
                        std::thread::sleep(self.delay);
                    }
                }
            }
        }
    }
}

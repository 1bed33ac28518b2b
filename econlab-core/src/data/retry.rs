//! Fixed-count, fixed-delay retry for transient provider failures.

use std::time::Duration;

use super::provider::DataError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after the first one.
    pub max_retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    /// Run `op` until it succeeds, fails permanently, or retries run out.
    ///
    /// The last error is returned on exhaustion.
    pub fn run<T, F>(&self, label: &str, mut op: F) -> Result<T, DataError>
    where
        F: FnMut() -> Result<T, DataError>,
    {
        let mut attempt = 0;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        target: "econlab::fetch",
                        label,
                        attempt,
                        max_retries = self.max_retries,
                        error = %e,
                        "transient failure, retrying"
                    );
                    if !self.delay.is_zero() {
                        std::thread::sleep(self.delay);
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}

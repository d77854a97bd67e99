use std::time::Duration;

/// Output held back for a cosmetic delay ("analyzing..."). The underlying state
/// change has already happened; dropping or skipping this changes nothing else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deferred<T> {
    payload: Option<T>,
    remaining: Duration,
}

impl<T> Deferred<T> {
    pub fn new(payload: T, delay: Duration) -> Self {
        Self {
            payload: Some(payload),
            remaining: delay,
        }
    }

    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    pub fn is_ready(&self) -> bool {
        self.payload.is_some() && self.remaining.is_zero()
    }

    pub fn is_cancelled(&self) -> bool {
        self.payload.is_none()
    }

    /// Lets `elapsed` pass. Yields the payload once the delay has run out.
    pub fn advance(&mut self, elapsed: Duration) -> Option<T> {
        self.remaining = self.remaining.saturating_sub(elapsed);
        if self.remaining.is_zero() {
            self.payload.take()
        } else {
            None
        }
    }

    pub fn skip(&mut self) -> Option<T> {
        self.remaining = Duration::ZERO;
        self.payload.take()
    }

    pub fn cancel(&mut self) {
        self.payload = None;
    }

    pub fn peek(&self) -> Option<&T> {
        self.payload.as_ref()
    }
}

//! Resettable quiet-period timer.

use std::pin::Pin;
use std::time::Duration;

use tokio::time::{sleep_until, Instant, Sleep};

/// Fires once after `delay` has passed without a further [`Debounce::arm`].
#[derive(Debug)]
pub struct Debounce {
    delay: Duration,
    timer: Option<Pin<Box<Sleep>>>,
}

impl Debounce {
    pub fn new(delay: Duration) -> Self {
        Self { delay, timer: None }
    }

    /// Start the timer, or push an armed timer's deadline out to `now + delay`.
    pub fn arm(&mut self) {
        let deadline = Instant::now() + self.delay;
        match self.timer.as_mut() {
            Some(timer) => timer.as_mut().reset(deadline),
            None => self.timer = Some(Box::pin(sleep_until(deadline))),
        }
    }

    /// Disarm. Returns whether a timer was pending.
    pub fn cancel(&mut self) -> bool {
        self.timer.take().is_some()
    }

    pub fn is_armed(&self) -> bool {
        self.timer.is_some()
    }

    /// Resolves when the armed timer elapses, then disarms. Never resolves
    /// while disarmed, so it is safe to poll from a `select!` loop.
    pub async fn fired(&mut self) {
        match self.timer.as_mut() {
            Some(timer) => {
                timer.as_mut().await;
                self.timer = None;
            }
            None => std::future::pending::<()>().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(600);

    #[tokio::test(start_paused = true)]
    async fn fires_after_quiet_period() {
        let mut debounce = Debounce::new(DELAY);
        let start = Instant::now();
        debounce.arm();
        debounce.fired().await;
        let elapsed = start.elapsed();
        assert!(elapsed >= DELAY && elapsed < DELAY + Duration::from_millis(5));
        assert!(!debounce.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_pushes_deadline_out() {
        let mut debounce = Debounce::new(DELAY);
        let start = Instant::now();
        debounce.arm();
        for _ in 0..4 {
            tokio::time::advance(Duration::from_millis(200)).await;
            debounce.arm();
        }
        debounce.fired().await;
        let expected = Duration::from_millis(800) + DELAY;
        let elapsed = start.elapsed();
        assert!(elapsed >= expected && elapsed < expected + Duration::from_millis(5));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_never_fires() {
        let mut debounce = Debounce::new(DELAY);
        debounce.arm();
        assert!(debounce.cancel());
        assert!(!debounce.cancel());

        let fired = tokio::time::timeout(Duration::from_secs(10), debounce.fired()).await;
        assert!(fired.is_err());
    }
}

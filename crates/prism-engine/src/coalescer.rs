use std::time::Duration;

use tokio::time::Instant;

pub const DEFAULT_WINDOW: Duration = Duration::from_millis(500);

/// Trailing-edge dispatch timer.
///
/// Every `arm` pushes the deadline to `now + window`, so only the most
/// recent request within the window survives and the timer fires once per
/// quiet period. The controller's select loop sleeps on `deadline()` and
/// calls `cancel` when it fires or when an immediate dispatch preempts it.
#[derive(Debug)]
pub struct DispatchCoalescer {
    window: Duration,
    deadline: Option<Instant>,
}

impl DispatchCoalescer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    /// Arm the timer, or push an already-armed deadline further out.
    pub fn arm(&mut self) {
        self.deadline = Some(Instant::now() + self.window);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn arm_sets_deadline_one_window_out() {
        let mut c = DispatchCoalescer::new(Duration::from_millis(500));
        assert!(!c.is_armed());
        let before = Instant::now();
        c.arm();
        assert_eq!(c.deadline(), Some(before + Duration::from_millis(500)));
    }

    #[tokio::test(start_paused = true)]
    async fn rearm_pushes_deadline_out() {
        let mut c = DispatchCoalescer::new(Duration::from_millis(500));
        c.arm();
        let first = c.deadline().unwrap();

        tokio::time::advance(Duration::from_millis(300)).await;
        c.arm();
        let second = c.deadline().unwrap();
        assert_eq!(second - first, Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_clears_deadline() {
        let mut c = DispatchCoalescer::new(DEFAULT_WINDOW);
        c.arm();
        c.cancel();
        assert!(!c.is_armed());
        assert_eq!(c.deadline(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_elapses_under_paused_clock() {
        let mut c = DispatchCoalescer::new(Duration::from_millis(500));
        c.arm();
        let deadline = c.deadline().unwrap();
        tokio::time::sleep_until(deadline).await;
        assert!(Instant::now() >= deadline);
    }
}

//! Exponential backoff with jitter for the ship-side reconnect loop
//! (spec §4.3: "0.5s, doubling to a 30s cap, jitter permitted").

use std::time::Duration;

use rand::Rng;

#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    initial: Duration,
    cap: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, cap: Duration) -> Self {
        Backoff {
            initial,
            cap,
            current: initial,
        }
    }

    /// The delay to sleep before the next attempt, jittered by ±20%, with
    /// the internal state doubled (capped) for the attempt after that.
    pub fn next_delay(&mut self) -> Duration {
        let base = self.current;
        self.current = (self.current * 2).min(self.cap);

        let jitter_frac = rand::thread_rng().gen_range(0.8..1.2);
        Duration::from_secs_f64(base.as_secs_f64() * jitter_frac)
    }

    /// Resets the backoff to its initial delay, called after a successful
    /// connection so the next drop starts retrying quickly again.
    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_up_to_the_cap() {
        let mut b = Backoff::new(Duration::from_millis(500), Duration::from_secs(30));
        for _ in 0..20 {
            let d = b.next_delay();
            assert!(d <= Duration::from_secs(36)); // 30s cap + 20% jitter headroom
        }
        assert_eq!(b.current, Duration::from_secs(30));
    }

    #[test]
    fn reset_returns_to_initial() {
        let mut b = Backoff::new(Duration::from_millis(500), Duration::from_secs(30));
        b.next_delay();
        b.next_delay();
        b.reset();
        assert_eq!(b.current, Duration::from_millis(500));
    }
}

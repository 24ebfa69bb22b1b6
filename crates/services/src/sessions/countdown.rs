/// Result of one countdown tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Not armed, or already expired.
    Idle,
    Running(u32),
    /// Reached zero on this tick. Reported once per arming.
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Running,
    Expired,
}

/// One-second countdown that fires its expiry exactly once per arming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdown {
    remaining: u32,
    state: State,
}

impl Default for Countdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Countdown {
    #[must_use]
    pub fn new() -> Self {
        Self {
            remaining: 0,
            state: State::Idle,
        }
    }

    pub fn arm(&mut self, secs: u32) {
        self.remaining = secs;
        self.state = State::Running;
    }

    pub fn stop(&mut self) {
        self.state = State::Idle;
    }

    pub fn tick(&mut self) -> Tick {
        if self.state != State::Running {
            return Tick::Idle;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.state = State::Expired;
            Tick::Expired
        } else {
            Tick::Running(self.remaining)
        }
    }

    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state == State::Running
    }

    #[must_use]
    pub fn has_expired(&self) -> bool {
        self.state == State::Expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expires_once_then_stays_idle() {
        let mut countdown = Countdown::new();
        countdown.arm(3);
        assert_eq!(countdown.tick(), Tick::Running(2));
        assert_eq!(countdown.tick(), Tick::Running(1));
        assert_eq!(countdown.tick(), Tick::Expired);
        for _ in 0..5 {
            assert_eq!(countdown.tick(), Tick::Idle);
        }
        assert!(countdown.has_expired());
        assert_eq!(countdown.remaining(), 0);
    }

    #[test]
    fn unarmed_and_stopped_countdowns_do_nothing() {
        let mut countdown = Countdown::new();
        assert_eq!(countdown.tick(), Tick::Idle);
        countdown.arm(10);
        countdown.stop();
        assert_eq!(countdown.tick(), Tick::Idle);
        assert_eq!(countdown.remaining(), 10);
    }

    #[test]
    fn rearming_resets_expiry() {
        let mut countdown = Countdown::new();
        countdown.arm(1);
        assert_eq!(countdown.tick(), Tick::Expired);
        countdown.arm(2);
        assert!(countdown.is_running());
        assert_eq!(countdown.tick(), Tick::Running(1));
        assert_eq!(countdown.tick(), Tick::Expired);
    }
}

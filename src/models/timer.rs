/// Countdown for a focus session, advanced by the session loop's ticks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusTimer {
    total_seconds: u64,
    elapsed_seconds: u64,
    paused: bool,
}

impl FocusTimer {
    pub fn new(total_seconds: u64) -> Self {
        Self {
            total_seconds,
            elapsed_seconds: 0,
            paused: false,
        }
    }

    /// Advances the countdown; returns true once the planned duration is reached.
    /// Ignored while paused.
    pub fn tick(&mut self, seconds: u64) -> bool {
        if !self.paused {
            self.elapsed_seconds = self
                .elapsed_seconds
                .saturating_add(seconds)
                .min(self.total_seconds);
        }
        self.is_finished()
    }

    /// Returns false if the timer was already paused.
    pub fn pause(&mut self) -> bool {
        if self.paused {
            return false;
        }
        self.paused = true;
        true
    }

    /// Returns false if the timer was not paused.
    pub fn resume(&mut self) -> bool {
        if !self.paused {
            return false;
        }
        self.paused = false;
        true
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed_seconds >= self.total_seconds
    }

    pub fn total_seconds(&self) -> u64 {
        self.total_seconds
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.total_seconds - self.elapsed_seconds
    }

    pub fn progress(&self) -> f64 {
        if self.total_seconds == 0 {
            return 1.0;
        }
        self.elapsed_seconds as f64 / self.total_seconds as f64
    }

    pub fn formatted_remaining(&self) -> String {
        format_time(self.remaining_seconds())
    }
}

/// Formats seconds as `H:MM:SS`.
pub fn format_time(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{}:{:02}:{:02}", hours, minutes, secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_until_finished() {
        let mut timer = FocusTimer::new(3);
        assert!(!timer.tick(1));
        assert!(!timer.tick(1));
        assert!(timer.tick(1));
        assert_eq!(timer.remaining_seconds(), 0);
        assert!(timer.tick(1));
        assert_eq!(timer.elapsed_seconds(), 3);
    }

    #[test]
    fn test_pause_freezes_elapsed_time() {
        let mut timer = FocusTimer::new(60);
        timer.tick(5);
        assert!(timer.pause());
        assert!(!timer.pause());
        timer.tick(5);
        assert_eq!(timer.elapsed_seconds(), 5);

        assert!(timer.resume());
        assert!(!timer.resume());
        timer.tick(5);
        assert_eq!(timer.elapsed_seconds(), 10);
        assert_eq!(timer.remaining_seconds(), 50);
    }

    #[test]
    fn test_progress() {
        let mut timer = FocusTimer::new(200);
        timer.tick(50);
        assert!((timer.progress() - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0), "0:00:00");
        assert_eq!(format_time(1500), "0:25:00");
        assert_eq!(format_time(3725), "1:02:05");
    }
}

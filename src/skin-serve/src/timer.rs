use chrono::{DateTime, Duration, Utc};
use log::{debug, info};

/// Wall-clock timer for the phases of a request. Start/stop pairs are
/// logged at info level with the elapsed milliseconds.
pub struct Timer {
    name: String,
    started: Option<DateTime<Utc>>,
    elapsed: Option<Duration>,
}

impl Timer {
    pub fn new(name: &str) -> Self {
        Timer {
            name: name.to_owned(),
            started: None,
            elapsed: None,
        }
    }

    /// Create a timer that is already running.
    pub fn new_start(name: &str) -> Self {
        let mut t = Timer::new(name);
        t.start();
        t
    }

    pub fn start(&mut self) {
        info!("{}: starting", self.name);

        self.started = Some(Utc::now());
        self.elapsed = None;
    }

    pub fn stop(&mut self) {
        match self.started.take() {
            None => debug!("{}: not running", self.name),
            Some(started) => {
                let d = Utc::now() - started;

                self.elapsed = Some(d);
                info!("{}: {} msec", self.name, d.num_milliseconds());
            }
        }
    }

    /// Elapsed milliseconds of the last completed start/stop pair.
    pub fn elapsed_ms(&self) -> i64 {
        self.elapsed.map_or(0, |d| d.num_milliseconds())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_without_start_keeps_zero_elapsed() {
        let mut t = Timer::new("idle");
        t.stop();
        assert_eq!(t.elapsed_ms(), 0);
    }

    #[test]
    fn start_stop_records_elapsed() {
        let mut t = Timer::new_start("work");
        t.stop();
        assert!(t.elapsed_ms() >= 0);
    }
}

use std::time::{Duration, Instant};

pub struct Timeline {
    start_time: Instant,
    previous_frame_time: Instant,
    previous_frame_duration: Duration,
    frame: u64,
}

impl Default for Timeline {
    fn default() -> Self {
        Timeline::new()
    }
}

impl Timeline {
    pub fn new() -> Timeline {
        Timeline {
            start_time: Instant::now(),
            previous_frame_time: Instant::now(),
            previous_frame_duration: Duration::from_secs(0),
            frame: 0,
        }
    }

    /// Notify the timeline that we've ended the current frame and proceeding to the next.
    pub fn next_frame(&mut self) -> &mut Self {
        let now = Instant::now();
        let duration = now.duration_since(self.previous_frame_time);
        self.previous_frame_time = now;
        self.previous_frame_duration = duration;
        self.frame += 1;
        self
    }

    /// Returns the number of the current frame
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Returns the duration of the last frame
    pub fn previous_frame_duration(&self) -> Duration {
        self.previous_frame_duration
    }

    /// Returns the duration of the last frame in fractional seconds
    pub fn previous_frame_time(&self) -> f32 {
        self.previous_frame_duration.as_secs_f32()
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_are_counted() {
        let mut timeline = Timeline::new();
        assert_eq!(timeline.frame(), 0);
        timeline.next_frame().next_frame();
        assert_eq!(timeline.frame(), 2);
        assert!(timeline.previous_frame_time() >= 0.0);
    }
}

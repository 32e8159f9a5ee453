#[cfg(test)]
#[path = "cadence_test.rs"]
mod tests;

/// Counter half of the screenshot cadence. The coordinator's interval drives
/// it: ticks that land while a capture is still in flight are dropped, never
/// queued, and only successful uploads advance the proactive counter.
#[derive(Default)]
pub struct ScreenshotCadence {
    capturing: bool,
    counter: u32,
}

impl ScreenshotCadence {
    /// Claims the tick. Returns false when a capture is already in flight,
    /// in which case this tick is skipped entirely.
    pub fn begin_capture(&mut self) -> bool {
        if self.capturing {
            return false;
        }

        self.capturing = true;

        return true;
    }

    /// Records the capture/upload outcome. Returns true when the proactive
    /// threshold was reached; the counter resets at the threshold whether or
    /// not the caller ends up dispatching.
    pub fn finish_capture(&mut self, success: bool, threshold: u32) -> bool {
        self.capturing = false;
        if !success {
            return false;
        }

        self.counter += 1;
        if threshold > 0 && self.counter >= threshold {
            self.counter = 0;
            return true;
        }

        return false;
    }

    pub fn reset(&mut self) {
        self.capturing = false;
        self.counter = 0;
    }
}

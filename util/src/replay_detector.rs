#[cfg(test)]
mod replay_detector_test;

/// Window-based replay detector used by the DTLS record layer and SRTP
/// contexts. `check` tentatively admits an index; `commit` moves it into
/// the window. Callers only commit after the packet authenticates, so
/// forged indexes never advance the window.
pub struct SlidingWindowDetector {
    accepted: bool,
    latest_seq: u64,
    max_seq: u64,
    window_size: u64,
    mask: u128,
    started: bool,
}

impl SlidingWindowDetector {
    /// `max_seq` is the largest admissible sequence number (e.g. 2^48-1 for
    /// DTLS records, 2^31-1 for SRTCP indexes).
    pub fn new(window_size: u64, max_seq: u64) -> Self {
        SlidingWindowDetector {
            accepted: false,
            latest_seq: 0,
            max_seq,
            window_size: window_size.min(128),
            mask: 0,
            started: false,
        }
    }

    /// Returns whether `seq` may be accepted. Call `commit` after the
    /// packet passes authentication.
    pub fn check(&mut self, seq: u64) -> bool {
        self.accepted = false;
        if seq > self.max_seq {
            return false;
        }
        if self.started {
            if seq <= self.latest_seq {
                let diff = self.latest_seq - seq;
                if diff >= self.window_size {
                    return false;
                }
                if self.mask & (1u128 << diff) != 0 {
                    // already seen
                    return false;
                }
            }
        }
        self.accepted = true;
        true
    }

    /// Commits the last checked sequence number into the window.
    pub fn commit(&mut self, seq: u64) {
        if !self.accepted || seq > self.max_seq {
            return;
        }
        if !self.started || seq > self.latest_seq {
            let shift = if self.started { seq - self.latest_seq } else { 0 };
            if shift >= 128 {
                self.mask = 0;
            } else {
                self.mask <<= shift;
            }
            self.mask |= 1;
            self.latest_seq = seq;
        } else {
            let diff = self.latest_seq - seq;
            self.mask |= 1u128 << diff;
        }
        self.started = true;
        self.accepted = false;
    }
}

/// Detector that admits everything; used before keys are in place.
#[derive(Default)]
pub struct NoOpDetector;

impl NoOpDetector {
    pub fn check(&mut self, _seq: u64) -> bool {
        true
    }

    pub fn commit(&mut self, _seq: u64) {}
}

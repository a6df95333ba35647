//! Request sequencing so callers can drop superseded results

/// Monotonic request counter.
///
/// The core never cancels work; a caller that fires overlapping requests
/// numbers each one with [`next`](Sequencer::next) or feeds incoming numbers
/// to [`observe`](Sequencer::observe) and discards anything that is no longer
/// current.
#[derive(Debug, Default)]
pub struct Sequencer {
    latest: u64,
}

impl Sequencer {
    pub fn new() -> Self {
        Sequencer { latest: 0 }
    }

    /// Issue the next sequence number.
    pub fn next(&mut self) -> u64 {
        self.latest += 1;
        self.latest
    }

    /// Record an externally issued sequence number. Returns `false` when it
    /// is not newer than one already seen, i.e. the request is stale.
    pub fn observe(&mut self, sequence: u64) -> bool {
        if sequence > self.latest {
            self.latest = sequence;
            true
        } else {
            false
        }
    }

    pub fn is_current(&self, sequence: u64) -> bool {
        sequence == self.latest
    }

    /// Get current sequence number.
    pub fn latest(&self) -> u64 {
        self.latest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_supersedes_previous() {
        let mut seq = Sequencer::new();
        let first = seq.next();
        let second = seq.next();
        assert!(second > first);
        assert!(!seq.is_current(first));
        assert!(seq.is_current(second));
    }

    #[test]
    fn test_observe_rejects_stale() {
        let mut seq = Sequencer::new();
        assert!(seq.observe(3));
        assert!(!seq.observe(2));
        assert!(!seq.observe(3));
        assert!(seq.observe(7));
        assert_eq!(seq.latest(), 7);
        assert_eq!(seq.next(), 8);
    }
}

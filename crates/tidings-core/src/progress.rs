//! Progress value bookkeeping
//!
//! Raw values from the engine are clamped into `0..=100` and never allowed
//! to go backwards within one subject's lifetime.

/// Non-decreasing percentage for one subject or sub-phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressTracker {
    last: Option<u8>,
}

impl ProgressTracker {
    /// Forget the previous subject; the next value starts from scratch.
    pub fn reset(&mut self) {
        self.last = None;
    }

    /// Last accepted value, if any.
    pub fn last(&self) -> Option<u8> {
        self.last
    }

    /// Accept a raw value and return the percentage to display.
    pub fn advance(&mut self, raw: i32) -> u8 {
        let clamped = raw.clamp(0, 100) as u8;
        if clamped as i32 != raw {
            tracing::warn!(raw, clamped, "progress value out of range");
        }
        let value = match self.last {
            Some(last) if clamped < last => {
                tracing::warn!(last, value = clamped, "progress went backwards; holding");
                last
            }
            _ => clamped,
        };
        tracing::trace!(value, "progress");
        self.last = Some(value);
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamps_out_of_range() {
        let mut p = ProgressTracker::default();
        assert_eq!(p.advance(-5), 0);
        assert_eq!(p.advance(250), 100);
    }

    #[test]
    fn test_never_decreases() {
        let mut p = ProgressTracker::default();
        let seen: Vec<u8> = [10, 40, 30, 40, 90, 5]
            .into_iter()
            .map(|v| p.advance(v))
            .collect();
        assert_eq!(seen, vec![10, 40, 40, 40, 90, 90]);
    }

    #[test]
    fn test_reset_starts_over() {
        let mut p = ProgressTracker::default();
        p.advance(80);
        p.reset();
        assert_eq!(p.last(), None);
        assert_eq!(p.advance(10), 10);
    }
}

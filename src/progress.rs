//! Progress observation for long-running operations.
//!
//! Reads report once per decoded point; image binding reports once per
//! camera. Returning `false` from `check_status` cancels the operation at
//! the next step boundary.

pub trait Progress {
    fn set_text(&mut self, _text: &str) {}

    fn set_maximum_steps(&mut self, _steps: usize) {}

    /// Called after each completed step. `false` cancels.
    fn check_status(&mut self) -> bool {
        true
    }
}

/// Counts steps and cancels after `limit` of them, if set.
#[derive(Debug, Clone, Default)]
pub struct StepCounter {
    pub text: String,
    pub maximum: usize,
    pub steps: usize,
    pub limit: Option<usize>,
}

impl StepCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel_after(limit: usize) -> Self {
        Self { limit: Some(limit), ..Self::default() }
    }
}

impl Progress for StepCounter {
    fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
    }

    fn set_maximum_steps(&mut self, steps: usize) {
        self.maximum = steps;
    }

    fn check_status(&mut self) -> bool {
        self.steps += 1;
        self.limit.is_none_or(|limit| self.steps < limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_counter_cancels() {
        let mut p = StepCounter::cancel_after(2);
        assert!(p.check_status());
        assert!(!p.check_status());
        assert_eq!(p.steps, 2);

        let mut p = StepCounter::new();
        assert!((0..10).all(|_| p.check_status()));
    }
}

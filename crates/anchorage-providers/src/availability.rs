use std::collections::VecDeque;

use anchorage_core::availability::{Availability, AvailabilityProbe};

/// Probe that replays a fixed sequence of answers. The last answer repeats
/// once the script runs out.
#[derive(Debug, Clone)]
pub struct ScriptedAvailability {
    answers: VecDeque<Availability>,
    last: Availability,
}

impl ScriptedAvailability {
    pub fn new(answers: impl IntoIterator<Item = Availability>) -> Self {
        let answers: VecDeque<_> = answers.into_iter().collect();
        let last = answers
            .back()
            .copied()
            .unwrap_or(Availability::UnknownError);
        Self { answers, last }
    }

    /// Reports `UnknownChecking` `checks` times, then `answer`.
    pub fn after(checks: usize, answer: Availability) -> Self {
        Self::new(
            std::iter::repeat_n(Availability::UnknownChecking, checks)
                .chain(std::iter::once(answer)),
        )
    }
}

impl AvailabilityProbe for ScriptedAvailability {
    fn check(&mut self) -> Availability {
        self.answers.pop_front().unwrap_or(self.last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeats_the_last_answer() {
        let mut probe = ScriptedAvailability::after(1, Availability::SupportedInstalled);
        assert_eq!(probe.check(), Availability::UnknownChecking);
        assert_eq!(probe.check(), Availability::SupportedInstalled);
        assert_eq!(probe.check(), Availability::SupportedInstalled);
    }

    #[test]
    fn empty_script_reports_an_error() {
        let mut probe = ScriptedAvailability::new([]);
        assert_eq!(probe.check(), Availability::UnknownError);
    }
}

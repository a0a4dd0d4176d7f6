use std::fmt::Debug;

use statesort::{DeviceCommand, Transition, TransitionCounts};

/// Field of [`TransitionCounts`] an expectation looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    StateSetApplies,
    StateSetPushes,
    StateSetPops,
    ProgramBinds,
    AttributeChanges,
    ModelUploads,
    ViewUploads,
    ProjectionUploads,
    ElidedTransitions,
    ElidedMatrixUpdates,
    Draws,
}

impl Counter {
    fn read(self, counts: &TransitionCounts) -> u64 {
        match self {
            Counter::StateSetApplies => counts.state_set_applies,
            Counter::StateSetPushes => counts.state_set_pushes,
            Counter::StateSetPops => counts.state_set_pops,
            Counter::ProgramBinds => counts.program_binds,
            Counter::AttributeChanges => counts.attribute_changes,
            Counter::ModelUploads => counts.model_uploads,
            Counter::ViewUploads => counts.view_uploads,
            Counter::ProjectionUploads => counts.projection_uploads,
            Counter::ElidedTransitions => counts.elided_transitions,
            Counter::ElidedMatrixUpdates => counts.elided_matrix_updates,
            Counter::Draws => counts.draws,
        }
    }
}

/// A single counter expectation to validate after a frame.
pub struct CountExpectation {
    pub counter: Counter,
    pub expected: u64,
    /// Human-readable label for failure messages.
    pub label: &'static str,
}

impl CountExpectation {
    pub fn new(counter: Counter, expected: u64, label: &'static str) -> Self {
        Self {
            counter,
            expected,
            label,
        }
    }
}

/// Validates counter expectations against the counts of one frame.
///
/// Returns a list of human-readable failure descriptions. An empty list means
/// all expectations passed.
pub fn check_counts(counts: &TransitionCounts, expectations: &[CountExpectation]) -> Vec<String> {
    expectations
        .iter()
        .filter_map(|expectation| {
            let actual = expectation.counter.read(counts);
            (actual != expectation.expected).then(|| {
                format!(
                    "[{}] {:?} expected {} but got {}",
                    expectation.label, expectation.counter, expectation.expected, actual
                )
            })
        })
        .collect()
}

/// Compares a recorded transition journal entry by entry.
pub fn check_journal(actual: &[Transition], expected: &[Transition]) -> Vec<String> {
    check_sequence("journal", actual, expected)
}

/// Compares a recorded device command stream entry by entry.
pub fn check_commands(actual: &[DeviceCommand], expected: &[DeviceCommand]) -> Vec<String> {
    check_sequence("commands", actual, expected)
}

fn check_sequence<T: PartialEq + Debug>(label: &str, actual: &[T], expected: &[T]) -> Vec<String> {
    let mut failures = Vec::new();

    for (index, (actual_entry, expected_entry)) in actual.iter().zip(expected).enumerate() {
        if actual_entry != expected_entry {
            failures.push(format!(
                "[{label}] entry {index} expected {expected_entry:?} but got {actual_entry:?}"
            ));
        }
    }

    if actual.len() != expected.len() {
        failures.push(format!(
            "[{label}] expected {} entries but got {}",
            expected.len(),
            actual.len(),
        ));
        let extra = if actual.len() > expected.len() {
            &actual[expected.len()..]
        } else {
            &expected[actual.len()..]
        };
        for entry in extra {
            failures.push(format!("[{label}]   unmatched {entry:?}"));
        }
    }

    failures
}

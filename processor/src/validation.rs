use alloc::vec::Vec;

use quill_core::cause::NonEmpty;

// VALIDATION
// ================================================================================================

/// The accumulated view of a run's outcome: the final log together with either the success
/// value or every error leaf of the failure cause.
///
/// The error list is non-empty by construction, since a failure cause always carries at least
/// one leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation<W, E, A> {
    Success { log: Vec<W>, value: A },
    Failure { log: Vec<W>, errors: NonEmpty<E> },
}

impl<W, E, A> Validation<W, E, A> {
    /// Returns true if the run succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Validation::Success { .. })
    }

    /// Returns the final log, which is produced on both outcomes.
    pub fn log(&self) -> &[W] {
        match self {
            Validation::Success { log, .. } | Validation::Failure { log, .. } => log,
        }
    }

    /// Splits the validation into the log and a plain result.
    pub fn into_result(self) -> (Vec<W>, Result<A, NonEmpty<E>>) {
        match self {
            Validation::Success { log, value } => (log, Ok(value)),
            Validation::Failure { log, errors } => (log, Err(errors)),
        }
    }
}

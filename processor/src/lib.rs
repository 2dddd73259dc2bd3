#![no_std]

#[macro_use]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

use alloc::{rc::Rc, vec::Vec};
use core::convert::Infallible;

use quill_core::instruction::{retype_cause, unbox_value};
use tracing::instrument;

use crate::machine::Machine;

mod continuation_stack;
mod machine;
mod validation;

#[cfg(test)]
mod tests;

// RE-EXPORTS
// ================================================================================================

pub use quill_core::{Cause, Effect, NonEmpty, RuntimeFlag};
pub use validation::Validation;

// RUN OUTPUT
// ================================================================================================

/// The outcome of one run: the final log, and either the failure cause or the output state
/// paired with the success value.
///
/// The log is produced on both outcomes; which entries it retains around failed fold scopes is
/// governed by the clear-log-on-error flag.
#[derive(Debug)]
pub struct RunOutput<W, S, E, A> {
    pub log: Vec<W>,
    pub result: Result<(S, A), Cause<E>>,
}

impl<W, S, E, A> RunOutput<W, S, E, A> {
    /// Splits the output into the log and the result.
    pub fn into_parts(self) -> (Vec<W>, Result<(S, A), Cause<E>>) {
        (self.log, self.result)
    }
}

// EXECUTORS
// ================================================================================================

/// Runs the effect against the given initial state and returns the full outcome: the final
/// log, and either the failure cause or the output state paired with the success value.
///
/// This is the general entry point every other run variant specializes. The effect must be
/// closed over its environment (`R = ()`); use [Effect::provide] to discharge a requirement.
/// The run is strictly sequential and owns its interpreter stacks; host stack usage is
/// constant in the nesting depth of the tree.
#[instrument(skip_all)]
pub fn run_all<W, S, E, A>(effect: Effect<W, S, (), E, A>, initial: S) -> RunOutput<W, S, E, A>
where
    W: 'static,
    S: 'static,
    E: 'static,
    A: 'static,
{
    let machine = Machine::new(Rc::new(initial), Rc::new(()));
    let (log, outcome) = machine.run(effect.into_instruction());
    let result = match outcome {
        Ok((state, value)) => {
            let state = state
                .downcast::<S>()
                .ok()
                .expect("interpreter invariant: state slot does not have the expected type");
            let state = Rc::try_unwrap(state)
                .ok()
                .expect("interpreter invariant: state slot still shared at termination");
            Ok((state, unbox_value::<A>(value)))
        },
        Err(cause) => Err(retype_cause::<E>(cause)),
    };
    RunOutput { log, result }
}

/// Runs an infallible effect, returning the output state and the success value.
///
/// Infallibility is a type-level guarantee: the error channel is [Infallible], so the failure
/// branch cannot be reached.
#[instrument(skip_all)]
pub fn run<W, S, A>(effect: Effect<W, S, (), Infallible, A>, initial: S) -> (S, A)
where
    W: 'static,
    S: 'static,
    A: 'static,
{
    match run_all(effect, initial).result {
        Ok(output) => output,
        Err(cause) => match cause.into_first() {},
    }
}

/// Runs the effect, surfacing the failure cause instead of requiring infallibility.
///
/// The log is discarded; use [run_all] to observe it alongside the cause.
pub fn try_run<W, S, E, A>(effect: Effect<W, S, (), E, A>, initial: S) -> Result<(S, A), Cause<E>>
where
    W: 'static,
    S: 'static,
    E: 'static,
    A: 'static,
{
    run_all(effect, initial).result
}

/// Runs the effect and projects the outcome to a plain result, keeping only the leftmost
/// error leaf of a failure cause.
pub fn run_either<W, S, E, A>(effect: Effect<W, S, (), E, A>, initial: S) -> Result<A, E>
where
    W: 'static,
    S: 'static,
    E: 'static,
    A: 'static,
{
    run_all(effect, initial).result.map(|(_, value)| value).map_err(Cause::into_first)
}

/// Runs an infallible effect, returning the final log and the success value.
pub fn run_log<W, S, A>(effect: Effect<W, S, (), Infallible, A>, initial: S) -> (Vec<W>, A)
where
    W: 'static,
    S: 'static,
    A: 'static,
{
    let output = run_all(effect, initial);
    match output.result {
        Ok((_, value)) => (output.log, value),
        Err(cause) => match cause.into_first() {},
    }
}

/// Runs the effect and returns the accumulated view of the outcome: the final log with the
/// success value, or the final log with every error leaf of the failure cause in order.
pub fn run_validation<W, S, E, A>(effect: Effect<W, S, (), E, A>, initial: S) -> Validation<W, E, A>
where
    W: 'static,
    S: 'static,
    E: 'static,
    A: 'static,
{
    let output = run_all(effect, initial);
    match output.result {
        Ok((_, value)) => Validation::Success { log: output.log, value },
        Err(cause) => Validation::Failure { log: output.log, errors: cause.into_leaves() },
    }
}

/// Lifts a run into the host async runtime.
///
/// The interpreter itself stays synchronous: the effect runs to completion on the polling
/// task, and the returned future resolves immediately with the outcome. The bridge is never
/// re-entered from within another effect's continuation.
pub async fn run_async<W, S, E, A>(effect: Effect<W, S, (), E, A>, initial: S) -> RunOutput<W, S, E, A>
where
    W: 'static,
    S: 'static,
    E: 'static,
    A: 'static,
{
    run_all(effect, initial)
}

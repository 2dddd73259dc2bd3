//! Behavioral tests for the interpreter.
//!
//! Each test module focuses on one slice of the interpreter's contract:
//! - [state_tests] - state threading through `modify` and friends
//! - [log_tests] - log ordering and the retention protocol around failed scopes
//! - [recovery_tests] - failure unwinding, fold resolution, and cause composition
//! - [environment_tests] - environment installation and shadowing
//! - [facade_tests] - the run variants and the validation/async bridges
//! - [laws] - universally quantified properties over generated programs

pub(super) mod laws;
pub(super) mod recovery_tests;

// Re-export common utilities for all test modules
pub(super) use alloc::vec::Vec;

pub(super) use pretty_assertions::assert_eq;
pub(super) use quill_core::{
    Cause, Effect, access, fail, get, halt, log, modify, set, succeed, update,
};

pub(super) use crate::{
    Validation, run, run_all, run_either, run_log, run_validation, try_run,
};

/// The effect shape most tests use: string log entries, an integer state, a closed
/// environment, and string errors.
pub(super) type TestEffect<A = i64> = Effect<&'static str, i64, (), &'static str, A>;

/// Runs `effect` from the given state and asserts a successful outcome.
pub(super) fn assert_success<A>(
    effect: TestEffect<A>,
    initial: i64,
    expected_log: &[&'static str],
    expected_state: i64,
    expected_value: A,
) where
    A: core::fmt::Debug + PartialEq + 'static,
{
    let output = run_all(effect, initial);
    assert_eq!(output.log, expected_log);
    assert_eq!(output.result, Ok((expected_state, expected_value)));
}

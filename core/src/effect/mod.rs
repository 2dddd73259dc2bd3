use alloc::{boxed::Box, rc::Rc};
use core::marker::PhantomData;

use crate::{
    cause::Cause,
    instruction::{
        ErasedEnv, ErasedState, ErasedValue, Instruction, RuntimeFlag, erase_cause, retype_cause,
        unbox_value,
    },
};

mod combinators;
pub use combinators::{collect_all, for_each, repeat_n, repeat_until};

// EFFECT
// ================================================================================================

/// A description of a computation carrying six channels: an append-only log of `W` entries, a
/// state threaded from input to output (both of type `S`), a read-only environment `R`, a
/// structured error channel `E`, and a success value `A`.
///
/// An effect is an immutable tree of instructions; nothing runs until the tree is handed to an
/// interpreter, which folds it into `(log, error | (state, value))`. Building an effect never
/// observes state, environment, or log.
///
/// Continuations inside the tree are `FnOnce`, so a tree is consumed by the run that interprets
/// it; re-running a computation means describing it again.
pub struct Effect<W, S, R, E, A> {
    instruction: Instruction<W>,
    _types: PhantomData<(fn(S) -> S, fn(R), fn() -> E, fn() -> A)>,
}

impl<W, S, R, E, A> Effect<W, S, R, E, A>
where
    W: 'static,
    S: 'static,
    R: 'static,
    E: 'static,
    A: 'static,
{
    // CONVERSIONS
    // --------------------------------------------------------------------------------------------

    pub(crate) fn from_instruction(instruction: Instruction<W>) -> Self {
        Self { instruction, _types: PhantomData }
    }

    /// Consumes the effect and returns the underlying instruction tree.
    ///
    /// This is the hand-off point to an interpreter; user code has no reason to call it.
    pub fn into_instruction(self) -> Instruction<W> {
        self.instruction
    }

    // SEQUENCING PRIMITIVES
    // --------------------------------------------------------------------------------------------

    /// Runs this effect and feeds its success value to `k` to obtain the next effect.
    ///
    /// Failures bypass `k` and propagate to the nearest enclosing [Effect::fold_cause].
    pub fn and_then<B, F>(self, k: F) -> Effect<W, S, R, E, B>
    where
        B: 'static,
        F: FnOnce(A) -> Effect<W, S, R, E, B> + 'static,
    {
        Effect::from_instruction(Instruction::AndThen(
            Box::new(self.instruction),
            Box::new(move |value| k(unbox_value::<A>(value)).into_instruction()),
        ))
    }

    /// Runs this effect and hands its outcome — the full failure cause or the success value —
    /// to the matching handler.
    ///
    /// This is the only way to intercept a failure. The span of the wrapped effect is also a
    /// log-retention scope: entries recorded inside it are merged into the enclosing scope when
    /// the fold resolves, or discarded on the failure path when the clear-log-on-error flag is
    /// set. On the failure path the state is restored to its value at fold entry; on the
    /// success path the wrapped effect's output state is kept.
    pub fn fold_cause<E2, B, FE, FA>(self, on_cause: FE, on_success: FA) -> Effect<W, S, R, E2, B>
    where
        E2: 'static,
        B: 'static,
        FE: FnOnce(Cause<E>) -> Effect<W, S, R, E2, B> + 'static,
        FA: FnOnce(A) -> Effect<W, S, R, E2, B> + 'static,
    {
        Effect::from_instruction(Instruction::Fold(
            Box::new(self.instruction),
            Box::new(move |cause| on_cause(retype_cause::<E>(cause)).into_instruction()),
            Box::new(move |value| on_success(unbox_value::<A>(value)).into_instruction()),
        ))
    }

    // ENVIRONMENT PRIMITIVES
    // --------------------------------------------------------------------------------------------

    /// Runs this effect with `environment` installed as its environment.
    ///
    /// The environment requirement is discharged, so the caller picks a fresh `R2` for the
    /// result (typically `()` so the effect can be run, or the enclosing environment type when
    /// nested under another `provide`). The installed environment shadows any enclosing one for
    /// exactly the span of this effect.
    pub fn provide<R2>(self, environment: R) -> Effect<W, S, R2, E, A>
    where
        R2: 'static,
    {
        Effect::from_instruction(Instruction::Provide(
            Rc::new(environment) as ErasedEnv,
            Box::new(self.instruction),
        ))
    }

    // FLAG PRIMITIVES
    // --------------------------------------------------------------------------------------------

    /// Installs `value` for the given interpreter flag for the duration of this effect.
    pub fn with_flag(self, flag: RuntimeFlag, value: bool) -> Self {
        Effect::from_instruction(Instruction::Flag(flag, value, Box::new(self.instruction)))
    }

    /// Discards log entries recorded by this effect if it fails.
    ///
    /// The discard covers exactly this effect's span; entries recorded outside it are
    /// unaffected.
    pub fn clear_log_on_error(self) -> Self {
        self.with_flag(RuntimeFlag::ClearLogOnError, true)
    }

    /// Keeps log entries recorded by this effect even if it fails, overriding an enclosing
    /// [Effect::clear_log_on_error].
    pub fn keep_log_on_error(self) -> Self {
        self.with_flag(RuntimeFlag::ClearLogOnError, false)
    }
}

// CONSTRUCTORS
// ================================================================================================

/// Returns an effect that succeeds with `value`, leaving the state untouched.
pub fn succeed<W, S, R, E, A>(value: A) -> Effect<W, S, R, E, A>
where
    W: 'static,
    S: 'static,
    R: 'static,
    E: 'static,
    A: 'static,
{
    Effect::from_instruction(Instruction::Succeed(Box::new(value)))
}

/// Returns an effect that succeeds with the unit value.
pub fn unit<W, S, R, E>() -> Effect<W, S, R, E, ()>
where
    W: 'static,
    S: 'static,
    R: 'static,
    E: 'static,
{
    succeed(())
}

/// Returns an effect that fails with a single error, leaving the state untouched.
pub fn fail<W, S, R, E, A>(error: E) -> Effect<W, S, R, E, A>
where
    W: 'static,
    S: 'static,
    R: 'static,
    E: 'static,
    A: 'static,
{
    halt(Cause::single(error))
}

/// Returns an effect that fails with the given cause verbatim.
pub fn halt<W, S, R, E, A>(cause: Cause<E>) -> Effect<W, S, R, E, A>
where
    W: 'static,
    S: 'static,
    R: 'static,
    E: 'static,
    A: 'static,
{
    Effect::from_instruction(Instruction::Fail(erase_cause(cause)))
}

/// Returns an effect that atomically transitions the state with `f`, succeeding with the value
/// `f` produces alongside the new state. Never fails.
///
/// `S: Clone` because the interpreter shares the state slot with fold-entry snapshots; the
/// clone only happens when a snapshot is live, otherwise the state is moved.
pub fn modify<W, S, R, E, A, F>(f: F) -> Effect<W, S, R, E, A>
where
    W: 'static,
    S: Clone + 'static,
    R: 'static,
    E: 'static,
    A: 'static,
    F: FnOnce(S) -> (S, A) + 'static,
{
    Effect::from_instruction(Instruction::Modify(Box::new(move |state: ErasedState| {
        let state = state
            .downcast::<S>()
            .ok()
            .expect("interpreter invariant: state slot does not have the expected type");
        let state = Rc::try_unwrap(state).unwrap_or_else(|shared| (*shared).clone());
        let (next, value) = f(state);
        (Rc::new(next) as ErasedState, Box::new(value) as ErasedValue)
    })))
}

/// Returns an effect that succeeds with the current state.
pub fn get<W, S, R, E>() -> Effect<W, S, R, E, S>
where
    W: 'static,
    S: Clone + 'static,
    R: 'static,
    E: 'static,
{
    modify(|state: S| (state.clone(), state))
}

/// Returns an effect that replaces the state with `state`.
pub fn set<W, S, R, E>(state: S) -> Effect<W, S, R, E, ()>
where
    W: 'static,
    S: 'static,
    R: 'static,
    E: 'static,
{
    // the previous state is dropped unread, so no Clone bound is needed here
    Effect::from_instruction(Instruction::Modify(Box::new(move |_| {
        (Rc::new(state) as ErasedState, Box::new(()) as ErasedValue)
    })))
}

/// Returns an effect that transforms the state with `f`.
pub fn update<W, S, R, E, F>(f: F) -> Effect<W, S, R, E, ()>
where
    W: 'static,
    S: Clone + 'static,
    R: 'static,
    E: 'static,
    F: FnOnce(S) -> S + 'static,
{
    modify(move |state| (f(state), ()))
}

/// Returns an effect that appends one entry to the log, succeeding with the unit value.
pub fn log<W, S, R, E>(entry: W) -> Effect<W, S, R, E, ()>
where
    W: 'static,
    S: 'static,
    R: 'static,
    E: 'static,
{
    Effect::from_instruction(Instruction::Log(entry))
}

/// Returns an effect that reads the current environment and succeeds with `f` applied to it.
pub fn access<W, S, R, E, A, F>(f: F) -> Effect<W, S, R, E, A>
where
    W: 'static,
    S: 'static,
    R: 'static,
    E: 'static,
    A: 'static,
    F: FnOnce(&R) -> A + 'static,
{
    Effect::from_instruction(Instruction::Access(Box::new(move |env: ErasedEnv| {
        let env = env
            .downcast::<R>()
            .ok()
            .expect("interpreter invariant: environment does not have the expected type");
        Instruction::Succeed(Box::new(f(&env)))
    })))
}

/// Returns an effect that reads the current environment and delegates to the effect `f`
/// returns for it.
pub fn access_effect<W, S, R, E, A, F>(f: F) -> Effect<W, S, R, E, A>
where
    W: 'static,
    S: 'static,
    R: 'static,
    E: 'static,
    A: 'static,
    F: FnOnce(&R) -> Effect<W, S, R, E, A> + 'static,
{
    Effect::from_instruction(Instruction::Access(Box::new(move |env: ErasedEnv| {
        let env = env
            .downcast::<R>()
            .ok()
            .expect("interpreter invariant: environment does not have the expected type");
        f(&env).into_instruction()
    })))
}

/// Returns an effect that defers construction of the wrapped effect until the interpreter
/// reaches it.
pub fn suspend<W, S, R, E, A, F>(thunk: F) -> Effect<W, S, R, E, A>
where
    W: 'static,
    S: 'static,
    R: 'static,
    E: 'static,
    A: 'static,
    F: FnOnce() -> Effect<W, S, R, E, A> + 'static,
{
    unit().and_then(move |_| thunk())
}

// HOST PANICS
// ================================================================================================

/// A host panic captured by [attempt].
#[cfg(feature = "std")]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("host panic: {message}")]
pub struct Defect {
    message: alloc::string::String,
}

#[cfg(feature = "std")]
impl Defect {
    fn from_panic(payload: Box<dyn core::any::Any + Send>) -> Self {
        use alloc::string::ToString;

        let message = if let Some(message) = payload.downcast_ref::<&'static str>() {
            message.to_string()
        } else if let Some(message) = payload.downcast_ref::<alloc::string::String>() {
            message.clone()
        } else {
            "opaque panic payload".to_string()
        };
        Self { message }
    }

    /// Returns the panic message, if one could be extracted from the payload.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Returns an effect that runs a host closure when reached, converting an unwinding panic into
/// a domain failure carrying a [Defect].
///
/// Only unwinding panics are converted; fatal host errors (aborts, out-of-memory kills) never
/// unwind and so always escape the run. Elsewhere the interpreter never intercepts panics —
/// this constructor is the single opt-in point.
#[cfg(feature = "std")]
pub fn attempt<W, S, R, A, F>(f: F) -> Effect<W, S, R, Defect, A>
where
    W: 'static,
    S: 'static,
    R: 'static,
    A: 'static,
    F: FnOnce() -> A + core::panic::UnwindSafe + 'static,
{
    suspend(move || match std::panic::catch_unwind(f) {
        Ok(value) => succeed(value),
        Err(payload) => fail(Defect::from_panic(payload)),
    })
}

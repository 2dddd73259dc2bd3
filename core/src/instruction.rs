use alloc::{boxed::Box, rc::Rc};
use core::{any::Any, fmt};

use crate::cause::Cause;

// ERASED PAYLOADS
// ================================================================================================

/// A success value with its type erased.
///
/// Values are erased to `Box<dyn Any>` inside the instruction tree and the interpreter; the
/// typed [Effect](crate::Effect) surface re-types them at the construction and run boundaries.
/// Every push/pop pairing is statically grouped, so the paired downcasts cannot fail.
pub type ErasedValue = Box<dyn Any>;

/// An error leaf with its type erased.
pub type ErasedError = Box<dyn Any>;

/// A state slot with its type erased.
///
/// States are reference-counted because a `Fold` snapshots the state at entry and restores it
/// on the failure path; the snapshot shares the allocation instead of cloning the state value.
pub type ErasedState = Rc<dyn Any>;

/// An environment with its type erased.
///
/// Environments are reference-counted because the top of the environment stack may be read by
/// any number of `Access` instructions while it is installed.
pub type ErasedEnv = Rc<dyn Any>;

/// A continuation awaiting a success value.
pub type SuccessCont<W> = Box<dyn FnOnce(ErasedValue) -> Instruction<W>>;

/// A continuation awaiting a failure cause.
pub type FailureCont<W> = Box<dyn FnOnce(Cause<ErasedError>) -> Instruction<W>>;

/// A function from the current environment to the next instruction.
pub type AccessFn<W> = Box<dyn FnOnce(ErasedEnv) -> Instruction<W>>;

/// An atomic state transition producing a value.
pub type ModifyFn = Box<dyn FnOnce(ErasedState) -> (ErasedState, ErasedValue)>;

// INSTRUCTION
// ================================================================================================

/// A single node of the instruction tree.
///
/// The tree has exactly nine variants; every user-facing combinator compiles down to nested
/// applications of these. The interpreter dispatches on the variant in a single dense `match`
/// per loop iteration.
///
/// An instruction tree is immutable once built and is consumed by the run that interprets it;
/// the continuation payloads are `FnOnce`, which is what makes the no-re-execution guarantee
/// a type-level fact rather than a runtime convention.
pub enum Instruction<W> {
    /// Sequence: run the child, feed its success value to the continuation.
    AndThen(Box<Instruction<W>>, SuccessCont<W>),
    /// Produce a value; state unchanged.
    Succeed(ErasedValue),
    /// Produce a failure cause; state unchanged.
    Fail(Cause<ErasedError>),
    /// Catch-and-transform: the only failure interceptor, and a log-retention scope.
    Fold(Box<Instruction<W>>, FailureCont<W>, SuccessCont<W>),
    /// Read the current environment and continue with the resulting instruction.
    Access(AccessFn<W>),
    /// Run the child with the given environment installed.
    Provide(ErasedEnv, Box<Instruction<W>>),
    /// Atomic state transition producing a value.
    Modify(ModifyFn),
    /// Append one entry to the log.
    Log(W),
    /// Push a dynamically-scoped interpreter flag for the child's duration.
    Flag(RuntimeFlag, bool, Box<Instruction<W>>),
}

impl<W> Instruction<W> {
    /// Returns the name of this instruction's variant.
    pub fn name(&self) -> &'static str {
        match self {
            Instruction::AndThen(..) => "AndThen",
            Instruction::Succeed(..) => "Succeed",
            Instruction::Fail(..) => "Fail",
            Instruction::Fold(..) => "Fold",
            Instruction::Access(..) => "Access",
            Instruction::Provide(..) => "Provide",
            Instruction::Modify(..) => "Modify",
            Instruction::Log(..) => "Log",
            Instruction::Flag(..) => "Flag",
        }
    }
}

impl<W> fmt::Debug for Instruction<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // payloads are erased closures; only the shape is printable
        f.write_str(self.name())
    }
}

// RUNTIME FLAG
// ================================================================================================

/// A dynamically-scoped interpreter flag.
///
/// Flags are installed with [Instruction::Flag] for the duration of the wrapped child and are
/// queried by the interpreter with a per-flag default when no value is installed. The
/// enumeration is where future flags slot in; each carries its own default.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuntimeFlag {
    /// When set, log entries recorded inside a failing fold scope are discarded instead of
    /// being merged into the enclosing scope.
    ClearLogOnError,
}

impl RuntimeFlag {
    /// Returns the value the interpreter assumes when no value for this flag is installed.
    pub const fn default_value(self) -> bool {
        match self {
            RuntimeFlag::ClearLogOnError => false,
        }
    }
}

// RE-TYPING HELPERS
// ================================================================================================

/// Recovers a typed value from an erased one.
///
/// # Panics
/// Panics if the erased value was not produced by the matching typed constructor; the typed
/// [Effect](crate::Effect) surface pairs every erasure with exactly one downcast, so this
/// cannot happen through the public API.
pub fn unbox_value<T: 'static>(value: ErasedValue) -> T {
    *value
        .downcast::<T>()
        .ok()
        .expect("interpreter invariant: erased value does not have the expected type")
}

/// Erases the leaves of a typed cause.
pub fn erase_cause<E: 'static>(cause: Cause<E>) -> Cause<ErasedError> {
    cause.map(|error| Box::new(error) as ErasedError)
}

/// Recovers a typed cause from an erased one.
///
/// # Panics
/// Panics under the same conditions as [unbox_value].
pub fn retype_cause<E: 'static>(cause: Cause<ErasedError>) -> Cause<E> {
    cause.map(unbox_value::<E>)
}

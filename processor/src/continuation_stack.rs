use alloc::vec::Vec;

use quill_core::instruction::{ErasedState, FailureCont, SuccessCont};

// CONTINUATION
// ================================================================================================

/// A single frame on the continuation stack.
///
/// Success resolution pops frames until one schedules the next instruction; the error unwind
/// pops frames until it reaches a [Continuation::Fold], performing the bookkeeping each frame
/// kind owes along the way. Keeping the frame kinds as enum variants is what lets the unwind
/// distinguish a fold from a plain continuation without inspecting closures.
pub(crate) enum Continuation<W> {
    /// A plain continuation awaiting a success value. Skipped silently by the unwind: any log
    /// scope it was part of is accounted for by the owning fold or provide frame.
    Next(SuccessCont<W>),
    /// A fold record: the only frame that stops the unwind.
    Fold(FoldContinuation<W>),
    /// Uninstalls the environment pushed by a `Provide`, on either exit path. Owns a log scope
    /// so that the span of the provided child is a merge point, exactly as if the child had
    /// been wrapped in a fold that re-raises.
    PopEnv,
    /// Uninstalls the flag value pushed by a `Flag`, on either exit path. Owns a log scope
    /// covering exactly the flag's child: merged into the parent on success, and on the
    /// failure path merged or discarded by the popped flag value before the unwind continues.
    PopFlag,
}

/// The payload of a fold frame.
///
/// The paired log-scope push happens when the frame is pushed; exactly one pop happens when the
/// frame resolves, through either handler.
pub(crate) struct FoldContinuation<W> {
    /// Handler for the failure cause of the wrapped child.
    pub on_failure: FailureCont<W>,
    /// Handler for the success value of the wrapped child.
    pub on_success: SuccessCont<W>,
    /// The state as of fold entry, restored before `on_failure` runs. The success path keeps
    /// the child's output state instead.
    pub saved_state: ErasedState,
}

// CONTINUATION STACK
// ================================================================================================

/// The stack of continuations awaiting the outcome of the current instruction.
///
/// This is the only interpreter stack whose depth grows with the sequencing depth of the
/// program; the environment, flag, and log-scope stacks grow only with nesting of their
/// respective scopes.
pub(crate) struct ContinuationStack<W> {
    frames: Vec<Continuation<W>>,
}

impl<W> ContinuationStack<W> {
    /// Returns an empty continuation stack.
    pub fn new() -> Self {
        Self { frames: Vec::new() }
    }

    /// Pushes a frame onto the stack.
    #[inline(always)]
    pub fn push_continuation(&mut self, continuation: Continuation<W>) {
        self.frames.push(continuation);
    }

    /// Pops the most recently pushed frame, or returns `None` when the computation is done.
    #[inline(always)]
    pub fn pop_continuation(&mut self) -> Option<Continuation<W>> {
        self.frames.pop()
    }

    /// Returns the number of frames currently on the stack.
    #[inline(always)]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

use alloc::{boxed::Box, rc::Rc, vec::Vec};
use core::{mem, ops::ControlFlow};

use quill_core::{
    cause::Cause,
    instruction::{
        ErasedEnv, ErasedError, ErasedState, ErasedValue, Instruction, ModifyFn, RuntimeFlag,
    },
};
use smallvec::SmallVec;

use crate::continuation_stack::{Continuation, ContinuationStack, FoldContinuation};

// CONSTANTS
// ================================================================================================

/// Inline capacity of the environment stack; deeper `provide` nesting spills to the heap.
const ENV_STACK_BUFFER: usize = 4;

/// Inline capacity of the flag stack; deeper flag nesting spills to the heap.
const FLAG_STACK_BUFFER: usize = 8;

// MACHINE
// ================================================================================================

/// The interpreter for one run of an instruction tree.
///
/// The machine folds a tree into `(log, error | (state, value))` with an explicit dispatch
/// loop: sequencing pushes continuations instead of recursing, so host stack usage is constant
/// in the nesting depth of the tree. A machine owns exactly one run; the tree it consumes is
/// never mutated, and every run allocates a fresh set of stacks.
///
/// # Stacks
///
/// Four stacks evolve together, and their pushes and pops stay aligned across normal returns
/// and error unwinds:
///
/// - the continuation stack holds plain continuations, fold records, and the bookkeeping
///   frames that uninstall environments and flags;
/// - the environment stack holds the environments installed by `Provide`; `Access` reads its
///   top. The bottom entry is the root environment the run was started with;
/// - the log-scope stack holds one log builder per open fold, provide, or flag scope on top
///   of the root builder, which accumulates the final log and is never popped;
/// - the flag stack holds the values installed for `ClearLogOnError`, queried with the flag's
///   default when empty.
pub(crate) struct Machine<W> {
    /// The state slot. Shared with the snapshots taken at fold entry, which is why it is
    /// reference-counted rather than owned.
    state: ErasedState,
    cont_stack: ContinuationStack<W>,
    env_stack: SmallVec<[ErasedEnv; ENV_STACK_BUFFER]>,
    log_stack: Vec<Vec<W>>,
    flag_stack: SmallVec<[bool; FLAG_STACK_BUFFER]>,
}

/// The untyped result of a run, re-typed by the facade at the run boundary.
pub(crate) type RawOutcome<W> = (Vec<W>, Result<(ErasedState, ErasedValue), Cause<ErasedError>>);

impl<W> Machine<W> {
    // CONSTRUCTORS
    // --------------------------------------------------------------------------------------------

    /// Returns a machine ready to run one tree from the given state, with `environment`
    /// installed as the root environment.
    pub fn new(state: ErasedState, environment: ErasedEnv) -> Self {
        let mut env_stack = SmallVec::new();
        env_stack.push(environment);
        Self {
            state,
            cont_stack: ContinuationStack::new(),
            env_stack,
            log_stack: vec![Vec::new()],
            flag_stack: SmallVec::new(),
        }
    }

    // EXECUTE
    // --------------------------------------------------------------------------------------------

    /// Consumes the instruction tree and folds it into the final outcome.
    pub fn run(mut self, instruction: Instruction<W>) -> RawOutcome<W> {
        let mut current = instruction;
        loop {
            current = match current {
                Instruction::AndThen(child, k) => match *child {
                    // fast path: the continuation is applied inline, no frame is pushed
                    Instruction::Succeed(value) => k(value),
                    Instruction::Modify(f) => {
                        let value = self.apply_modify(f);
                        k(value)
                    },
                    child => {
                        self.cont_stack.push_continuation(Continuation::Next(k));
                        child
                    },
                },
                Instruction::Succeed(value) => match self.resume(value) {
                    ControlFlow::Continue(next) => next,
                    ControlFlow::Break(value) => return self.finish_success(value),
                },
                Instruction::Fail(cause) => match self.unwind(cause) {
                    ControlFlow::Continue(next) => next,
                    ControlFlow::Break(cause) => return self.finish_failure(cause),
                },
                Instruction::Fold(child, on_failure, on_success) => {
                    self.log_stack.push(Vec::new());
                    self.cont_stack.push_continuation(Continuation::Fold(FoldContinuation {
                        on_failure,
                        on_success,
                        saved_state: Rc::clone(&self.state),
                    }));
                    *child
                },
                Instruction::Access(f) => {
                    let environment = Rc::clone(
                        self.env_stack
                            .last()
                            .expect("interpreter invariant: environment stack is empty"),
                    );
                    f(environment)
                },
                Instruction::Provide(environment, child) => {
                    self.env_stack.push(environment);
                    self.log_stack.push(Vec::new());
                    self.cont_stack.push_continuation(Continuation::PopEnv);
                    *child
                },
                Instruction::Modify(f) => {
                    let value = self.apply_modify(f);
                    match self.resume(value) {
                        ControlFlow::Continue(next) => next,
                        ControlFlow::Break(value) => return self.finish_success(value),
                    }
                },
                Instruction::Log(entry) => {
                    self.top_log().push(entry);
                    match self.resume(unit_value()) {
                        ControlFlow::Continue(next) => next,
                        ControlFlow::Break(value) => return self.finish_success(value),
                    }
                },
                Instruction::Flag(flag, value, child) => match flag {
                    RuntimeFlag::ClearLogOnError => {
                        self.flag_stack.push(value);
                        self.log_stack.push(Vec::new());
                        self.cont_stack.push_continuation(Continuation::PopFlag);
                        *child
                    },
                },
            };
        }
    }

    // RESOLUTION
    // --------------------------------------------------------------------------------------------

    /// Delivers a success value to the most recent continuation, performing the bookkeeping of
    /// any scope frames on the way. Breaks with the value when the stack is exhausted.
    fn resume(&mut self, value: ErasedValue) -> ControlFlow<ErasedValue, Instruction<W>> {
        while let Some(frame) = self.cont_stack.pop_continuation() {
            match frame {
                Continuation::Next(k) => return ControlFlow::Continue(k(value)),
                Continuation::Fold(fold) => {
                    // successfully computed log entries are always retained; the child's
                    // output state is kept and the snapshot dies with the frame
                    self.merge_log_scope();
                    return ControlFlow::Continue((fold.on_success)(value));
                },
                Continuation::PopEnv => {
                    self.env_stack.pop();
                    self.merge_log_scope();
                },
                Continuation::PopFlag => {
                    self.flag_stack.pop();
                    self.merge_log_scope();
                },
            }
        }
        ControlFlow::Break(value)
    }

    /// Seeks the nearest enclosing fold for a failure cause, performing the bookkeeping of any
    /// scope frames on the way. Breaks with the cause when no fold encloses the failure.
    fn unwind(
        &mut self,
        cause: Cause<ErasedError>,
    ) -> ControlFlow<Cause<ErasedError>, Instruction<W>> {
        while let Some(frame) = self.cont_stack.pop_continuation() {
            match frame {
                // plain continuations are skipped; their log accounting belongs to the
                // enclosing fold or provide scope
                Continuation::Next(_) => (),
                Continuation::Fold(fold) => {
                    self.resolve_failed_log_scope();
                    self.state = fold.saved_state;
                    return ControlFlow::Continue((fold.on_failure)(cause));
                },
                Continuation::PopEnv => {
                    self.env_stack.pop();
                    self.resolve_failed_log_scope();
                },
                Continuation::PopFlag => {
                    // the flag's own scope is discarded or merged by the popped value, so
                    // entries recorded outside the flag's child are never touched
                    let clear = self
                        .flag_stack
                        .pop()
                        .expect("interpreter invariant: flag stack underflow");
                    let scope = self
                        .log_stack
                        .pop()
                        .expect("interpreter invariant: log stack underflow");
                    if !clear {
                        self.top_log().extend(scope);
                    }
                },
            }
        }
        ControlFlow::Break(cause)
    }

    // LOG SCOPES
    // --------------------------------------------------------------------------------------------

    /// Closes the current log scope on a success exit, appending its entries to the parent.
    fn merge_log_scope(&mut self) {
        let scope = self.log_stack.pop().expect("interpreter invariant: log stack underflow");
        self.top_log().extend(scope);
    }

    /// Closes the current log scope on a failure exit: entries are discarded when
    /// clear-on-error is active, appended to the parent otherwise. Entries are dropped only
    /// here and when a failed flag scope resolves with its value set.
    fn resolve_failed_log_scope(&mut self) {
        let scope = self.log_stack.pop().expect("interpreter invariant: log stack underflow");
        if !self.clear_log_on_error() {
            self.top_log().extend(scope);
        }
    }

    /// Returns the current value of the clear-log-on-error flag.
    fn clear_log_on_error(&self) -> bool {
        self.flag_stack
            .last()
            .copied()
            .unwrap_or(RuntimeFlag::ClearLogOnError.default_value())
    }

    fn top_log(&mut self) -> &mut Vec<W> {
        self.log_stack.last_mut().expect("interpreter invariant: log stack is empty")
    }

    // STATE
    // --------------------------------------------------------------------------------------------

    /// Applies an atomic state transition and returns the produced value.
    fn apply_modify(&mut self, f: ModifyFn) -> ErasedValue {
        let state = mem::replace(&mut self.state, Rc::new(()));
        let (next, value) = f(state);
        self.state = next;
        value
    }

    // TERMINATION
    // --------------------------------------------------------------------------------------------

    fn finish_success(mut self, value: ErasedValue) -> RawOutcome<W> {
        let log = self.take_final_log();
        (log, Ok((self.state, value)))
    }

    fn finish_failure(mut self, cause: Cause<ErasedError>) -> RawOutcome<W> {
        let log = self.take_final_log();
        (log, Err(cause))
    }

    fn take_final_log(&mut self) -> Vec<W> {
        debug_assert_eq!(self.cont_stack.depth(), 0, "continuations left at termination");
        debug_assert_eq!(self.env_stack.len(), 1, "unbalanced environment scopes at termination");
        debug_assert!(self.flag_stack.is_empty(), "unbalanced flag scopes at termination");
        debug_assert_eq!(self.log_stack.len(), 1, "unbalanced log scopes at termination");
        self.log_stack.pop().expect("interpreter invariant: log stack is empty")
    }
}

// HELPERS
// ================================================================================================

fn unit_value() -> ErasedValue {
    Box::new(())
}

use alloc::{rc::Rc, vec::Vec};
use core::fmt;

use super::{Effect, fail, halt, succeed, suspend};
use crate::cause::Cause;

// DERIVED COMBINATORS
// ================================================================================================

impl<W, S, R, E, A> Effect<W, S, R, E, A>
where
    W: 'static,
    S: 'static,
    R: 'static,
    E: 'static,
    A: 'static,
{
    // VALUE TRANSFORMERS
    // --------------------------------------------------------------------------------------------

    /// Transforms the success value with `f`.
    pub fn map<B, F>(self, f: F) -> Effect<W, S, R, E, B>
    where
        B: 'static,
        F: FnOnce(A) -> B + 'static,
    {
        self.and_then(move |value| succeed(f(value)))
    }

    /// Replaces the success value with `value`.
    pub fn replace<B>(self, value: B) -> Effect<W, S, R, E, B>
    where
        B: 'static,
    {
        self.map(move |_| value)
    }

    /// Transforms every error leaf with `f`.
    pub fn map_err<E2, F>(self, f: F) -> Effect<W, S, R, E2, A>
    where
        E2: 'static,
        F: FnMut(E) -> E2 + 'static,
    {
        self.fold_cause(move |cause| halt(cause.map(f)), succeed)
    }

    /// Transforms both channels at once: error leaves with `fe`, the success value with `fa`.
    ///
    /// The error mapping runs on the failure path of a fold, so state changes made by a failing
    /// computation are not observable past a `bimap`.
    pub fn bimap<E2, B, FE, FA>(self, fe: FE, fa: FA) -> Effect<W, S, R, E2, B>
    where
        E2: 'static,
        B: 'static,
        FE: FnMut(E) -> E2 + 'static,
        FA: FnOnce(A) -> B + 'static,
    {
        self.fold_cause(move |cause| halt(cause.map(fe)), move |value| succeed(fa(value)))
    }

    // SEQUENCING
    // --------------------------------------------------------------------------------------------

    /// Runs both effects in order and combines their values with `f`.
    pub fn zip_with<B, C, F>(self, other: Effect<W, S, R, E, B>, f: F) -> Effect<W, S, R, E, C>
    where
        B: 'static,
        C: 'static,
        F: FnOnce(A, B) -> C + 'static,
    {
        self.and_then(move |a| other.map(move |b| f(a, b)))
    }

    /// Runs both effects in order and pairs their values.
    pub fn zip<B>(self, other: Effect<W, S, R, E, B>) -> Effect<W, S, R, E, (A, B)>
    where
        B: 'static,
    {
        self.zip_with(other, |a, b| (a, b))
    }

    /// Runs both effects in order, keeping the first value.
    pub fn zip_left<B>(self, other: Effect<W, S, R, E, B>) -> Effect<W, S, R, E, A>
    where
        B: 'static,
    {
        self.zip_with(other, |a, _| a)
    }

    /// Runs both effects in order, keeping the second value.
    pub fn zip_right<B>(self, other: Effect<W, S, R, E, B>) -> Effect<W, S, R, E, B>
    where
        B: 'static,
    {
        self.zip_with(other, |_, b| b)
    }

    /// Runs both effects in order and combines their values with `f`, accumulating failures.
    ///
    /// Unlike [Effect::zip_with], a failure of the first effect does not short-circuit: the
    /// second effect still runs (against the state as of entry, since the first effect's
    /// outcome is captured by a fold), and if both fail the resulting cause is
    /// `Cause::Both(first, second)`. Execution is strictly sequential; only the failure
    /// composition is "parallel".
    pub fn zip_with_par<B, C, F>(self, other: Effect<W, S, R, E, B>, f: F) -> Effect<W, S, R, E, C>
    where
        A: Clone,
        E: Clone,
        B: 'static,
        C: 'static,
        F: FnOnce(A, B) -> C + 'static,
    {
        self.fold_cause(
            |cause| succeed(Err(cause)),
            |value| succeed(Ok(value)),
        )
        .and_then(move |first: Result<A, Cause<E>>| {
            let first_for_failure = first.clone();
            other.fold_cause(
                move |second_cause| match first_for_failure {
                    Ok(_) => halt(second_cause),
                    Err(first_cause) => halt(Cause::both(first_cause, second_cause)),
                },
                move |b| match first {
                    Ok(a) => succeed(f(a, b)),
                    Err(first_cause) => halt(first_cause),
                },
            )
        })
    }

    // RECOVERY
    // --------------------------------------------------------------------------------------------

    /// Hands the outcome to value-level handlers: the leftmost error leaf on failure, the
    /// success value otherwise.
    pub fn fold_effect<E2, B, FE, FA>(self, on_err: FE, on_ok: FA) -> Effect<W, S, R, E2, B>
    where
        E2: 'static,
        B: 'static,
        FE: FnOnce(E) -> Effect<W, S, R, E2, B> + 'static,
        FA: FnOnce(A) -> Effect<W, S, R, E2, B> + 'static,
    {
        self.fold_cause(move |cause| on_err(cause.into_first()), on_ok)
    }

    /// Recovers from a failure with `h`, applied to the leftmost error leaf.
    pub fn catch_all<E2, F>(self, h: F) -> Effect<W, S, R, E2, A>
    where
        E2: 'static,
        F: FnOnce(E) -> Effect<W, S, R, E2, A> + 'static,
    {
        self.fold_cause(move |cause| h(cause.into_first()), succeed)
    }

    /// Recovers from a failure with `h`, applied to the full cause.
    pub fn catch_all_cause<E2, F>(self, h: F) -> Effect<W, S, R, E2, A>
    where
        E2: 'static,
        F: FnOnce(Cause<E>) -> Effect<W, S, R, E2, A> + 'static,
    {
        self.fold_cause(h, succeed)
    }

    /// Falls back to `that` if this effect fails.
    pub fn or_else<E2, F>(self, that: F) -> Effect<W, S, R, E2, A>
    where
        E2: 'static,
        F: FnOnce() -> Effect<W, S, R, E2, A> + 'static,
    {
        self.fold_cause(move |_| that(), succeed)
    }

    /// Runs `f` on the success value for its effects, keeping the original value.
    pub fn tap<B, F>(self, f: F) -> Effect<W, S, R, E, A>
    where
        A: Clone,
        B: 'static,
        F: FnOnce(A) -> Effect<W, S, R, E, B> + 'static,
    {
        self.and_then(move |value| f(value.clone()).replace(value))
    }

    /// Runs `f` on the failure cause for its effects, then re-raises.
    ///
    /// If the handler work itself fails, the re-raised cause is the sequential composition
    /// `Cause::Then(original, handler_cause)`.
    pub fn tap_cause<B, F>(self, f: F) -> Effect<W, S, R, E, A>
    where
        E: Clone,
        B: 'static,
        F: FnOnce(Cause<E>) -> Effect<W, S, R, E, B> + 'static,
    {
        self.fold_cause(
            move |cause| {
                let handler_input = cause.clone();
                let re_raise = cause.clone();
                f(handler_input).fold_cause(
                    move |handler_cause| halt(Cause::then(cause, handler_cause)),
                    move |_| halt(re_raise),
                )
            },
            succeed,
        )
    }

    /// Fails with `error` if the success value does not satisfy `predicate`.
    pub fn filter_or_fail<P>(self, predicate: P, error: E) -> Effect<W, S, R, E, A>
    where
        P: FnOnce(&A) -> bool + 'static,
    {
        self.and_then(move |value| {
            if predicate(&value) { succeed(value) } else { fail(error) }
        })
    }

    /// Narrows the error channel with a partial refinement.
    ///
    /// Error leaves for which `refine` returns `None` leave the domain error channel entirely
    /// and escape the run as a host panic.
    pub fn refine_or_die<E2, F>(self, mut refine: F) -> Effect<W, S, R, E2, A>
    where
        E: fmt::Debug,
        E2: 'static,
        F: FnMut(E) -> Option<E2> + 'static,
    {
        self.fold_cause(
            move |cause| {
                halt(cause.map(|error| {
                    let rendered = alloc::format!("{error:?}");
                    refine(error)
                        .unwrap_or_else(|| panic!("unrefined error escaped the error channel: {rendered}"))
                }))
            },
            succeed,
        )
    }
}

// COLLECTION SEQUENCERS
// ================================================================================================

/// Runs `f` over every item in order, collecting the produced values.
///
/// The first failure short-circuits the remaining items.
pub fn for_each<W, S, R, E, A, T, F>(items: Vec<T>, f: F) -> Effect<W, S, R, E, Vec<A>>
where
    W: 'static,
    S: 'static,
    R: 'static,
    E: 'static,
    A: 'static,
    T: 'static,
    F: Fn(T) -> Effect<W, S, R, E, A> + 'static,
{
    let f = Rc::new(f);
    let mut sequenced: Effect<W, S, R, E, Vec<A>> = succeed(Vec::with_capacity(items.len()));
    for item in items {
        let f = Rc::clone(&f);
        sequenced = sequenced.and_then(move |mut collected| {
            (*f)(item).map(move |value| {
                collected.push(value);
                collected
            })
        });
    }
    sequenced
}

/// Runs the effects in order, collecting their values.
pub fn collect_all<W, S, R, E, A>(effects: Vec<Effect<W, S, R, E, A>>) -> Effect<W, S, R, E, Vec<A>>
where
    W: 'static,
    S: 'static,
    R: 'static,
    E: 'static,
    A: 'static,
{
    let mut sequenced: Effect<W, S, R, E, Vec<A>> = succeed(Vec::with_capacity(effects.len()));
    for effect in effects {
        sequenced = sequenced.and_then(move |mut collected| {
            effect.map(move |value| {
                collected.push(value);
                collected
            })
        });
    }
    sequenced
}

/// Describes `count` runs of the effect `make` produces, collecting the values.
///
/// The next repetition is only described once the previous one has succeeded, so the tree stays
/// shallow no matter how large `count` is.
pub fn repeat_n<W, S, R, E, A, F>(count: usize, make: F) -> Effect<W, S, R, E, Vec<A>>
where
    W: 'static,
    S: 'static,
    R: 'static,
    E: 'static,
    A: 'static,
    F: Fn() -> Effect<W, S, R, E, A> + 'static,
{
    fn go<W, S, R, E, A, F>(
        remaining: usize,
        make: Rc<F>,
        collected: Vec<A>,
    ) -> Effect<W, S, R, E, Vec<A>>
    where
        W: 'static,
        S: 'static,
        R: 'static,
        E: 'static,
        A: 'static,
        F: Fn() -> Effect<W, S, R, E, A> + 'static,
    {
        if remaining == 0 {
            return succeed(collected);
        }
        suspend(move || {
            let next = Rc::clone(&make);
            (*make)().and_then(move |value| {
                let mut collected = collected;
                collected.push(value);
                go(remaining - 1, next, collected)
            })
        })
    }

    go(count, Rc::new(make), Vec::with_capacity(count))
}

/// Repeats the effect `make` produces until its value satisfies `done`, returning that value.
pub fn repeat_until<W, S, R, E, A, F, P>(make: F, done: P) -> Effect<W, S, R, E, A>
where
    W: 'static,
    S: 'static,
    R: 'static,
    E: 'static,
    A: 'static,
    F: Fn() -> Effect<W, S, R, E, A> + 'static,
    P: Fn(&A) -> bool + 'static,
{
    fn go<W, S, R, E, A, F, P>(make: Rc<F>, done: Rc<P>) -> Effect<W, S, R, E, A>
    where
        W: 'static,
        S: 'static,
        R: 'static,
        E: 'static,
        A: 'static,
        F: Fn() -> Effect<W, S, R, E, A> + 'static,
        P: Fn(&A) -> bool + 'static,
    {
        suspend(move || {
            let next_make = Rc::clone(&make);
            let next_done = Rc::clone(&done);
            (*make)().and_then(move |value| {
                if (*next_done)(&value) {
                    succeed(value)
                } else {
                    go(next_make, next_done)
                }
            })
        })
    }

    go(Rc::new(make), Rc::new(done))
}

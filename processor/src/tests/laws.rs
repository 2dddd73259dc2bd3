use alloc::boxed::Box;

use proptest::{collection::vec, prelude::*};
use quill_core::for_each;

use super::*;
use crate::RuntimeFlag;

type LawEffect<A = i64> = Effect<u8, i64, (), u8, A>;

// GENERATED PROGRAMS
// ================================================================================================

/// A first-order description of an effect, so that the same computation can be compiled (and
/// therefore run) more than once.
#[derive(Debug, Clone)]
enum Program {
    Value(i64),
    Fault(u8),
    Note(u8),
    Bump(i64),
    Seq(Box<Program>, Box<Program>),
    Recover(Box<Program>, Box<Program>),
    Scoped(bool, Box<Program>),
}

fn compile(program: Program) -> LawEffect {
    match program {
        Program::Value(value) => succeed(value),
        Program::Fault(error) => fail(error),
        Program::Note(entry) => log(entry).replace(0),
        Program::Bump(step) => modify(move |s: i64| (s.wrapping_add(step), s)),
        Program::Seq(first, second) => compile(*first).and_then(move |_| compile(*second)),
        Program::Recover(body, handler) => {
            compile(*body).fold_cause(move |_| compile(*handler), succeed)
        },
        Program::Scoped(clear, body) => {
            compile(*body).with_flag(RuntimeFlag::ClearLogOnError, clear)
        },
    }
}

fn program_strategy() -> impl Strategy<Value = Program> {
    let leaf = prop_oneof![
        any::<i64>().prop_map(Program::Value),
        any::<u8>().prop_map(Program::Fault),
        any::<u8>().prop_map(Program::Note),
        any::<i64>().prop_map(Program::Bump),
    ];
    leaf.prop_recursive(4, 24, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone())
                .prop_map(|(a, b)| Program::Seq(Box::new(a), Box::new(b))),
            (inner.clone(), inner.clone())
                .prop_map(|(a, b)| Program::Recover(Box::new(a), Box::new(b))),
            (any::<bool>(), inner).prop_map(|(clear, b)| Program::Scoped(clear, Box::new(b))),
        ]
    })
}

// LAWS
// ================================================================================================

proptest! {
    #[test]
    fn sequencing_left_identity(a in any::<i64>(), initial in any::<i64>()) {
        fn k(a: i64) -> LawEffect {
            log(1u8).zip_right(modify(move |s: i64| (s.wrapping_add(a), a.wrapping_mul(3))))
        }

        let direct = run_all(k(a), initial);
        let sequenced = run_all(succeed(a).and_then(k), initial);
        prop_assert_eq!(sequenced.log, direct.log);
        prop_assert_eq!(sequenced.result, direct.result);
    }

    #[test]
    fn sequencing_right_identity(program in program_strategy(), initial in any::<i64>()) {
        let plain = run_all(compile(program.clone()), initial);
        let chained = run_all(compile(program).and_then(succeed), initial);
        prop_assert_eq!(chained.log, plain.log);
        prop_assert_eq!(chained.result, plain.result);
    }

    #[test]
    fn sequencing_associativity(program in program_strategy(), initial in any::<i64>()) {
        fn k(a: i64) -> LawEffect {
            if a % 3 == 0 { fail(7) } else { log(2u8).replace(a.wrapping_add(1)) }
        }
        fn h(a: i64) -> LawEffect {
            modify(move |s: i64| (s.wrapping_mul(3), a))
        }

        let left = run_all(compile(program.clone()).and_then(k).and_then(h), initial);
        let right = run_all(compile(program).and_then(|a| k(a).and_then(h)), initial);
        prop_assert_eq!(left.log, right.log);
        prop_assert_eq!(left.result, right.result);
    }

    #[test]
    fn state_threading_composes(
        m1 in any::<i64>(),
        c1 in any::<i64>(),
        m2 in any::<i64>(),
        c2 in any::<i64>(),
        initial in any::<i64>(),
    ) {
        let f = move |s: i64| (s.wrapping_mul(m1).wrapping_add(c1), s ^ m1);
        let g = move |s: i64| (s.wrapping_mul(m2).wrapping_add(c2), s ^ m2);

        let effect: LawEffect = modify(f).zip_right(modify(g));
        let (s1, _) = f(initial);
        let (s2, v2) = g(s1);
        prop_assert_eq!(run_all(effect, initial).result, Ok((s2, v2)));
    }

    #[test]
    fn environment_scoping(
        outer in any::<i64>(),
        inner in any::<i64>(),
        initial in any::<i64>(),
    ) {
        let effect: LawEffect = access(|r: &i64| *r).provide(inner).provide(outer);
        prop_assert_eq!(run_all(effect, initial).result, Ok((initial, inner)));
    }

    #[test]
    fn log_order_matches_execution_order(
        entries in vec(any::<u8>(), 0..16),
        initial in any::<i64>(),
    ) {
        let effect: LawEffect<Vec<i64>> =
            for_each(entries.clone(), |entry: u8| log(entry).replace(0));
        prop_assert_eq!(run_all(effect, initial).log, entries);
    }

    #[test]
    fn failed_flag_scope_discards_its_entries(
        entries in vec(any::<u8>(), 0..8),
        error in any::<u8>(),
        initial in any::<i64>(),
    ) {
        let scoped: LawEffect<Vec<i64>> = for_each(entries, |entry: u8| log(entry).replace(0));
        let failing: LawEffect = scoped.zip_right(fail(error)).clear_log_on_error();
        let effect: LawEffect = failing.fold_cause(|_| succeed(0), succeed);
        prop_assert_eq!(run_all(effect, initial).log, Vec::<u8>::new());
    }

    #[test]
    fn successful_flag_scope_keeps_its_entries(
        entries in vec(any::<u8>(), 0..8),
        initial in any::<i64>(),
    ) {
        let effect: LawEffect<Vec<i64>> =
            for_each(entries.clone(), |entry: u8| log(entry).replace(0)).clear_log_on_error();
        prop_assert_eq!(run_all(effect, initial).log, entries);
    }

    #[test]
    fn successful_fold_scope_retains_logs_under_any_flag(
        entries in vec(any::<u8>(), 0..8),
        clear in any::<bool>(),
        initial in any::<i64>(),
    ) {
        let body: LawEffect<Vec<i64>> = for_each(entries.clone(), |entry: u8| log(entry).replace(0));
        let folded = body.fold_cause(
            |_: Cause<u8>| succeed::<u8, i64, (), u8, Vec<i64>>(Vec::new()),
            succeed,
        );
        let effect = folded.with_flag(RuntimeFlag::ClearLogOnError, clear);
        prop_assert_eq!(run_all(effect, initial).log, entries);
    }

    #[test]
    fn failure_projections_follow_the_cause(
        cause in any::<Cause<u8>>(),
        initial in any::<i64>(),
    ) {
        let expected_first = *cause.first();
        let expected_leaves = cause.clone().into_list();

        let effect: LawEffect = halt(cause.clone());
        prop_assert_eq!(run_either(effect, initial), Err(expected_first));

        let effect: LawEffect = halt(cause);
        match run_validation(effect, initial) {
            Validation::Failure { errors, .. } => {
                prop_assert_eq!(errors.first(), &expected_first);
                prop_assert_eq!(errors.into_vec(), expected_leaves);
            },
            Validation::Success { .. } => prop_assert!(false, "expected a failure"),
        }
    }
}

use super::*;
use self::assert_eq;

#[test]
fn uncaught_failure_terminates_the_run() {
    let effect: TestEffect = fail("boom");
    let output = run_all(effect, 0);
    assert_eq!(output.result, Err(Cause::single("boom")));
}

#[test]
fn halt_fails_with_the_cause_verbatim() {
    let cause = Cause::both(Cause::single("x"), Cause::single("y"));
    let effect: TestEffect = halt(cause.clone());
    assert_eq!(run_all(effect, 0).result, Err(cause));
}

#[test]
fn fold_intercepts_a_failure() {
    let effect: TestEffect = fail("boom").fold_cause(|c| succeed(c.into_first().len() as i64), succeed);
    assert_success(effect, 0, &[], 0, 4);
}

#[test]
fn unwind_skips_plain_continuations() {
    // continuations scheduled between the failure and the fold must never run
    let effect: TestEffect = fail("boom")
        .and_then(|v: i64| log("unreachable").replace(v))
        .and_then(|v: i64| succeed(v + 1))
        .fold_cause(|_| succeed(-1), succeed);
    assert_success(effect, 0, &[], 0, -1);
}

#[test]
fn nested_folds_resolve_innermost_first() {
    let inner: TestEffect = fail("x").fold_cause(|_| fail("y"), succeed);
    let effect: TestEffect = inner.fold_cause(|c| succeed(c.into_first().len() as i64), succeed);
    // the inner handler's own failure is what the outer fold observes
    assert_success(effect, 0, &[], 0, 1);
}

#[test]
fn handler_causes_are_re_raised_verbatim() {
    let effect: TestEffect =
        fail("x").fold_cause(|c| halt(Cause::then(c, Cause::single("y"))), succeed);
    let output = run_all(effect, 0);
    assert_eq!(output.result, Err(Cause::then(Cause::single("x"), Cause::single("y"))));
}

#[test]
fn failure_projections_follow_the_leftmost_leaf() {
    fn composite() -> TestEffect {
        fail("x").fold_cause(|c| halt(Cause::then(c, Cause::single("y"))), succeed)
    }

    assert_eq!(run_either(composite(), 0), Err("x"));
    match run_validation(composite(), 0) {
        Validation::Failure { errors, .. } => {
            assert_eq!(errors.first(), &"x");
            assert_eq!(errors.into_vec(), vec!["x", "y"]);
        },
        Validation::Success { .. } => panic!("expected a failure"),
    }
}

#[test]
fn tap_cause_composes_handler_failures_sequentially() {
    let effect: TestEffect =
        fail("x").tap_cause(|_| fail::<&'static str, i64, (), &'static str, i64>("y"));
    assert_eq!(
        run_all(effect, 0).result,
        Err(Cause::then(Cause::single("x"), Cause::single("y"))),
    );
}

#[test]
fn tap_cause_re_raises_when_handler_work_succeeds() {
    let effect: TestEffect = fail("x").tap_cause(|_| log("observed"));
    let output = run_all(effect, 0);
    assert_eq!(output.log, &["observed"]);
    assert_eq!(output.result, Err(Cause::single("x")));
}

#[test]
fn zip_with_par_accumulates_both_failures() {
    let left: TestEffect = fail("x");
    let right: TestEffect = fail("y");
    let effect = left.zip_with_par(right, |a, b| a + b);
    assert_eq!(
        run_all(effect, 0).result,
        Err(Cause::both(Cause::single("x"), Cause::single("y"))),
    );
}

#[test]
fn zip_with_par_keeps_a_single_failure_unwrapped() {
    let effect: TestEffect = fail("x").zip_with_par(succeed(1), |a: i64, b: i64| a + b);
    assert_eq!(run_all(effect, 0).result, Err(Cause::single("x")));

    let effect: TestEffect = succeed(1).zip_with_par(fail("y"), |a: i64, b: i64| a + b);
    assert_eq!(run_all(effect, 0).result, Err(Cause::single("y")));
}

#[test]
fn zip_with_par_combines_values_when_both_succeed() {
    let effect: TestEffect = succeed(20).zip_with_par(succeed(3), |a, b| a + b);
    assert_success(effect, 0, &[], 0, 23);
}

#[test]
fn zip_with_par_runs_the_right_side_from_the_entry_state() {
    // the failed left side's state update is captured by the fold and rolled back
    let left: TestEffect = update(|s: i64| s + 100).zip_right(fail("x"));
    let right: TestEffect = get();
    let effect = left.zip_with_par(right, |a, _| a).fold_cause(|_| get(), succeed);
    assert_success(effect, 1, &[], 1, 1);
}

#[test]
fn catch_all_recovers_with_the_leftmost_leaf() {
    let effect: TestEffect =
        halt(Cause::then(Cause::single("ab"), Cause::single("cdef")))
            .catch_all(|e| succeed(e.len() as i64));
    assert_success(effect, 0, &[], 0, 2);
}

#[test]
fn or_else_runs_the_fallback_only_on_failure() {
    let effect: TestEffect = fail("x").or_else(|| succeed(5));
    assert_success(effect, 0, &[], 0, 5);

    let effect: TestEffect = succeed::<&'static str, i64, (), &'static str, i64>(1).or_else(|| succeed(5));
    assert_success(effect, 0, &[], 0, 1);
}

#[test]
fn filter_or_fail_checks_the_success_value() {
    let effect: TestEffect = succeed(7).filter_or_fail(|v| *v > 5, "too small");
    assert_success(effect, 0, &[], 0, 7);

    let effect: TestEffect = succeed(3).filter_or_fail(|v| *v > 5, "too small");
    assert_eq!(run_either(effect, 0), Err("too small"));
}

#[test]
fn refine_or_die_narrows_matching_leaves() {
    let effect: Effect<&'static str, i64, (), usize, i64> =
        fail("boom").refine_or_die(|e: &'static str| Some(e.len()));
    assert_eq!(run_either(effect, 0), Err(4));
}

#[test]
#[should_panic(expected = "unrefined error escaped the error channel")]
fn refine_or_die_panics_on_unrefined_leaves() {
    let effect: Effect<&'static str, i64, (), usize, i64> =
        fail("boom").refine_or_die(|_| None);
    let _ = run_either(effect, 0);
}

#[test]
fn map_err_transforms_every_leaf() {
    let effect: Effect<&'static str, i64, (), usize, i64> =
        halt(Cause::both(Cause::single("ab"), Cause::single("cdef"))).map_err(|e| e.len());
    assert_eq!(
        run_all(effect, 0).result,
        Err(Cause::both(Cause::single(2), Cause::single(4))),
    );
}

use testlens_core::{
    classify_line, parse_line, LineEvent, Outcome, SuiteStatus, TestStatus, TestSuiteResult,
};

fn fold(lines: &[&str]) -> TestSuiteResult {
    lines
        .iter()
        .fold(TestSuiteResult::running(), |suite, line| parse_line(line, suite))
}

#[test]
fn test_summary_overrides_tally() {
    // The runner claims more tests than were printed individually.
    let suite = fold(&[
        "running 3 tests",
        "test a ... ok",
        "test b ... FAILED",
        "test result: FAILED. 4 passed; 1 failed; 2 ignored; 0 measured; 0 filtered out; finished in 0.50s",
    ]);

    assert_eq!(suite.total(), 7);
    assert_eq!((suite.passed, suite.failed, suite.ignored), (4, 1, 2));
    assert_eq!(suite.duration_ms, Some(500));
    assert_eq!(suite.planned, 3);
}

#[test]
fn test_start_then_finish_is_passed() {
    let suite = fold(&[
        "test tests::adds_correctly ... ",
        "test tests::adds_correctly ... ok",
    ]);

    assert_eq!(suite.tests["tests::adds_correctly"].status, TestStatus::Passed);
    assert_eq!(suite.passed, 1);
    assert_eq!(suite.status, SuiteStatus::Running);
}

#[test]
fn test_summaries_accumulate_across_binaries() {
    let suite = fold(&[
        "running 2 tests",
        "test unit::a ... ok",
        "test unit::b ... ok",
        "test result: ok. 2 passed; 0 failed; 0 ignored; 0 measured; 0 filtered out; finished in 0.01s",
        "running 1 test",
        "test api_works ... ignored",
        "test result: ok. 0 passed; 0 failed; 1 ignored; 0 measured; 0 filtered out; finished in 0.02s",
    ]);

    assert_eq!((suite.passed, suite.failed, suite.ignored), (2, 0, 1));
    assert_eq!(suite.planned, 3);
    assert_eq!(suite.duration_ms, Some(30));
    assert_eq!(suite.count(TestStatus::Passed), 2);
}

#[test]
fn test_live_tally_before_summary() {
    let suite = fold(&["test a ... ok", "test b ... ignored", "test c ... "]);

    assert_eq!((suite.passed, suite.failed, suite.ignored), (1, 0, 1));
    assert_eq!(suite.count(TestStatus::Running), 1);
}

#[test]
fn test_unrecognised_lines_leave_state_untouched() {
    let before = fold(&["test a ... ok"]);
    let after = parse_line("   Compiling testlens v0.1.0", before.clone());
    assert_eq!(before, after);
    assert_eq!(classify_line("warning: unused variable `x`"), None);
}

#[test]
fn test_per_test_duration() {
    let suite = fold(&["test slow ... ok <1.250s>"]);
    assert_eq!(suite.tests["slow"].duration_ms, Some(1250));

    let event = classify_line("test quick ... FAILED (0.001s)");
    assert_eq!(
        event,
        Some(LineEvent::Finished {
            name: "quick".into(),
            outcome: Outcome::Failed,
            duration_ms: Some(1),
        })
    );
}

#[test]
fn test_oversized_counts_saturate() {
    let suite = fold(&[
        "running 4294967295 tests",
        "running 1 test",
        "test result: ok. 4294967295 passed; 0 failed; 0 ignored; finished in 99999999999999999999s",
        "test result: ok. 1 passed; 0 failed; 0 ignored; finished in 99999999999999999999s",
        "test late ... ok",
    ]);

    assert_eq!(suite.planned, u32::MAX);
    assert_eq!(suite.passed, u32::MAX);
    assert_eq!(suite.total(), u32::MAX);
    assert_eq!(suite.duration_ms, Some(u64::MAX));
}

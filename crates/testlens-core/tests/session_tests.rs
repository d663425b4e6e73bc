use testlens_core::{discover, MatchTier, RunEvent, SuiteStatus, TestSession, TestStatus};

fn feed_lines(session: &mut TestSession, lines: &[&str]) {
    let run = session.run_id().expect("session started");
    for line in lines {
        session.feed_line(run, line);
    }
}

#[test]
fn test_spans_do_not_cross_contaminate() {
    let mut session = TestSession::new();
    session.start();
    feed_lines(
        &mut session,
        &[
            "test a ... ",
            "\x1b[1mline A1\x1b[0m",
            "test a ... \x1b[32mok\x1b[0m",
            "test b ... ",
            "line B1",
            "test b ... \x1b[31mFAILED\x1b[0m",
        ],
    );

    assert_eq!(
        session.output_for_key("a"),
        Some("test a ... \nline A1\ntest a ... ok\n")
    );
    assert_eq!(
        session.output_for_key("b"),
        Some("test b ... \nline B1\ntest b ... FAILED\n")
    );
    assert_eq!(session.suite().tests["a"].output, session.spans()["a"]);
}

#[test]
fn test_truncated_stream_is_flushed() {
    let mut session = TestSession::new();
    let run = session.start();
    feed_lines(&mut session, &["test a ... ", "line A1"]);
    assert_eq!(session.output_for_key("a"), None);

    session.finish(run);
    assert_eq!(session.output_for_key("a"), Some("test a ... \nline A1\n"));
    assert_eq!(session.suite().tests["a"].status, TestStatus::Running);
    assert_eq!(session.suite().status, SuiteStatus::Completed);
}

#[test]
fn test_start_then_ok_is_passed() {
    let mut session = TestSession::new();
    let run = session.start();
    session.feed(
        run,
        "test tests::adds_correctly ... \ntest tests::adds_correctly ... ok\n",
    );

    assert_eq!(
        session.suite().tests["tests::adds_correctly"].status,
        TestStatus::Passed
    );
}

#[test]
fn test_lookup_discovered_tests() {
    let source = "mod tests {\n    #[test]\n    fn adds_correctly() {}\n    #[test]\n    fn never_ran() {}\n}\n";
    let discovered = discover("src/lib.rs", source);

    let mut session = TestSession::new();
    let run = session.start();
    session.feed(
        run,
        "running 1 test\ntest tests::adds_correctly ... ok <0.004s>\n",
    );
    session.finish(run);

    let ran = session.lookup(&discovered[0]);
    assert_eq!(ran.key.as_deref(), Some("tests::adds_correctly"));
    assert_eq!(ran.tier, Some(MatchTier::Exact));
    assert_eq!(ran.status, TestStatus::Passed);
    assert_eq!(ran.duration_ms, Some(4));
    assert_eq!(ran.output, "test tests::adds_correctly ... ok <0.004s>\n");

    let missing = session.lookup(&discovered[1]);
    assert_eq!(missing.key, None);
    assert_eq!(missing.status, TestStatus::Pending);
    assert!(missing.output.is_empty());
}

#[test]
fn test_failure_detail_joins_test_output() {
    let transcript = "\
running 2 tests
test tests::boom ... FAILED
test tests::fine ... ok

failures:

---- tests::boom stdout ----
thread 'tests::boom' panicked at src/lib.rs:9:9:
assertion failed: false


failures:
    tests::boom

test result: FAILED. 1 passed; 1 failed; 0 ignored; 0 measured; 0 filtered out; finished in 0.00s
";
    let mut session = TestSession::new();
    let run = session.start();
    session.feed(run, transcript);
    session.finish(run);

    let boom = &session.suite().tests["tests::boom"];
    assert_eq!(boom.status, TestStatus::Failed);
    assert!(boom.output.contains("assertion failed: false"));
    assert!(!session.suite().tests["tests::fine"].output.contains("panicked"));
    assert_eq!((session.suite().passed, session.suite().failed), (1, 1));
    assert!(!session.suite().is_success());
}

#[test]
fn test_new_run_replaces_state() {
    let mut session = TestSession::new();
    let first = session.start();
    session.feed_line(first, "test a ... ok");

    let second = session.start();
    assert_ne!(first, second);
    assert!(session.suite().tests.is_empty());
    assert!(session.spans().is_empty());

    assert!(session.feed_line(first, "test stale ... ok").is_empty());
    assert!(session.finish(first).is_empty());
    assert!(session.is_active(second));
}

#[test]
fn test_terminal_events() {
    let mut session = TestSession::new();
    let run = session.start();

    let events = session.fail(run, "broken pipe");
    assert_eq!(
        events,
        vec![RunEvent::RunFinished {
            status: SuiteStatus::Failed
        }]
    );
    assert!(session.finished_at().is_some());
    assert!(session.elapsed_ms().unwrap() >= 0);
    assert_eq!(
        session.suite().summary(),
        "Failed: 0 passed; 0 failed; 0 ignored - broken pipe"
    );
}

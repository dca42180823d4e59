use typerate::corpus::TextSource;
use typerate::results::{StoredResult, SummaryStats, TestMode, TestRecord};
use typerate::session::{Phase, Session, SessionSettings};
use typerate::storage::ResultsDb;
use typerate::submit::{BackendError, LocalResults, ResultsBackend, SubmitOutcome};

struct FixedText(&'static str);

impl TextSource for FixedText {
    fn pick_random(&self) -> String {
        self.0.to_string()
    }

    fn pick_at_least(&self, _min_len: usize) -> String {
        self.0.to_string()
    }
}

/// Backend that refuses everything, standing in for an unreachable service.
struct FailingBackend;

impl ResultsBackend for FailingBackend {
    fn submit(&self, _record: &TestRecord) -> Result<StoredResult, BackendError> {
        Err(BackendError::Server { status: 500 })
    }

    fn recent(&self, _user_id: Option<i64>) -> Result<Vec<StoredResult>, BackendError> {
        Err(BackendError::Server { status: 500 })
    }

    fn summary(&self, _user_id: Option<i64>) -> Result<SummaryStats, BackendError> {
        Err(BackendError::Server { status: 500 })
    }
}

fn run_session(target: u32, typed: &str) -> (Session, TestRecord) {
    let mut session = Session::new(
        SessionSettings {
            mode: TestMode::Words,
            target,
            user_id: None,
        },
        &FixedText("hello world and some more practice text"),
    );
    session.start();
    session.tick();

    let mut buffer = String::new();
    let mut record = None;
    for c in typed.chars() {
        buffer.push(c);
        record = session.input(&buffer);
        if record.is_some() {
            break;
        }
    }
    let record = record.expect("session should complete");
    (session, record)
}

#[test]
fn completed_session_roundtrips_through_local_backend() {
    let backend = LocalResults::new(ResultsDb::in_memory().unwrap());
    let (session, record) = run_session(5, "hellp");

    assert_eq!(session.phase, Phase::Completed);
    assert_eq!(record.errors, 1);
    assert_eq!(record.characters_typed, 5);

    let stored = backend.submit(&record).unwrap();
    assert_eq!(stored.id, 1);
    assert_eq!(stored.record, record);

    let recent = backend.recent(None).unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].record.text_used, session.prompt);

    let summary = backend.summary(None).unwrap();
    assert_eq!(summary.total_tests, 1);
    assert_eq!(summary.best_wpm, record.wpm);
    assert_eq!(summary.total_time, record.duration);
}

#[test]
fn summary_accumulates_across_runs() {
    let backend = LocalResults::new(ResultsDb::in_memory().unwrap());

    let (_, first) = run_session(5, "hello");
    let (_, second) = run_session(5, "hellp");
    backend.submit(&first).unwrap();
    backend.submit(&second).unwrap();

    let summary = backend.summary(None).unwrap();
    assert_eq!(summary.total_tests, 2);
    assert_eq!(summary.best_accuracy, 100.0);
    assert_eq!(summary.total_time, first.duration + second.duration);
}

#[test]
fn failed_submission_leaves_completed_session_intact() {
    let backend = FailingBackend;
    let (session, record) = run_session(5, "hello");
    let snapshot = session.final_snapshot.expect("completed session");

    let outcome = SubmitOutcome::from_result(backend.submit(&record));

    match outcome {
        SubmitOutcome::Failed(msg) => assert!(msg.contains("500")),
        SubmitOutcome::Saved(_) => panic!("backend should have failed"),
    }
    // The failure is a notification only; the finished session still shows
    assert_eq!(session.phase, Phase::Completed);
    assert_eq!(session.final_snapshot, Some(snapshot));
}

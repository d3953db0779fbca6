//! Integration tests for the retrieval pipeline.
//!
//! The reader tool is replaced by a scripted runner so these tests exercise
//! time resolution, argument construction, extraction and artifact writing
//! together.

use chronolog_common::ChronologError;
use chronolog_retrieval::testing::MockCommandRunner;
use chronolog_retrieval::{
    CommandOutput, ReaderConfig, RecordExtractor, RetrievalOutcome, TimeRange,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn reader_config(dir: &TempDir) -> ReaderConfig {
    ReaderConfig {
        binary: PathBuf::from("/opt/chronolog/bin/hdf5_file_reader"),
        config_file: PathBuf::from("/opt/chronolog/conf/grapher_conf.json"),
        timeout: Duration::from_secs(5),
        output_dir: dir.path().to_path_buf(),
    }
}

fn extractor(dir: &TempDir, runner: Arc<MockCommandRunner>) -> RecordExtractor {
    RecordExtractor::with_runner(reader_config(dir), runner)
}

#[tokio::test]
async fn test_records_written_to_artifact() {
    let dir = TempDir::new().unwrap();
    let runner = Arc::new(MockCommandRunner::stdout(
        "eventTime=1 record=\"user: hi, assistant: hello\"\neventTime=2 record=\"user: a, assistant: b\"\n",
    ));
    let extractor = extractor(&dir, runner.clone());

    let outcome = extractor
        .retrieve("LLM", "conversation", None, None)
        .await
        .unwrap();

    let RetrievalOutcome::Records(set) = outcome else {
        panic!("expected records");
    };
    assert_eq!(
        set.records,
        vec!["user: hi, assistant: hello", "user: a, assistant: b"]
    );
    assert!(set.artifact_path.starts_with(dir.path()));
    let file_name = set.artifact_path.file_name().unwrap().to_string_lossy().to_string();
    assert!(file_name.starts_with("records_LLM_conversation_"));
    assert!(file_name.ends_with(".txt"));
    assert_eq!(
        std::fs::read_to_string(&set.artifact_path).unwrap(),
        "user: hi, assistant: hello\nuser: a, assistant: b"
    );

    let invocation = &runner.invocations()[0];
    assert_eq!(invocation.working_dir, PathBuf::from("/opt/chronolog/bin"));
    assert_eq!(
        invocation.args,
        vec![
            "-c",
            "/opt/chronolog/conf/grapher_conf.json",
            "-C",
            "LLM",
            "-S",
            "conversation"
        ]
    );
}

#[tokio::test]
async fn test_no_records_is_not_an_error() {
    let dir = TempDir::new().unwrap();
    let runner = Arc::new(MockCommandRunner::stdout("Story conversation is empty\n"));
    let extractor = extractor(&dir, runner);

    let outcome = extractor
        .retrieve("LLM", "conversation", Some("yesterday"), Some("today"))
        .await
        .unwrap();

    assert_eq!(outcome, RetrievalOutcome::NoRecordsFound);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_bounds_passed_to_reader() {
    let dir = TempDir::new().unwrap();
    let runner = Arc::new(MockCommandRunner::stdout(""));
    let extractor = extractor(&dir, runner.clone());

    extractor
        .retrieve("LLM", "conversation", Some("100"), Some("200"))
        .await
        .unwrap();

    let args = &runner.invocations()[0].args;
    assert_eq!(&args[6..], &["-st", "100", "-et", "200"]);
}

#[tokio::test]
async fn test_bad_time_expression_skips_reader() {
    let dir = TempDir::new().unwrap();
    let runner = Arc::new(MockCommandRunner::stdout("record=\"a\""));
    let extractor = extractor(&dir, runner.clone());

    let result = extractor
        .retrieve("LLM", "conversation", Some("not-a-date"), None)
        .await;

    assert!(matches!(
        result,
        Err(ChronologError::InvalidTimeExpression(_))
    ));
    assert!(runner.invocations().is_empty());
}

#[tokio::test]
async fn test_invocation_failure_surfaces() {
    let dir = TempDir::new().unwrap();
    let runner = Arc::new(MockCommandRunner::unavailable("No such file or directory"));
    let extractor = extractor(&dir, runner);

    let result = extractor
        .retrieve_range("LLM", "conversation", &TimeRange::unbounded())
        .await;

    assert!(matches!(
        result,
        Err(ChronologError::ReaderInvocationFailed(_))
    ));
}

#[tokio::test]
async fn test_failed_exit_still_scanned() {
    let dir = TempDir::new().unwrap();
    let runner = Arc::new(MockCommandRunner::new(vec![Ok(CommandOutput {
        stdout: "record=\"partial\"".to_string(),
        stderr: "HDF5 error".to_string(),
        exit_code: Some(1),
    })]));
    let extractor = extractor(&dir, runner);

    let outcome = extractor
        .retrieve_range("LLM", "conversation", &TimeRange::unbounded())
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        RetrievalOutcome::Records(ref set) if set.records == vec!["partial"]
    ));
}

#[tokio::test]
async fn test_repeated_retrievals_do_not_collide() {
    let dir = TempDir::new().unwrap();
    let runner = Arc::new(MockCommandRunner::new(vec![
        Ok(CommandOutput {
            stdout: "record=\"first\"".to_string(),
            exit_code: Some(0),
            ..Default::default()
        }),
        Ok(CommandOutput {
            stdout: "record=\"second\"".to_string(),
            exit_code: Some(0),
            ..Default::default()
        }),
    ]));
    let extractor = extractor(&dir, runner);
    let range = TimeRange::unbounded();

    let first = extractor.retrieve_range("LLM", "conversation", &range).await.unwrap();
    let second = extractor.retrieve_range("LLM", "conversation", &range).await.unwrap();

    let (RetrievalOutcome::Records(a), RetrievalOutcome::Records(b)) = (first, second) else {
        panic!("expected records from both runs");
    };
    assert_ne!(a.artifact_path, b.artifact_path);
    assert_eq!(std::fs::read_to_string(&a.artifact_path).unwrap(), "first");
    assert_eq!(std::fs::read_to_string(&b.artifact_path).unwrap(), "second");
}

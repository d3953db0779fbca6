//! Record extraction from the external reader tool.
//!
//! The reader prints one line per stored event. The only part this crate
//! relies on is a `record="<payload>"` field: the payload is whatever sits
//! between the opening quote and the next double quote on the same line.
//! Payloads containing a double quote are cut short at it, and anything that
//! does not match the pattern is skipped. The reader's output format is not
//! ours, so the scan stays tolerant instead of parsing it strictly.

use crate::artifact;
use crate::command::{CommandRunner, SystemCommandRunner};
use crate::time::TimeRange;
use chrono::Local;
use chronolog_common::Result;
use regex::Regex;
use std::path::PathBuf;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::{debug, info, warn};

static RECORD_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"record="(.*?)""#).expect("record pattern is valid"));

/// Pull every `record="..."` payload out of `output`, in order of appearance.
pub fn extract_records(output: &str) -> Vec<String> {
    RECORD_PATTERN
        .captures_iter(output)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// How to invoke the reader and where to put results.
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Path to the reader executable
    pub binary: PathBuf,
    /// Configuration file handed to the reader with `-c`
    pub config_file: PathBuf,
    /// Upper bound on a single reader run
    pub timeout: Duration,
    /// Directory result artifacts are written to
    pub output_dir: PathBuf,
}

impl ReaderConfig {
    /// Arguments for one reader run.
    pub fn args(&self, chronicle: &str, story: &str, range: &TimeRange) -> Vec<String> {
        let mut args = vec![
            "-c".to_string(),
            self.config_file.to_string_lossy().into_owned(),
            "-C".to_string(),
            chronicle.to_string(),
            "-S".to_string(),
            story.to_string(),
        ];
        if let Some(start) = range.start_nanos {
            args.push("-st".to_string());
            args.push(start.to_string());
        }
        if let Some(end) = range.end_nanos {
            args.push("-et".to_string());
            args.push(end.to_string());
        }
        args
    }

    /// The reader runs from its own directory so relative paths in its
    /// configuration resolve.
    pub fn working_dir(&self) -> PathBuf {
        match self.binary.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

/// Records returned by one retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievedRecordSet {
    /// Payloads in the order the reader emitted them
    pub records: Vec<String>,
    /// Artifact the payloads were written to
    pub artifact_path: PathBuf,
}

/// Result of a retrieval that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrievalOutcome {
    Records(RetrievedRecordSet),
    NoRecordsFound,
}

/// Runs the reader for a chronicle/story and collects its records.
pub struct RecordExtractor {
    config: ReaderConfig,
    runner: Arc<dyn CommandRunner>,
}

impl RecordExtractor {
    pub fn new(config: ReaderConfig) -> Self {
        Self::with_runner(config, Arc::new(SystemCommandRunner))
    }

    pub fn with_runner(config: ReaderConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self { config, runner }
    }

    /// Resolve the textual bounds and retrieve. Bad time expressions fail
    /// before the reader is invoked.
    pub async fn retrieve(
        &self,
        chronicle: &str,
        story: &str,
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<RetrievalOutcome> {
        let range = TimeRange::from_tokens(start, end)?;
        self.retrieve_range(chronicle, story, &range).await
    }

    pub async fn retrieve_range(
        &self,
        chronicle: &str,
        story: &str,
        range: &TimeRange,
    ) -> Result<RetrievalOutcome> {
        let args = self.config.args(chronicle, story, range);
        info!(
            chronicle = %chronicle,
            story = %story,
            start = ?range.start_nanos,
            end = ?range.end_nanos,
            "Retrieving records"
        );

        let output = self
            .runner
            .run(
                &self.config.binary,
                &args,
                &self.config.working_dir(),
                self.config.timeout,
            )
            .await?;

        if !output.success() {
            warn!(
                exit_code = ?output.exit_code,
                stderr = %output.stderr.trim(),
                "Record reader exited unsuccessfully; scanning its output anyway"
            );
        }

        let records = extract_records(&output.stdout);
        if records.is_empty() {
            debug!(chronicle = %chronicle, story = %story, "Reader returned no records");
            return Ok(RetrievalOutcome::NoRecordsFound);
        }

        let artifact_path = artifact::write_artifact(
            &self.config.output_dir,
            chronicle,
            story,
            &Local::now(),
            &records,
        )
        .await?;

        info!(
            records = records.len(),
            path = %artifact_path.display(),
            "Records retrieved"
        );

        Ok(RetrievalOutcome::Records(RetrievedRecordSet {
            records,
            artifact_path,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ReaderConfig {
        ReaderConfig {
            binary: PathBuf::from("/opt/chronolog/bin/hdf5_file_reader"),
            config_file: PathBuf::from("/opt/chronolog/conf/grapher_conf.json"),
            timeout: Duration::from_secs(5),
            output_dir: PathBuf::from("."),
        }
    }

    #[test]
    fn test_extract_in_order() {
        assert_eq!(extract_records(r#"record="a" record="b""#), vec!["a", "b"]);
    }

    #[test]
    fn test_extract_from_reader_lines() {
        let output = "\
Reading story conversation
eventTime=1732752000000000001 clientId=7 index=0 record=\"user: hi, assistant: hello\"
eventTime=1732752000000000002 clientId=7 index=1 record=\"user: bye, assistant: see you\"
Done.
";
        assert_eq!(
            extract_records(output),
            vec!["user: hi, assistant: hello", "user: bye, assistant: see you"]
        );
    }

    #[test]
    fn test_extract_none() {
        assert!(extract_records("no matching lines here\nrecord=unquoted").is_empty());
        assert!(extract_records("").is_empty());
    }

    #[test]
    fn test_extract_is_non_greedy_and_line_bound() {
        assert_eq!(extract_records(r#"record="" record="x""#), vec!["", "x"]);
        // An unterminated quote does not swallow the next line.
        assert_eq!(
            extract_records("record=\"broken\nrecord=\"ok\""),
            vec!["ok"]
        );
    }

    #[test]
    fn test_args_without_bounds() {
        let args = config().args("LLM", "conversation", &TimeRange::unbounded());
        assert_eq!(
            args,
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

    #[test]
    fn test_args_with_bounds() {
        let range = TimeRange::new(Some(10), Some(20)).unwrap();
        let args = config().args("LLM", "conversation", &range);
        assert_eq!(&args[6..], &["-st", "10", "-et", "20"]);

        let end_only = TimeRange::new(None, Some(20)).unwrap();
        let args = config().args("LLM", "conversation", &end_only);
        assert_eq!(&args[6..], &["-et", "20"]);
    }

    #[test]
    fn test_working_dir_is_binary_parent() {
        assert_eq!(config().working_dir(), PathBuf::from("/opt/chronolog/bin"));

        let bare = ReaderConfig {
            binary: PathBuf::from("hdf5_file_reader"),
            ..config()
        };
        assert_eq!(bare.working_dir(), PathBuf::from("."));
    }
}

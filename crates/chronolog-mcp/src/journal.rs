//! Filesystem-backed ChronoLog client.
//!
//! Stands in for the portal when no native ChronoLog transport is linked in.
//! Chronicles are directories under the journal root and each story is an
//! append-only JSON-lines file:
//!
//! ```text
//! <root>/LLM/conversation.jsonl
//! {"event_time":1732752000000000001,"record":"user: hi, assistant: hello"}
//! ```
//!
//! The portal settings are only logged. Nothing written here reaches a
//! ChronoLog deployment, and the HDF5 reader used for retrieval does not
//! read these files.

use crate::config::PortalConfig;
use async_trait::async_trait;
use chronolog_common::client::{
    CL_ERR_INVALID_ARG, CL_ERR_NOT_ACQUIRED, CL_ERR_NOT_CONNECTED, CL_ERR_NOT_EXIST,
    CL_ERR_UNKNOWN,
};
use chronolog_common::{
    Attributes, ChronologClient, Result, ReturnCode, StoryHandle, CL_SUCCESS,
};
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

type StoryKey = (String, String);

#[derive(Serialize)]
struct JournalEntry<'a> {
    event_time: u64,
    record: &'a str,
}

/// Client that journals events to local files.
pub struct JournalClient {
    root: PathBuf,
    portal: PortalConfig,
    connected: AtomicBool,
    acquired: Arc<Mutex<HashSet<StoryKey>>>,
}

impl JournalClient {
    pub fn new(root: impl Into<PathBuf>, portal: PortalConfig) -> Self {
        Self {
            root: root.into(),
            portal,
            connected: AtomicBool::new(false),
            acquired: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Path of the journal file for a story.
    pub fn story_path(&self, chronicle: &str, story: &str) -> PathBuf {
        self.root.join(chronicle).join(format!("{story}.jsonl"))
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

// Names become path components, so they must be exactly one.
fn valid_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

fn encode_entry(record: &str) -> Result<Vec<u8>> {
    let mut line = serde_json::to_vec(&JournalEntry {
        event_time: now_nanos(),
        record,
    })?;
    line.push(b'\n');
    Ok(line)
}

fn now_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

#[async_trait]
impl ChronologClient for JournalClient {
    async fn connect(&self) -> ReturnCode {
        info!(
            protocol = %self.portal.protocol,
            endpoint = %self.portal.endpoint(),
            root = %self.root.display(),
            "Connecting journal client"
        );
        match fs::create_dir_all(&self.root).await {
            Ok(()) => {
                self.connected.store(true, Ordering::SeqCst);
                CL_SUCCESS
            }
            Err(e) => {
                warn!(root = %self.root.display(), error = %e, "Journal root unavailable");
                CL_ERR_UNKNOWN
            }
        }
    }

    async fn disconnect(&self) -> ReturnCode {
        if !self.connected.swap(false, Ordering::SeqCst) {
            return CL_ERR_NOT_CONNECTED;
        }
        if let Ok(mut acquired) = self.acquired.lock() {
            acquired.clear();
        }
        debug!("Journal client disconnected");
        CL_SUCCESS
    }

    async fn create_chronicle(&self, name: &str, _attrs: &Attributes, _flags: i32) -> ReturnCode {
        if !self.is_connected() {
            return CL_ERR_NOT_CONNECTED;
        }
        if !valid_name(name) {
            return CL_ERR_INVALID_ARG;
        }
        match fs::create_dir_all(self.root.join(name)).await {
            Ok(()) => CL_SUCCESS,
            Err(e) => {
                warn!(chronicle = %name, error = %e, "Failed to create chronicle directory");
                CL_ERR_UNKNOWN
            }
        }
    }

    async fn acquire_story(
        &self,
        chronicle: &str,
        story: &str,
        _attrs: &Attributes,
        _flags: i32,
    ) -> std::result::Result<Box<dyn StoryHandle>, ReturnCode> {
        if !self.is_connected() {
            return Err(CL_ERR_NOT_CONNECTED);
        }
        if !valid_name(chronicle) || !valid_name(story) {
            return Err(CL_ERR_INVALID_ARG);
        }
        if !fs::try_exists(self.root.join(chronicle)).await.unwrap_or(false) {
            return Err(CL_ERR_NOT_EXIST);
        }

        let key = (chronicle.to_string(), story.to_string());
        self.acquired
            .lock()
            .map_err(|_| CL_ERR_UNKNOWN)?
            .insert(key.clone());

        Ok(Box::new(JournalStory {
            path: self.story_path(chronicle, story),
            key,
            acquired: self.acquired.clone(),
        }))
    }

    async fn release_story(&self, chronicle: &str, story: &str) -> ReturnCode {
        if !self.is_connected() {
            return CL_ERR_NOT_CONNECTED;
        }
        let key = (chronicle.to_string(), story.to_string());
        match self.acquired.lock() {
            Ok(mut acquired) => {
                if acquired.remove(&key) {
                    CL_SUCCESS
                } else {
                    CL_ERR_NOT_ACQUIRED
                }
            }
            Err(_) => CL_ERR_UNKNOWN,
        }
    }
}

struct JournalStory {
    path: PathBuf,
    key: StoryKey,
    acquired: Arc<Mutex<HashSet<StoryKey>>>,
}

impl JournalStory {
    fn is_acquired(&self) -> bool {
        self.acquired
            .lock()
            .map(|acquired| acquired.contains(&self.key))
            .unwrap_or(false)
    }

    async fn append(&self, line: &[u8]) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line).await?;
        file.flush().await
    }
}

#[async_trait]
impl StoryHandle for JournalStory {
    async fn log_event(&self, text: &str) -> ReturnCode {
        if !self.is_acquired() {
            return CL_ERR_NOT_ACQUIRED;
        }

        let line = match encode_entry(text) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "Failed to encode journal entry");
                return CL_ERR_UNKNOWN;
            }
        };

        match self.append(&line).await {
            Ok(()) => CL_SUCCESS,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to append journal entry");
                CL_ERR_UNKNOWN
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn client(dir: &TempDir) -> JournalClient {
        JournalClient::new(dir.path().join("journal"), PortalConfig::default())
    }

    #[tokio::test]
    async fn test_full_lifecycle_writes_jsonl() {
        let dir = TempDir::new().unwrap();
        let client = client(&dir);
        let attrs = Attributes::new();

        assert_eq!(client.connect().await, CL_SUCCESS);
        assert_eq!(client.create_chronicle("LLM", &attrs, 1).await, CL_SUCCESS);
        // Creating again reuses the chronicle.
        assert_eq!(client.create_chronicle("LLM", &attrs, 1).await, CL_SUCCESS);

        let handle = client
            .acquire_story("LLM", "conversation", &attrs, 1)
            .await
            .ok()
            .unwrap();
        assert_eq!(handle.log_event("user: hi, assistant: hello").await, CL_SUCCESS);
        assert_eq!(handle.log_event("say \"cheese\"").await, CL_SUCCESS);

        let content =
            std::fs::read_to_string(client.story_path("LLM", "conversation")).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["record"], "user: hi, assistant: hello");
        assert_eq!(lines[1]["record"], "say \"cheese\"");
        assert!(lines[0]["event_time"].as_u64().unwrap() > 0);

        assert_eq!(client.release_story("LLM", "conversation").await, CL_SUCCESS);
        assert_eq!(handle.log_event("late").await, CL_ERR_NOT_ACQUIRED);
        assert_eq!(client.disconnect().await, CL_SUCCESS);
    }

    #[test]
    fn test_encode_entry_is_one_json_line() {
        let line = encode_entry("say \"cheese\"\nplease").unwrap();
        assert_eq!(line.last(), Some(&b'\n'));
        assert_eq!(line.iter().filter(|b| **b == b'\n').count(), 1);

        let value: serde_json::Value = serde_json::from_slice(&line).unwrap();
        assert_eq!(value["record"], "say \"cheese\"\nplease");
    }

    #[tokio::test]
    async fn test_operations_require_connection() {
        let dir = TempDir::new().unwrap();
        let client = client(&dir);
        let attrs = Attributes::new();

        assert_eq!(client.create_chronicle("LLM", &attrs, 1).await, CL_ERR_NOT_CONNECTED);
        assert_eq!(
            client.acquire_story("LLM", "conversation", &attrs, 1).await.err(),
            Some(CL_ERR_NOT_CONNECTED)
        );
        assert_eq!(client.disconnect().await, CL_ERR_NOT_CONNECTED);
    }

    #[tokio::test]
    async fn test_acquire_in_missing_chronicle() {
        let dir = TempDir::new().unwrap();
        let client = client(&dir);
        client.connect().await;

        assert_eq!(
            client
                .acquire_story("missing", "conversation", &Attributes::new(), 1)
                .await
                .err(),
            Some(CL_ERR_NOT_EXIST)
        );
    }

    #[tokio::test]
    async fn test_rejects_path_like_names() {
        let dir = TempDir::new().unwrap();
        let client = client(&dir);
        client.connect().await;

        assert_eq!(
            client.create_chronicle("../escape", &Attributes::new(), 1).await,
            CL_ERR_INVALID_ARG
        );
        assert_eq!(
            client.create_chronicle("..", &Attributes::new(), 1).await,
            CL_ERR_INVALID_ARG
        );
    }

    #[tokio::test]
    async fn test_release_unacquired_story() {
        let dir = TempDir::new().unwrap();
        let client = client(&dir);
        client.connect().await;

        assert_eq!(
            client.release_story("LLM", "conversation").await,
            CL_ERR_NOT_ACQUIRED
        );
    }
}

//! In-memory backend client with scriptable return codes.
//!
//! Used by the session and facade tests to drive every failure path without
//! a running ChronoLog deployment.

use crate::client::{Attributes, ChronologClient, StoryHandle, CL_SUCCESS};
use crate::error::ReturnCode;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Backend operations whose return code can be scripted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendOp {
    Connect,
    Disconnect,
    CreateChronicle,
    AcquireStory,
    ReleaseStory,
    LogEvent,
}

/// A call observed by the scripted client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCall {
    Connect,
    Disconnect,
    CreateChronicle(String),
    AcquireStory { chronicle: String, story: String },
    ReleaseStory { chronicle: String, story: String },
    LogEvent(String),
}

#[derive(Default)]
struct Inner {
    codes: Mutex<HashMap<BackendOp, ReturnCode>>,
    calls: Mutex<Vec<ClientCall>>,
}

impl Inner {
    fn code(&self, op: BackendOp) -> ReturnCode {
        self.codes
            .lock()
            .unwrap()
            .get(&op)
            .copied()
            .unwrap_or(CL_SUCCESS)
    }

    fn record(&self, call: ClientCall) {
        self.calls.lock().unwrap().push(call);
    }
}

/// Scripted client. Clones share state, so a test can keep one copy for
/// assertions while the session owns another.
#[derive(Clone, Default)]
pub struct ScriptedClient {
    inner: Arc<Inner>,
}

impl ScriptedClient {
    /// A client where every operation succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `op` return `code` from now on.
    pub fn set_code(&self, op: BackendOp, code: ReturnCode) {
        self.inner.codes.lock().unwrap().insert(op, code);
    }

    /// Builder form of [`ScriptedClient::set_code`].
    pub fn with_code(self, op: BackendOp, code: ReturnCode) -> Self {
        self.set_code(op, code);
        self
    }

    /// All calls made so far, in order.
    pub fn calls(&self) -> Vec<ClientCall> {
        self.inner.calls.lock().unwrap().clone()
    }

    /// Texts passed to `log_event` through any handle.
    pub fn events(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ClientCall::LogEvent(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn clear_calls(&self) {
        self.inner.calls.lock().unwrap().clear();
    }
}

struct ScriptedHandle {
    inner: Arc<Inner>,
}

#[async_trait]
impl StoryHandle for ScriptedHandle {
    async fn log_event(&self, text: &str) -> ReturnCode {
        self.inner.record(ClientCall::LogEvent(text.to_string()));
        self.inner.code(BackendOp::LogEvent)
    }
}

#[async_trait]
impl ChronologClient for ScriptedClient {
    async fn connect(&self) -> ReturnCode {
        self.inner.record(ClientCall::Connect);
        self.inner.code(BackendOp::Connect)
    }

    async fn disconnect(&self) -> ReturnCode {
        self.inner.record(ClientCall::Disconnect);
        self.inner.code(BackendOp::Disconnect)
    }

    async fn create_chronicle(&self, name: &str, _attrs: &Attributes, _flags: i32) -> ReturnCode {
        self.inner.record(ClientCall::CreateChronicle(name.to_string()));
        self.inner.code(BackendOp::CreateChronicle)
    }

    async fn acquire_story(
        &self,
        chronicle: &str,
        story: &str,
        _attrs: &Attributes,
        _flags: i32,
    ) -> std::result::Result<Box<dyn StoryHandle>, ReturnCode> {
        self.inner.record(ClientCall::AcquireStory {
            chronicle: chronicle.to_string(),
            story: story.to_string(),
        });
        match self.inner.code(BackendOp::AcquireStory) {
            CL_SUCCESS => Ok(Box::new(ScriptedHandle {
                inner: self.inner.clone(),
            })),
            code => Err(code),
        }
    }

    async fn release_story(&self, chronicle: &str, story: &str) -> ReturnCode {
        self.inner.record(ClientCall::ReleaseStory {
            chronicle: chronicle.to_string(),
            story: story.to_string(),
        });
        self.inner.code(BackendOp::ReleaseStory)
    }
}

//! Backend client contract.
//!
//! The ChronoLog storage engine is an external collaborator. This module
//! pins down the narrow surface the service uses so that the session state
//! machine never depends on a particular transport.

use crate::error::ReturnCode;
use async_trait::async_trait;
use std::collections::HashMap;

pub const CL_SUCCESS: ReturnCode = 0;
pub const CL_ERR_UNKNOWN: ReturnCode = -1;
pub const CL_ERR_NOT_CONNECTED: ReturnCode = -2;
pub const CL_ERR_NOT_EXIST: ReturnCode = -3;
pub const CL_ERR_NOT_ACQUIRED: ReturnCode = -4;
pub const CL_ERR_INVALID_ARG: ReturnCode = -5;

/// Flags passed to chronicle creation and story acquisition.
pub const DEFAULT_FLAGS: i32 = 1;

/// Attributes attached to a chronicle or story.
pub type Attributes = HashMap<String, String>;

/// An acquired story. Writes go through this handle only.
#[async_trait]
pub trait StoryHandle: Send + Sync {
    /// Append one event to the story.
    async fn log_event(&self, text: &str) -> ReturnCode;
}

/// Connection to the log-storage backend.
#[async_trait]
pub trait ChronologClient: Send + Sync {
    async fn connect(&self) -> ReturnCode;

    async fn disconnect(&self) -> ReturnCode;

    /// Create the chronicle, or reuse it if it already exists.
    async fn create_chronicle(&self, name: &str, attrs: &Attributes, flags: i32) -> ReturnCode;

    async fn acquire_story(
        &self,
        chronicle: &str,
        story: &str,
        attrs: &Attributes,
        flags: i32,
    ) -> std::result::Result<Box<dyn StoryHandle>, ReturnCode>;

    async fn release_story(&self, chronicle: &str, story: &str) -> ReturnCode;
}

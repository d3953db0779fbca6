//! Common types and traits shared across the ChronoLog MCP crates.
//!
//! This crate holds the error taxonomy every layer reports through and the
//! backend client contract the session state machine is written against.

pub mod client;
pub mod error;
pub mod testing;

pub use client::{Attributes, ChronologClient, StoryHandle, CL_SUCCESS, DEFAULT_FLAGS};
pub use error::{ChronologError, FailureReport, Result, ReturnCode};

//! ChronoLog MCP: Model Context Protocol server for conversation logging.
//!
//! This crate exposes a ChronoLog session as MCP tools, so an assistant
//! can record each user/assistant exchange as an event in a story and
//! later pull past exchanges back out through the HDF5 record reader.
//!
//! # MCP Tools Exposed
//!
//! - `start_chronolog` - Connect, create the chronicle and acquire the story
//! - `record_interaction` - Append one exchange to the acquired story
//! - `stop_chronolog` - Release the story and disconnect
//! - `retrieve_interaction` - Export records for a time range to a file
//!
//! # Architecture
//!
//! ```text
//! MCP Client
//!        │
//!        │ MCP calls (stdio)
//!        ▼
//! ┌──────────────────────────┐
//! │   ChronoLog MCP Server   │
//! │                          │
//! │  ┌────────────────────┐  │
//! │  │  Session Manager   │  │ ◄── one chronicle/story binding
//! │  └─────────┬──────────┘  │
//! │            │             │
//! │  ┌─────────▼──────────┐  │
//! │  │  ChronologClient   │  │ ◄── journal backend
//! │  └────────────────────┘  │
//! │                          │
//! │  ┌────────────────────┐  │
//! │  │  Record Extractor  │──┼──► hdf5_file_reader
//! │  └────────────────────┘  │
//! └──────────────────────────┘
//! ```

pub mod config;
pub mod journal;
pub mod server;
pub mod session;
pub mod tools;

pub use config::ServerConfig;
pub use journal::JournalClient;
pub use server::{ChronologMcpServer, NO_RECORDS_FOUND};
pub use session::{format_interaction, Binding, SessionManager, SessionState};

//! MCP server implementation for the ChronoLog tools.

use crate::config::ServerConfig;
use crate::journal::JournalClient;
use crate::session::SessionManager;
use crate::tools::*;
use chronolog_common::{ChronologClient, ChronologError};
use chronolog_retrieval::{RecordExtractor, RetrievalOutcome};
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::tool::Parameters;
use rmcp::model::{CallToolResult, Content, Implementation, ServerCapabilities, ServerInfo};
use rmcp::{tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const NO_RECORDS_FOUND: &str = "No records found.";
const NO_SESSION_TO_RECORD: &str =
    "No active ChronoLog session. Please call start_chronolog first.";
const NO_SESSION_TO_STOP: &str = "No active ChronoLog session to stop.";

/// The ChronoLog MCP server.
///
/// Exposes session control and retrieval as MCP tools. Every tool answers
/// with plain text, including failures.
#[derive(Clone)]
pub struct ChronologMcpServer {
    sessions: Arc<SessionManager>,
    extractor: Arc<RecordExtractor>,
    default_chronicle: String,
    default_story: String,
    tool_router: ToolRouter<Self>,
}

impl ChronologMcpServer {
    pub fn new(
        sessions: Arc<SessionManager>,
        extractor: Arc<RecordExtractor>,
        default_chronicle: impl Into<String>,
        default_story: impl Into<String>,
    ) -> Self {
        Self {
            sessions,
            extractor,
            default_chronicle: default_chronicle.into(),
            default_story: default_story.into(),
            tool_router: Self::tool_router(),
        }
    }

    /// Build a server backed by the journal client and the system reader.
    ///
    /// Recorded events land in the journal's JSON-lines files, not in a
    /// ChronoLog deployment, so the reader only returns what ChronoLog
    /// itself has stored.
    pub fn from_config(config: &ServerConfig) -> Self {
        let client: Arc<dyn ChronologClient> = Arc::new(JournalClient::new(
            config.session.journal_dir.clone(),
            config.portal.clone(),
        ));
        Self::new(
            Arc::new(SessionManager::new(client)),
            Arc::new(RecordExtractor::new(config.reader.to_reader_config())),
            config.session.default_chronicle.clone(),
            config.session.default_story.clone(),
        )
    }

    pub fn sessions(&self) -> Arc<SessionManager> {
        self.sessions.clone()
    }

    /// Handle start_chronolog tool call.
    pub async fn handle_start(&self, input: StartChronologInput) -> String {
        let chronicle = name_or(input.chronicle_name.as_deref(), &self.default_chronicle);
        let story = name_or(input.story_name.as_deref(), &self.default_story);
        info!(chronicle = %chronicle, story = %story, "Handling start_chronolog");

        match self.sessions.start(chronicle, story).await {
            Ok(binding) => format!(
                "ChronoLog session started: chronicle='{}', story='{}'",
                binding.chronicle, binding.story
            ),
            Err(report) => {
                if !report.suppressed.is_empty() {
                    debug!(suppressed = report.suppressed.len(), "Cleanup errors suppressed");
                }
                report.to_string()
            }
        }
    }

    /// Handle record_interaction tool call.
    pub async fn handle_record(&self, input: RecordInteractionInput) -> String {
        debug!("Handling record_interaction");

        match self
            .sessions
            .record(&input.user_message, &input.assistant_message)
            .await
        {
            Ok(()) => "Interaction recorded to ChronoLog".to_string(),
            Err(ChronologError::NoActiveSession) => NO_SESSION_TO_RECORD.to_string(),
            Err(e) => e.to_string(),
        }
    }

    /// Handle stop_chronolog tool call.
    pub async fn handle_stop(&self) -> String {
        info!("Handling stop_chronolog");

        match self.sessions.stop().await {
            Ok(_) => "ChronoLog session stopped and disconnected".to_string(),
            Err(ChronologError::NoActiveSession) => NO_SESSION_TO_STOP.to_string(),
            Err(e) => e.to_string(),
        }
    }

    /// Handle retrieve_interaction tool call.
    ///
    /// Answers with the artifact path, or [`NO_RECORDS_FOUND`].
    pub async fn handle_retrieve(&self, input: RetrieveInteractionInput) -> String {
        let chronicle = name_or(input.chronicle_name.as_deref(), &self.default_chronicle);
        let story = name_or(input.story_name.as_deref(), &self.default_story);
        let start = input.start.as_ref().map(TimeArg::to_token);
        let end = input.end.as_ref().map(TimeArg::to_token);
        info!(
            chronicle = %chronicle,
            story = %story,
            start = ?start,
            end = ?end,
            "Handling retrieve_interaction"
        );

        match self
            .extractor
            .retrieve(chronicle, story, start.as_deref(), end.as_deref())
            .await
        {
            Ok(RetrievalOutcome::Records(set)) => set.artifact_path.display().to_string(),
            Ok(RetrievalOutcome::NoRecordsFound) => NO_RECORDS_FOUND.to_string(),
            Err(e) => {
                warn!(error = %e, "Retrieval failed");
                e.to_string()
            }
        }
    }
}

fn text(message: String) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(message)]))
}

#[tool_router]
impl ChronologMcpServer {
    #[tool(
        description = "Start a ChronoLog session: connect, create or open a chronicle, and acquire a story for recording. Uses the configured chronicle and story when names are omitted."
    )]
    async fn start_chronolog(
        &self,
        Parameters(input): Parameters<StartChronologInput>,
    ) -> Result<CallToolResult, McpError> {
        text(self.handle_start(input).await)
    }

    #[tool(
        description = "Append one user/assistant exchange to the story acquired by start_chronolog."
    )]
    async fn record_interaction(
        &self,
        Parameters(input): Parameters<RecordInteractionInput>,
    ) -> Result<CallToolResult, McpError> {
        text(self.handle_record(input).await)
    }

    #[tool(description = "Release the acquired story and disconnect from ChronoLog.")]
    async fn stop_chronolog(&self) -> Result<CallToolResult, McpError> {
        text(self.handle_stop().await)
    }

    #[tool(
        description = "Retrieve recorded interactions for a chronicle and story. start and end accept nanosecond timestamps, yesterday/today/tomorrow, or YYYY-MM-DD dates. Returns the path of a file with one record per line, or 'No records found.'."
    )]
    async fn retrieve_interaction(
        &self,
        Parameters(input): Parameters<RetrieveInteractionInput>,
    ) -> Result<CallToolResult, McpError> {
        text(self.handle_retrieve(input).await)
    }
}

#[tool_handler]
impl ServerHandler for ChronologMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Records assistant conversations in ChronoLog. Call start_chronolog once, \
                 record_interaction after each exchange, stop_chronolog when done, and \
                 retrieve_interaction to read past records. Recorded interactions are \
                 journaled to local JSON-lines files under the configured journal \
                 directory; retrieve_interaction reads ChronoLog's stored records through \
                 the HDF5 reader, so it does not see journaled interactions."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            ..Default::default()
        }
    }
}

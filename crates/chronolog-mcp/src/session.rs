//! ChronoLog session lifecycle.
//!
//! A session binds the process to one (chronicle, story) pair on the
//! backend. Only one session exists per [`SessionManager`], and every
//! operation takes the manager's lock for its whole duration, so backend
//! calls for a session never interleave.
//!
//! ```text
//! Disconnected ──start(ok)──► StoryAcquired ──stop(ok)──► Disconnected
//!      ▲                        │    ▲
//!      └──start(failed)         └────┘ record
//! ```
//!
//! Starting while a story is already acquired tears the old binding down
//! first. If that teardown fails, the new start is refused and the old
//! binding stays in place.

use chronolog_common::{
    Attributes, ChronologClient, ChronologError, FailureReport, Result, StoryHandle, CL_SUCCESS,
    DEFAULT_FLAGS,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Observable session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connected,
    ChronicleReady,
    StoryAcquired,
}

/// Names of the chronicle and story a session is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub chronicle: String,
    pub story: String,
}

pub type SessionStarted = Binding;
pub type SessionStopped = Binding;

// The handle lives only in `StoryAcquired`, so it is present exactly when a
// story is acquired.
enum Session {
    Disconnected,
    Connected,
    ChronicleReady,
    StoryAcquired {
        binding: Binding,
        handle: Box<dyn StoryHandle>,
    },
    // Story released but the disconnect failed; stop retries the disconnect.
    Released {
        binding: Binding,
    },
}

impl Session {
    fn state(&self) -> SessionState {
        match self {
            Session::Disconnected => SessionState::Disconnected,
            Session::Connected | Session::Released { .. } => SessionState::Connected,
            Session::ChronicleReady => SessionState::ChronicleReady,
            Session::StoryAcquired { .. } => SessionState::StoryAcquired,
        }
    }

    fn holds_backend(&self) -> bool {
        matches!(
            self,
            Session::StoryAcquired { .. } | Session::Released { .. }
        )
    }
}

/// Owns the backend client and the single active session.
pub struct SessionManager {
    client: Arc<dyn ChronologClient>,
    session: Mutex<Session>,
}

impl SessionManager {
    pub fn new(client: Arc<dyn ChronologClient>) -> Self {
        Self {
            client,
            session: Mutex::new(Session::Disconnected),
        }
    }

    pub async fn state(&self) -> SessionState {
        self.session.lock().await.state()
    }

    /// The acquired chronicle/story, if any.
    pub async fn binding(&self) -> Option<Binding> {
        match &*self.session.lock().await {
            Session::StoryAcquired { binding, .. } => Some(binding.clone()),
            _ => None,
        }
    }

    /// Connect, create the chronicle and acquire the story.
    ///
    /// Any failure after connecting triggers best-effort cleanup; errors from
    /// that cleanup are kept in the report's `suppressed` list and never
    /// replace the original failure.
    pub async fn start(
        &self,
        chronicle: &str,
        story: &str,
    ) -> std::result::Result<SessionStarted, FailureReport> {
        let mut session = self.session.lock().await;

        if session.holds_backend() {
            info!("Replacing active session");
            self.teardown(&mut session).await?;
        }

        info!(chronicle = %chronicle, story = %story, "Starting ChronoLog session");

        let code = self.client.connect().await;
        if code != CL_SUCCESS {
            warn!(code = code, "Connect failed");
            return Err(ChronologError::ConnectFailed(code).into());
        }
        *session = Session::Connected;

        let attrs = Attributes::new();
        let code = self
            .client
            .create_chronicle(chronicle, &attrs, DEFAULT_FLAGS)
            .await;
        if code != CL_SUCCESS {
            warn!(chronicle = %chronicle, code = code, "Chronicle creation failed");
            let mut report = FailureReport::new(ChronologError::ChronicleCreateFailed {
                name: chronicle.to_string(),
                code,
            });
            self.disconnect_quietly(&mut report).await;
            *session = Session::Disconnected;
            return Err(report);
        }
        *session = Session::ChronicleReady;

        match self
            .client
            .acquire_story(chronicle, story, &attrs, DEFAULT_FLAGS)
            .await
        {
            Ok(handle) => {
                let binding = Binding {
                    chronicle: chronicle.to_string(),
                    story: story.to_string(),
                };
                *session = Session::StoryAcquired {
                    binding: binding.clone(),
                    handle,
                };
                info!(chronicle = %chronicle, story = %story, "Story acquired");
                Ok(binding)
            }
            Err(code) => {
                warn!(
                    chronicle = %chronicle,
                    story = %story,
                    code = code,
                    "Story acquisition failed"
                );
                let mut report = FailureReport::new(ChronologError::StoryAcquireFailed {
                    chronicle: chronicle.to_string(),
                    story: story.to_string(),
                    code,
                });
                let code = self.client.release_story(chronicle, story).await;
                if code != CL_SUCCESS {
                    report.suppress(ChronologError::ReleaseFailed {
                        story: story.to_string(),
                        code,
                    });
                }
                self.disconnect_quietly(&mut report).await;
                *session = Session::Disconnected;
                Err(report)
            }
        }
    }

    /// Append one interaction to the acquired story.
    pub async fn record(&self, user_message: &str, assistant_message: &str) -> Result<()> {
        let session = self.session.lock().await;
        let Session::StoryAcquired { binding, handle } = &*session else {
            return Err(ChronologError::NoActiveSession);
        };

        let entry = format_interaction(user_message, assistant_message);
        let code = handle.log_event(&entry).await;
        if code != CL_SUCCESS {
            warn!(story = %binding.story, code = code, "Event append failed");
            return Err(ChronologError::WriteFailed(code));
        }

        debug!(story = %binding.story, bytes = entry.len(), "Interaction recorded");
        Ok(())
    }

    /// Release the story and disconnect.
    ///
    /// A failed release leaves the session untouched so the stop can be
    /// retried.
    pub async fn stop(&self) -> Result<SessionStopped> {
        let mut session = self.session.lock().await;
        self.teardown(&mut session).await
    }

    /// Stop the session if one is active, logging rather than returning
    /// failures. Used on process shutdown.
    pub async fn shutdown(&self) {
        let mut session = self.session.lock().await;
        if !session.holds_backend() {
            return;
        }
        match self.teardown(&mut session).await {
            Ok(binding) => info!(
                chronicle = %binding.chronicle,
                story = %binding.story,
                "Session closed on shutdown"
            ),
            Err(e) => warn!(error = %e, "Failed to close session on shutdown"),
        }
    }

    async fn teardown(&self, session: &mut Session) -> Result<SessionStopped> {
        let binding = match std::mem::replace(session, Session::Disconnected) {
            Session::StoryAcquired { binding, handle } => {
                let code = self
                    .client
                    .release_story(&binding.chronicle, &binding.story)
                    .await;
                if code != CL_SUCCESS {
                    warn!(story = %binding.story, code = code, "Story release failed");
                    let story = binding.story.clone();
                    *session = Session::StoryAcquired { binding, handle };
                    return Err(ChronologError::ReleaseFailed { story, code });
                }
                binding
            }
            Session::Released { binding } => binding,
            other => {
                *session = other;
                return Err(ChronologError::NoActiveSession);
            }
        };

        let code = self.client.disconnect().await;
        if code != CL_SUCCESS {
            warn!(code = code, "Disconnect failed");
            *session = Session::Released { binding };
            return Err(ChronologError::DisconnectFailed(code));
        }

        info!(chronicle = %binding.chronicle, story = %binding.story, "ChronoLog session stopped");
        Ok(binding)
    }

    async fn disconnect_quietly(&self, report: &mut FailureReport) {
        let code = self.client.disconnect().await;
        if code != CL_SUCCESS {
            report.suppress(ChronologError::DisconnectFailed(code));
        }
    }
}

/// Event text stored for one interaction.
pub fn format_interaction(user_message: &str, assistant_message: &str) -> String {
    format!("user: {user_message}, assistant: {assistant_message}")
}

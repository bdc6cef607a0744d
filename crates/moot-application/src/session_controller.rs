//! SessionController - owns one persona connection and its lifecycle.
//!
//! The controller drives `Idle -> CreatingToken -> Connecting -> Connected ->
//! Streaming <-> Interrupted` and tears everything down through `Stopped`
//! back to `Idle`. Inbound persona events are registered per kind at connect
//! time and pumped into the controller until teardown.
//!
//! Every gateway failure is caught here and turned into a status update; no
//! error escapes to the caller.

use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use std::time::Duration;

use moot_core::error::MootError;
use moot_core::persona::{
    ChatMessage, ConnectionState, ListenerId, PersonaClient, PersonaEvent, PersonaEventKind,
    PersonaGateway, PersonaProfile, PersonaSession,
};
use moot_core::status::{FailureKind, SessionStatus};
use strum::IntoEnumIterator;
use tokio::sync::{Mutex, RwLock, mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::call::bounded;

/// Messages sent while the stream is interrupted are held back, up to this
/// many, and delivered in order once the latest resume succeeds.
pub const MESSAGE_QUEUE_LIMIT: usize = 32;

#[derive(Clone)]
pub struct SessionController {
    inner: Arc<Inner>,
}

struct Inner {
    gateway: Arc<dyn PersonaGateway>,
    profile: PersonaProfile,
    request_timeout: Duration,
    slot: Mutex<Slot>,
    status_tx: watch::Sender<SessionStatus>,
    history: RwLock<Vec<ChatMessage>>,
}

/// Mutable connection state. The lock is never held across a gateway call.
struct Slot {
    state: ConnectionState,
    /// Bumped by every start and stop; in-flight work compares against it
    generation: u64,
    session: Option<PersonaSession>,
    client: Option<Arc<dyn PersonaClient>>,
    listeners: Vec<ListenerId>,
    pump: Option<CancellationToken>,
    pending: VecDeque<String>,
    /// Bumped once per interruption, in arrival order
    interruption_seq: u64,
    /// Interruption whose successful resume is draining `pending`
    flushing: Option<u64>,
}

impl Slot {
    fn transition(&mut self, next: ConnectionState) {
        if !self.state.can_transition_to(next) {
            tracing::warn!(target: "session", "Unexpected transition {} -> {}", self.state, next);
        }
        tracing::debug!(target: "session", "{} -> {}", self.state, next);
        self.state = next;
        if let Some(session) = self.session.as_mut() {
            session.state = next;
        }
    }

    fn active_client(&self) -> Option<Arc<dyn PersonaClient>> {
        if self.state.has_client() {
            self.client.clone()
        } else {
            None
        }
    }

    /// Detaches everything owned by the current connection.
    fn take_connection(&mut self) -> Option<Teardown> {
        self.session = None;
        self.pending.clear();
        self.flushing = None;
        let listeners = std::mem::take(&mut self.listeners);
        let pump = self.pump.take();
        let client = self.client.take()?;
        Some(Teardown {
            client,
            listeners,
            pump,
        })
    }
}

struct Teardown {
    client: Arc<dyn PersonaClient>,
    listeners: Vec<ListenerId>,
    pump: Option<CancellationToken>,
}

impl Teardown {
    async fn run(self, limit: Duration) {
        if let Some(pump) = self.pump {
            pump.cancel();
        }
        for id in self.listeners {
            self.client.remove_listener(id);
        }
        if let Err(err) = bounded("stop_streaming", limit, self.client.stop_streaming()).await {
            tracing::warn!(target: "session", "Failed to stop streaming: {}", err);
        }
    }
}

/// A resume recorded under the slot lock and not yet issued.
struct Resume {
    client: Arc<dyn PersonaClient>,
    generation: u64,
    seq: u64,
    correlation_id: String,
}

enum Delivery {
    Send(Arc<dyn PersonaClient>),
    /// Held back while interrupted
    Queued,
    /// Held back behind messages still being flushed
    QueuedBehindFlush,
    QueueFull,
    NoSession,
}

impl SessionController {
    pub fn new(
        gateway: Arc<dyn PersonaGateway>,
        profile: PersonaProfile,
        request_timeout: Duration,
    ) -> Self {
        let (status_tx, _) = watch::channel(SessionStatus::default());
        Self {
            inner: Arc::new(Inner {
                gateway,
                profile,
                request_timeout,
                slot: Mutex::new(Slot {
                    state: ConnectionState::Idle,
                    generation: 0,
                    session: None,
                    client: None,
                    listeners: Vec::new(),
                    pump: None,
                    pending: VecDeque::new(),
                    interruption_seq: 0,
                    flushing: None,
                }),
                status_tx,
                history: RwLock::new(Vec::new()),
            }),
        }
    }

    pub fn profile(&self) -> &PersonaProfile {
        &self.inner.profile
    }

    pub async fn connection_state(&self) -> ConnectionState {
        self.inner.slot.lock().await.state
    }

    /// The most recent status.
    pub fn status(&self) -> SessionStatus {
        self.inner.status_tx.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SessionStatus> {
        self.inner.status_tx.subscribe()
    }

    /// Latest conversation history reported by the persona.
    pub async fn message_history(&self) -> Vec<ChatMessage> {
        self.inner.history.read().await.clone()
    }

    pub async fn queued_messages(&self) -> usize {
        self.inner.slot.lock().await.pending.len()
    }

    /// Issues a fresh session token, connects, and binds the persona stream
    /// to `target`.
    ///
    /// Only valid from `Idle`. Any failure drops the partial session and
    /// returns to `Idle` with a connection-error status; calling again retries.
    pub async fn start_chat(&self, target: &str, context: Option<&str>) {
        let generation = {
            let mut slot = self.inner.slot.lock().await;
            if slot.state != ConnectionState::Idle {
                tracing::warn!(target: "session", "start_chat ignored while {}", slot.state);
                return;
            }
            slot.generation += 1;
            slot.pending.clear();
            slot.transition(ConnectionState::CreatingToken);
            slot.generation
        };
        self.inner.history.write().await.clear();
        self.inner.publish(SessionStatus::info("Creating session..."));

        if let Err(err) = self.inner.establish(generation, target, context).await {
            self.inner.fail_connect(generation, err).await;
        }
    }

    pub async fn mute(&self, muted: bool) {
        let Some(client) = self.inner.slot.lock().await.active_client() else {
            tracing::debug!(target: "session", "mute ignored: no active session");
            return;
        };

        let timeout = self.inner.request_timeout;
        let result = if muted {
            bounded("mute_input", timeout, client.mute_input()).await
        } else {
            bounded("unmute_input", timeout, client.unmute_input()).await
        };

        match result {
            Ok(()) => self.inner.publish(SessionStatus::info(if muted {
                "Audio muted."
            } else {
                "Audio unmuted."
            })),
            Err(err) => {
                tracing::warn!(target: "session", "Failed to mute/unmute audio: {}", err);
                self.inner.publish(SessionStatus::failure(
                    FailureKind::Command,
                    if muted {
                        "Failed to mute audio."
                    } else {
                        "Failed to unmute audio."
                    },
                ));
            }
        }
    }

    /// Sends a user message to the persona.
    ///
    /// Without a session this does nothing. While interrupted the message is
    /// queued (see [`MESSAGE_QUEUE_LIMIT`]), and after a resume it stays
    /// behind the queued messages until they have all been delivered.
    pub async fn send_message(&self, text: &str) {
        if text.trim().is_empty() {
            tracing::debug!(target: "session", "Ignoring empty message");
            return;
        }

        let delivery = {
            let mut slot = self.inner.slot.lock().await;
            let state = slot.state;
            let interrupted = state == ConnectionState::Interrupted;
            let behind_flush = state == ConnectionState::Streaming && slot.flushing.is_some();
            if !(interrupted || behind_flush) {
                slot.active_client().map_or(Delivery::NoSession, Delivery::Send)
            } else if slot.pending.len() >= MESSAGE_QUEUE_LIMIT {
                Delivery::QueueFull
            } else {
                slot.pending.push_back(text.to_string());
                if interrupted {
                    Delivery::Queued
                } else {
                    Delivery::QueuedBehindFlush
                }
            }
        };

        match delivery {
            Delivery::Send(client) => self.inner.deliver(&client, text).await,
            Delivery::Queued => {
                tracing::debug!(target: "session", "Message queued until the stream resumes");
                self.inner.publish(SessionStatus::info(
                    "Stream interrupted. Message queued until it resumes.",
                ));
            }
            Delivery::QueuedBehindFlush => {
                tracing::debug!(target: "session", "Message queued behind earlier messages");
            }
            Delivery::QueueFull => {
                tracing::warn!(target: "session", "Message queue full ({} pending)", MESSAGE_QUEUE_LIMIT);
                self.inner.publish(SessionStatus::failure(
                    FailureKind::Command,
                    "Message queue full. Message not sent.",
                ));
            }
            Delivery::NoSession => {
                tracing::debug!(target: "session", "send_message ignored: no active session");
            }
        }
    }

    /// Stops the generation the persona is currently speaking.
    pub async fn stop_generation(&self) {
        let Some(client) = self.inner.slot.lock().await.active_client() else {
            tracing::debug!(target: "session", "stop_generation ignored: no active session");
            return;
        };

        match bounded("interrupt_generation", self.inner.request_timeout, client.interrupt_generation()).await {
            Ok(()) => self
                .inner
                .publish(SessionStatus::info("Current generation stopped.")),
            Err(err) => {
                tracing::warn!(target: "session", "Failed to stop current generation: {}", err);
                self.inner.publish(SessionStatus::failure(
                    FailureKind::Command,
                    "Failed to stop current generation.",
                ));
            }
        }
    }

    /// Stopping the stream ends the session; same as [`Self::stop`].
    pub async fn stop_streaming(&self) {
        self.stop().await;
    }

    /// Resumes after a talk-stream interruption.
    ///
    /// Interruptions may overlap: only the outcome of the most recent
    /// correlation id is applied.
    pub async fn handle_interruption(&self, correlation_id: &str) {
        self.inner.handle_interruption(correlation_id.to_string()).await;
    }

    /// Re-issues the resume for the last interruption after a failed attempt.
    pub async fn retry_resume(&self) {
        let correlation_id = {
            let slot = self.inner.slot.lock().await;
            if slot.state == ConnectionState::Interrupted {
                slot.session
                    .as_ref()
                    .and_then(|s| s.last_correlation_id.clone())
            } else {
                None
            }
        };

        match correlation_id {
            Some(id) => self.inner.handle_interruption(id).await,
            None => tracing::debug!(target: "session", "retry_resume ignored: stream not interrupted"),
        }
    }

    /// Tears the session down and returns to `Idle`.
    ///
    /// Always succeeds. Without a session there is nothing to tear down and
    /// no gateway call is made; repeated calls are no-ops.
    pub async fn stop(&self) {
        let teardown = {
            let mut slot = self.inner.slot.lock().await;
            if matches!(slot.state, ConnectionState::Idle | ConnectionState::Stopped) {
                tracing::debug!(target: "session", "stop ignored while {}", slot.state);
                return;
            }
            slot.generation += 1;
            let teardown = slot.take_connection();
            slot.transition(ConnectionState::Stopped);
            teardown
        };

        if let Some(teardown) = teardown {
            teardown.run(self.inner.request_timeout).await;
        }

        {
            let mut slot = self.inner.slot.lock().await;
            if slot.state == ConnectionState::Stopped {
                slot.transition(ConnectionState::Idle);
            }
        }
        tracing::info!(target: "session", "Session with {} stopped", self.inner.profile.display_name);
        self.inner.publish(SessionStatus::info("Streaming stopped."));
    }
}

impl Inner {
    fn publish(&self, status: SessionStatus) {
        tracing::debug!(target: "session", "Status: {}", status.message);
        self.status_tx.send_replace(status);
    }

    async fn establish(
        self: &Arc<Self>,
        generation: u64,
        target: &str,
        context: Option<&str>,
    ) -> Result<(), MootError> {
        let config = self.profile.to_config(context)?;
        let token = bounded(
            "issue_session_token",
            self.request_timeout,
            self.gateway.issue_session_token(&config),
        )
        .await?;
        tracing::debug!(target: "session", "Session token issued: {}", token.redacted());

        {
            let mut slot = self.slot.lock().await;
            if slot.generation != generation {
                return Ok(());
            }
            slot.transition(ConnectionState::Connecting);
        }
        self.publish(SessionStatus::info("Connecting..."));

        let client = bounded("connect", self.request_timeout, self.gateway.connect(&token)).await?;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        {
            let mut slot = self.slot.lock().await;
            if slot.generation != generation {
                drop(slot);
                tracing::info!(target: "session", "Connection completed after stop; discarding it");
                Teardown {
                    client,
                    listeners: Vec::new(),
                    pump: None,
                }
                .run(self.request_timeout)
                .await;
                return Ok(());
            }

            let listeners = PersonaEventKind::iter()
                .map(|kind| client.add_listener(kind, events_tx.clone()))
                .collect();
            let pump = CancellationToken::new();
            tokio::spawn(run_event_pump(Arc::downgrade(self), events_rx, pump.clone()));

            slot.session = Some(PersonaSession::new(token));
            slot.client = Some(Arc::clone(&client));
            slot.listeners = listeners;
            slot.pump = Some(pump);
            slot.transition(ConnectionState::Connected);
        }
        drop(events_tx);

        bounded("stream_to", self.request_timeout, client.stream_to(target)).await?;

        {
            let mut slot = self.slot.lock().await;
            if slot.generation != generation || slot.state != ConnectionState::Connected {
                return Ok(());
            }
            slot.transition(ConnectionState::Streaming);
        }
        tracing::info!(target: "session", "Streaming {} to {}", self.profile.display_name, target);
        self.publish(SessionStatus::info(format!(
            "Connected! Start speaking to {}",
            self.profile.display_name
        )));
        Ok(())
    }

    async fn fail_connect(&self, generation: u64, err: MootError) {
        let teardown = {
            let mut slot = self.slot.lock().await;
            if slot.generation != generation {
                tracing::debug!(target: "session", "Ignoring failure of a stopped start: {}", err);
                return;
            }
            let teardown = slot.take_connection();
            slot.transition(ConnectionState::Idle);
            teardown
        };

        tracing::error!(target: "session", "Failed to start chat: {}", err);
        if let Some(teardown) = teardown {
            teardown.run(self.request_timeout).await;
        }
        self.publish(SessionStatus::failure(
            FailureKind::Connect,
            "Failed to connect. Check your API key.",
        ));
    }

    async fn deliver(&self, client: &Arc<dyn PersonaClient>, text: &str) {
        match bounded("send_user_message", self.request_timeout, client.send_user_message(text)).await {
            Ok(()) => self.publish(SessionStatus::info("Message sent.")),
            Err(err) => {
                tracing::warn!(target: "session", "Failed to send user message: {}", err);
                self.publish(SessionStatus::failure(
                    FailureKind::Command,
                    "Failed to send message.",
                ));
            }
        }
    }

    async fn handle_interruption(&self, correlation_id: String) {
        if let Some(resume) = self.begin_interruption(correlation_id).await {
            self.resume(resume).await;
        }
    }

    /// Marks the stream interrupted and records `correlation_id` as the
    /// latest interruption. Callers issue the returned resume.
    async fn begin_interruption(&self, correlation_id: String) -> Option<Resume> {
        let resume = {
            let mut slot = self.slot.lock().await;
            if !matches!(
                slot.state,
                ConnectionState::Streaming | ConnectionState::Interrupted
            ) {
                tracing::debug!(target: "session", "Interruption {} ignored while {}", correlation_id, slot.state);
                return None;
            }
            let client = slot.client.clone()?;
            slot.transition(ConnectionState::Interrupted);
            slot.interruption_seq += 1;
            slot.flushing = None;
            if let Some(session) = slot.session.as_mut() {
                session.last_correlation_id = Some(correlation_id.clone());
            }
            Resume {
                client,
                generation: slot.generation,
                seq: slot.interruption_seq,
                correlation_id,
            }
        };

        tracing::info!(target: "session", "Stream interrupted (correlation id {})", resume.correlation_id);
        self.publish(SessionStatus::info(
            "Stream interrupted. Attempting to recover...",
        ));
        Some(resume)
    }

    /// Issues the resume; the outcome only applies if no later interruption
    /// was recorded meanwhile.
    async fn resume(&self, resume: Resume) {
        let Resume {
            client,
            generation,
            seq,
            correlation_id,
        } = resume;

        let result = bounded(
            "resume_from_interruption",
            self.request_timeout,
            client.resume_from_interruption(&correlation_id),
        )
        .await;

        {
            let mut slot = self.slot.lock().await;
            if slot.generation != generation {
                return;
            }
            if slot.interruption_seq != seq {
                tracing::debug!(target: "session", "Resume for {} superseded", correlation_id);
                return;
            }
            if result.is_ok() {
                slot.transition(ConnectionState::Streaming);
                slot.flushing = Some(seq);
            }
        }

        match result {
            Ok(()) => {
                tracing::info!(target: "session", "Stream resumed (correlation id {})", correlation_id);
                self.publish(SessionStatus::info("Stream resumed."));
                self.flush_pending(generation, seq).await;
            }
            Err(err) => {
                tracing::warn!(target: "session", "Failed to resume stream {}: {}", correlation_id, err);
                self.publish(SessionStatus::failure(
                    FailureKind::Resume,
                    "Failed to resume stream.",
                ));
            }
        }
    }

    /// Delivers queued messages in order, including ones queued during the
    /// flush, until the queue is empty or another interruption takes over.
    async fn flush_pending(&self, generation: u64, seq: u64) {
        loop {
            let (client, message) = {
                let mut slot = self.slot.lock().await;
                if slot.generation != generation || slot.flushing != Some(seq) {
                    return;
                }
                let Some(client) = slot.client.clone() else {
                    slot.flushing = None;
                    return;
                };
                let Some(message) = slot.pending.pop_front() else {
                    slot.flushing = None;
                    return;
                };
                (client, message)
            };
            self.deliver(&client, &message).await;
        }
    }
}

async fn run_event_pump(
    inner: Weak<Inner>,
    mut events: mpsc::UnboundedReceiver<PersonaEvent>,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };
        let Some(inner) = inner.upgrade() else {
            break;
        };

        match event {
            PersonaEvent::ConnectionEstablished => {
                tracing::debug!(target: "session", "Persona connection established");
            }
            PersonaEvent::TalkStreamInterrupted { correlation_id } => {
                // Recorded in arrival order; only the resume runs concurrently
                if let Some(resume) = inner.begin_interruption(correlation_id).await {
                    tokio::spawn(async move {
                        inner.resume(resume).await;
                    });
                }
            }
            PersonaEvent::MessageHistoryUpdated { messages } => {
                tracing::debug!(target: "session", "Message history updated ({} messages)", messages.len());
                *inner.history.write().await = messages;
            }
            PersonaEvent::MessageStreamEvent { event } => {
                tracing::trace!(target: "session", "Message stream event: {}", event);
            }
        }
    }
    tracing::debug!(target: "session", "Event pump stopped");
}

#[cfg(test)]
#[path = "session_controller_test.rs"]
mod tests;

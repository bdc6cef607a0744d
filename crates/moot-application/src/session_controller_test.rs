use super::*;
use async_trait::async_trait;
use moot_core::error::Result;
use moot_core::persona::{PersonaConfig, PersonaListener, SessionToken};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::Notify;

// Mock PersonaClient recording every command
#[derive(Default)]
struct MockClient {
    calls: StdMutex<Vec<String>>,
    failing: StdMutex<HashSet<String>>,
    resume_gates: StdMutex<HashMap<String, Arc<Notify>>>,
    send_gates: StdMutex<HashMap<String, Arc<Notify>>>,
    listeners: StdMutex<Vec<(ListenerId, PersonaEventKind, PersonaListener)>>,
    next_listener: AtomicU64,
}

impl MockClient {
    fn record(&self, call: String) -> Result<()> {
        let failed = {
            let failing = self.failing.lock().unwrap();
            let op = call.split(':').next().unwrap_or_default();
            failing.contains(&call) || failing.contains(op)
        };
        self.calls.lock().unwrap().push(call.clone());
        if failed {
            Err(MootError::gateway(Some(500), format!("{call} failed"), true))
        } else {
            Ok(())
        }
    }

    fn fail(&self, call: &str) {
        self.failing.lock().unwrap().insert(call.to_string());
    }

    fn heal(&self, call: &str) {
        self.failing.lock().unwrap().remove(call);
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == call).count()
    }

    /// Holds `resume:<id>` until the returned notify fires.
    fn gate_resume(&self, id: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.resume_gates
            .lock()
            .unwrap()
            .insert(id.to_string(), gate.clone());
        gate
    }

    /// Holds `send:<text>` until the returned notify fires.
    fn gate_send(&self, text: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.send_gates
            .lock()
            .unwrap()
            .insert(text.to_string(), gate.clone());
        gate
    }

    fn sends(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with("send:"))
            .collect()
    }

    fn emit(&self, event: PersonaEvent) {
        for (_, kind, listener) in self.listeners.lock().unwrap().iter() {
            if *kind == event.kind() {
                let _ = listener.send(event.clone());
            }
        }
    }

    fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap().len()
    }
}

#[async_trait]
impl PersonaClient for MockClient {
    async fn stream_to(&self, target: &str) -> Result<()> {
        self.record(format!("stream_to:{target}"))
    }

    async fn stop_streaming(&self) -> Result<()> {
        self.record("stop_streaming".to_string())
    }

    async fn interrupt_generation(&self) -> Result<()> {
        self.record("interrupt_generation".to_string())
    }

    async fn resume_from_interruption(&self, correlation_id: &str) -> Result<()> {
        let gate = self.resume_gates.lock().unwrap().get(correlation_id).cloned();
        self.calls
            .lock()
            .unwrap()
            .push(format!("resume_started:{correlation_id}"));
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.record(format!("resume:{correlation_id}"))
    }

    async fn mute_input(&self) -> Result<()> {
        self.record("mute_input".to_string())
    }

    async fn unmute_input(&self) -> Result<()> {
        self.record("unmute_input".to_string())
    }

    async fn send_user_message(&self, text: &str) -> Result<()> {
        let gate = self.send_gates.lock().unwrap().get(text).cloned();
        if let Some(gate) = gate {
            self.calls
                .lock()
                .unwrap()
                .push(format!("send_started:{text}"));
            gate.notified().await;
        }
        self.record(format!("send:{text}"))
    }

    fn add_listener(&self, kind: PersonaEventKind, listener: PersonaListener) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::SeqCst));
        self.listeners.lock().unwrap().push((id, kind, listener));
        id
    }

    fn remove_listener(&self, id: ListenerId) {
        self.listeners.lock().unwrap().retain(|(l, _, _)| *l != id);
    }
}

// Mock PersonaGateway handing out a shared MockClient
#[derive(Default)]
struct MockGateway {
    client: Arc<MockClient>,
    token_calls: AtomicU64,
    connect_calls: AtomicU64,
    fail_token: AtomicBool,
    connect_gate: StdMutex<Option<Arc<Notify>>>,
    last_prompt: StdMutex<Option<String>>,
}

impl MockGateway {
    fn gate_connect(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.connect_gate.lock().unwrap() = Some(gate.clone());
        gate
    }
}

#[async_trait]
impl PersonaGateway for MockGateway {
    async fn issue_session_token(&self, config: &PersonaConfig) -> Result<SessionToken> {
        self.token_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some(config.system_prompt.clone());
        if self.fail_token.load(Ordering::SeqCst) {
            return Err(MootError::gateway(Some(401), "Unauthorized", false));
        }
        Ok(SessionToken::new("tok-test"))
    }

    async fn connect(&self, _token: &SessionToken) -> Result<Arc<dyn PersonaClient>> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.connect_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let client: Arc<dyn PersonaClient> = self.client.clone();
        Ok(client)
    }
}

fn judge() -> PersonaProfile {
    PersonaProfile {
        id: "judge".to_string(),
        display_name: "Judge Richard".to_string(),
        avatar_id: "avatar".to_string(),
        voice_id: "voice".to_string(),
        model_id: "llm".to_string(),
        base_prompt: "You are a High Court judge.".to_string(),
    }
}

fn controller_with(gateway: &Arc<MockGateway>) -> SessionController {
    SessionController::new(gateway.clone(), judge(), Duration::from_secs(5))
}

async fn streaming_controller() -> (SessionController, Arc<MockGateway>, Arc<MockClient>) {
    let gateway = Arc::new(MockGateway::default());
    let controller = controller_with(&gateway);
    controller.start_chat("persona-video", None).await;
    assert_eq!(controller.connection_state().await, ConnectionState::Streaming);
    let client = gateway.client.clone();
    (controller, gateway, client)
}

async fn eventually(check: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !check() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("condition not reached");
}

async fn wait_for_state(controller: &SessionController, state: ConnectionState) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while controller.connection_state().await != state {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("state not reached");
}

#[tokio::test]
async fn test_commands_while_idle_make_no_gateway_calls() {
    let gateway = Arc::new(MockGateway::default());
    let controller = controller_with(&gateway);

    controller.mute(true).await;
    controller.mute(false).await;
    controller.send_message("Good morning, my lady").await;
    controller.stop_generation().await;
    controller.stop_streaming().await;
    controller.retry_resume().await;
    controller.handle_interruption("abc").await;
    controller.stop().await;

    assert_eq!(controller.connection_state().await, ConnectionState::Idle);
    assert!(gateway.client.calls().is_empty());
    assert_eq!(gateway.token_calls.load(Ordering::SeqCst), 0);
    assert_eq!(controller.status(), SessionStatus::default());
}

#[tokio::test]
async fn test_start_chat_reaches_streaming() {
    let (controller, gateway, client) = streaming_controller().await;

    assert_eq!(gateway.token_calls.load(Ordering::SeqCst), 1);
    assert_eq!(client.calls(), vec!["stream_to:persona-video".to_string()]);
    assert_eq!(client.listener_count(), PersonaEventKind::iter().count());
    assert_eq!(
        controller.status().message,
        "Connected! Start speaking to Judge Richard"
    );
    assert!(!controller.status().is_failure());
}

#[tokio::test]
async fn test_case_context_reaches_system_prompt() {
    let gateway = Arc::new(MockGateway::default());
    let controller = controller_with(&gateway);

    controller
        .start_chat("persona-video", Some("The witness saw a blue car."))
        .await;

    let prompt = gateway.last_prompt.lock().unwrap().clone().unwrap();
    assert_eq!(
        prompt,
        "You are a High Court judge.\n\n[CASE CONTEXT]\nThe witness saw a blue car."
    );
}

#[tokio::test]
async fn test_start_while_active_is_ignored() {
    let (controller, gateway, _client) = streaming_controller().await;

    controller.start_chat("persona-video", None).await;

    assert_eq!(gateway.token_calls.load(Ordering::SeqCst), 1);
    assert_eq!(controller.connection_state().await, ConnectionState::Streaming);
}

#[tokio::test]
async fn test_token_failure_returns_to_idle_and_can_retry() {
    let gateway = Arc::new(MockGateway::default());
    gateway.fail_token.store(true, Ordering::SeqCst);
    let controller = controller_with(&gateway);

    controller.start_chat("persona-video", None).await;

    assert_eq!(controller.connection_state().await, ConnectionState::Idle);
    assert_eq!(gateway.connect_calls.load(Ordering::SeqCst), 0);
    let status = controller.status();
    assert_eq!(status.failure, Some(FailureKind::Connect));
    assert_eq!(status.message, "Failed to connect. Check your API key.");

    gateway.fail_token.store(false, Ordering::SeqCst);
    controller.start_chat("persona-video", None).await;
    assert_eq!(controller.connection_state().await, ConnectionState::Streaming);
    assert_eq!(gateway.token_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_stream_bind_failure_drops_partial_session() {
    let gateway = Arc::new(MockGateway::default());
    gateway.client.fail("stream_to");
    let controller = controller_with(&gateway);

    controller.start_chat("persona-video", None).await;

    assert_eq!(controller.connection_state().await, ConnectionState::Idle);
    assert_eq!(gateway.client.listener_count(), 0);
    assert_eq!(gateway.client.count("stop_streaming"), 1);
    assert_eq!(controller.status().failure, Some(FailureKind::Connect));

    // Nothing is left to send through
    controller.send_message("hello").await;
    assert_eq!(gateway.client.count("send:hello"), 0);
}

#[tokio::test]
async fn test_interruption_resumes_stream() {
    let (controller, _gateway, client) = streaming_controller().await;

    controller.handle_interruption("abc").await;

    assert_eq!(client.count("resume:abc"), 1);
    assert_eq!(controller.connection_state().await, ConnectionState::Streaming);
    assert_eq!(controller.status().message, "Stream resumed.");
}

#[tokio::test]
async fn test_failed_resume_stays_interrupted_until_retry() {
    let (controller, _gateway, client) = streaming_controller().await;
    client.fail("resume:abc");

    controller.handle_interruption("abc").await;

    assert_eq!(controller.connection_state().await, ConnectionState::Interrupted);
    let status = controller.status();
    assert_eq!(status.failure, Some(FailureKind::Resume));
    assert_eq!(status.message, "Failed to resume stream.");

    client.heal("resume:abc");
    controller.retry_resume().await;

    assert_eq!(client.count("resume:abc"), 2);
    assert_eq!(controller.connection_state().await, ConnectionState::Streaming);
}

#[tokio::test]
async fn test_interruption_event_from_client_is_handled() {
    let (controller, _gateway, client) = streaming_controller().await;

    client.emit(PersonaEvent::TalkStreamInterrupted {
        correlation_id: "evt-1".to_string(),
    });

    let probe = client.clone();
    eventually(move || probe.count("resume:evt-1") == 1).await;
    wait_for_state(&controller, ConnectionState::Streaming).await;
}

#[tokio::test]
async fn test_latest_interruption_wins() {
    let (controller, _gateway, client) = streaming_controller().await;
    let first_gate = client.gate_resume("first");
    client.fail("resume:first");

    let background = controller.clone();
    let first = tokio::spawn(async move { background.handle_interruption("first").await });
    let probe = client.clone();
    eventually(move || probe.count("resume_started:first") == 1).await;

    controller.handle_interruption("second").await;
    assert_eq!(controller.connection_state().await, ConnectionState::Streaming);

    // The stale failure must not knock the stream back to Interrupted
    first_gate.notify_one();
    first.await.unwrap();

    assert_eq!(client.count("resume:first"), 1);
    assert_eq!(controller.connection_state().await, ConnectionState::Streaming);
    assert_eq!(controller.status().message, "Stream resumed.");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_latest_interruption_event_is_retried() {
    for _ in 0..25 {
        let (controller, _gateway, client) = streaming_controller().await;
        client.fail("resume:a");
        client.fail("resume:b");

        client.emit(PersonaEvent::TalkStreamInterrupted {
            correlation_id: "a".to_string(),
        });
        client.emit(PersonaEvent::TalkStreamInterrupted {
            correlation_id: "b".to_string(),
        });

        let probe = client.clone();
        eventually(move || probe.count("resume:a") == 1 && probe.count("resume:b") == 1).await;
        wait_for_state(&controller, ConnectionState::Interrupted).await;
        let latest = controller
            .inner
            .slot
            .lock()
            .await
            .session
            .as_ref()
            .and_then(|s| s.last_correlation_id.clone());
        assert_eq!(latest.as_deref(), Some("b"));

        client.heal("resume:b");
        controller.retry_resume().await;

        assert_eq!(client.count("resume:a"), 1);
        assert_eq!(client.count("resume:b"), 2);
        assert_eq!(controller.connection_state().await, ConnectionState::Streaming);
        controller.stop().await;
    }
}

#[tokio::test]
async fn test_messages_queue_while_interrupted() {
    let (controller, _gateway, client) = streaming_controller().await;
    let gate = client.gate_resume("q");

    let background = controller.clone();
    let resume = tokio::spawn(async move { background.handle_interruption("q").await });
    let probe = client.clone();
    eventually(move || probe.count("resume_started:q") == 1).await;
    assert_eq!(controller.connection_state().await, ConnectionState::Interrupted);

    controller.send_message("one").await;
    controller.send_message("two").await;
    assert_eq!(controller.queued_messages().await, 2);
    assert_eq!(client.count("send:one"), 0);

    gate.notify_one();
    resume.await.unwrap();

    let sends: Vec<String> = client
        .calls()
        .into_iter()
        .filter(|c| c.starts_with("send:"))
        .collect();
    assert_eq!(sends, vec!["send:one".to_string(), "send:two".to_string()]);
    assert_eq!(controller.queued_messages().await, 0);
    assert_eq!(controller.status().message, "Message sent.");
}

#[tokio::test]
async fn test_message_sent_during_flush_waits_its_turn() {
    let (controller, _gateway, client) = streaming_controller().await;
    let resume_gate = client.gate_resume("q");
    let send_gate = client.gate_send("one");

    let background = controller.clone();
    let resume = tokio::spawn(async move { background.handle_interruption("q").await });
    let probe = client.clone();
    eventually(move || probe.count("resume_started:q") == 1).await;

    controller.send_message("one").await;
    controller.send_message("two").await;
    resume_gate.notify_one();

    let probe = client.clone();
    eventually(move || probe.count("send_started:one") == 1).await;
    assert_eq!(controller.connection_state().await, ConnectionState::Streaming);

    controller.send_message("three").await;
    assert_eq!(controller.queued_messages().await, 2);
    assert!(client.sends().is_empty());

    send_gate.notify_one();
    resume.await.unwrap();

    assert_eq!(client.sends(), vec!["send:one", "send:two", "send:three"]);
    assert_eq!(controller.queued_messages().await, 0);

    // Once drained, messages go straight through again
    controller.send_message("four").await;
    assert_eq!(client.sends().last().map(String::as_str), Some("send:four"));
}

#[tokio::test]
async fn test_queue_overflow_is_rejected_and_stop_discards() {
    let (controller, _gateway, client) = streaming_controller().await;
    client.fail("resume:x");
    controller.handle_interruption("x").await;

    for i in 0..MESSAGE_QUEUE_LIMIT {
        controller.send_message(&format!("m{i}")).await;
    }
    assert_eq!(controller.queued_messages().await, MESSAGE_QUEUE_LIMIT);

    controller.send_message("overflow").await;
    assert_eq!(controller.queued_messages().await, MESSAGE_QUEUE_LIMIT);
    assert_eq!(controller.status().failure, Some(FailureKind::Command));

    controller.stop().await;
    assert_eq!(controller.queued_messages().await, 0);
    assert!(client.calls().iter().all(|c| !c.starts_with("send:")));
}

#[tokio::test]
async fn test_command_failures_are_soft() {
    let (controller, _gateway, client) = streaming_controller().await;
    client.fail("mute_input");

    controller.mute(true).await;
    assert_eq!(controller.status().failure, Some(FailureKind::Command));
    assert_eq!(controller.connection_state().await, ConnectionState::Streaming);

    controller.mute(false).await;
    assert_eq!(controller.status().message, "Audio unmuted.");

    controller.send_message("May I approach?").await;
    assert_eq!(controller.status().message, "Message sent.");

    client.fail("send");
    controller.send_message("Again").await;
    assert_eq!(controller.status().message, "Failed to send message.");

    controller.stop_generation().await;
    assert_eq!(controller.status().message, "Current generation stopped.");
    assert_eq!(controller.connection_state().await, ConnectionState::Streaming);
}

#[tokio::test]
async fn test_stop_twice_tears_down_once() {
    let (controller, _gateway, client) = streaming_controller().await;

    controller.stop().await;
    controller.stop().await;

    assert_eq!(client.count("stop_streaming"), 1);
    assert_eq!(client.listener_count(), 0);
    assert_eq!(controller.connection_state().await, ConnectionState::Idle);
    assert_eq!(controller.status().message, "Streaming stopped.");
}

#[tokio::test]
async fn test_stop_during_connect_discards_late_client() {
    let gateway = Arc::new(MockGateway::default());
    let gate = gateway.gate_connect();
    let controller = controller_with(&gateway);

    let background = controller.clone();
    let start = tokio::spawn(async move { background.start_chat("persona-video", None).await });
    let probe = gateway.clone();
    eventually(move || probe.connect_calls.load(Ordering::SeqCst) == 1).await;

    controller.stop().await;
    assert_eq!(controller.connection_state().await, ConnectionState::Idle);

    gate.notify_one();
    start.await.unwrap();

    assert_eq!(controller.connection_state().await, ConnectionState::Idle);
    assert_eq!(gateway.client.calls(), vec!["stop_streaming".to_string()]);
    assert_eq!(gateway.client.listener_count(), 0);
}

#[tokio::test]
async fn test_message_history_follows_latest_update() {
    let (controller, _gateway, client) = streaming_controller().await;

    client.emit(PersonaEvent::MessageHistoryUpdated {
        messages: vec![
            ChatMessage {
                role: "user".to_string(),
                content: "Good morning.".to_string(),
            },
            ChatMessage {
                role: "persona".to_string(),
                content: "Please be seated.".to_string(),
            },
        ],
    });

    tokio::time::timeout(Duration::from_secs(2), async {
        while controller.message_history().await.len() != 2 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("history not updated");
    assert_eq!(controller.message_history().await[1].content, "Please be seated.");
}

//! Conversation runtime.
//!
//! One spawned task per open chat screen owns the message store and is
//! the only place it mutates. Everything funnels into it: the initial
//! history fetch, poll ticks, live channel frames, and composer commands.
//! Callers hold a [`ConversationHandle`] with watch channels for the
//! readiness phase and the visible message list.
//!
//! The runtime walks four gates in sequence before the composer works:
//! session, conversation id, initial history, live channel. A failed gate
//! stalls forever, matching the backend contract where slow network and
//! hard failure are indistinguishable; there is no retry and no error
//! state.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use storyswap_core::{
    ConversationId, ConversationPhase, Message, MessageStore, ProductId, UserId,
};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::http::ApiClient;
use crate::live;
use crate::session::{ApiSessionProvider, SessionProvider};
use crate::wire::{ClientEvent, ServerEvent};

/// Backend calls the runtime depends on, as a seam for tests.
#[async_trait]
pub trait ConversationApi: Send + Sync {
    /// Get or lazily create the conversation with the peer.
    async fn get_or_create(
        &self,
        receiver: &UserId,
        product: Option<&ProductId>,
    ) -> Result<ConversationId, ClientError>;

    /// Fetch the full ordered history.
    async fn history(&self, conversation: &ConversationId) -> Result<Vec<Message>, ClientError>;
}

#[async_trait]
impl ConversationApi for ApiClient {
    async fn get_or_create(
        &self,
        receiver: &UserId,
        product: Option<&ProductId>,
    ) -> Result<ConversationId, ClientError> {
        self.get_or_create_conversation(receiver, product).await
    }

    async fn history(&self, conversation: &ConversationId) -> Result<Vec<Message>, ClientError> {
        self.conversation_messages(conversation).await
    }
}

/// Opens the live channel for a conversation.
#[async_trait]
pub trait LiveConnector: Send + Sync {
    /// Connect and return the outbound/inbound halves.
    async fn connect(
        &self,
        conversation: &ConversationId,
    ) -> Result<(mpsc::Sender<ClientEvent>, mpsc::Receiver<ServerEvent>), ClientError>;
}

struct WsConnector {
    config: ClientConfig,
    token: String,
}

#[async_trait]
impl LiveConnector for WsConnector {
    async fn connect(
        &self,
        _conversation: &ConversationId,
    ) -> Result<(mpsc::Sender<ClientEvent>, mpsc::Receiver<ServerEvent>), ClientError> {
        live::open(&self.config, &self.token).await
    }
}

enum Command {
    Send(String),
}

/// Handle to a running conversation.
///
/// Dropping the handle aborts the runtime task, which tears down the
/// live channel and the poll timer with it.
pub struct ConversationHandle {
    commands: mpsc::Sender<Command>,
    phase_rx: watch::Receiver<ConversationPhase>,
    messages_rx: watch::Receiver<Vec<Message>>,
    task: JoinHandle<()>,
}

impl ConversationHandle {
    /// Open a conversation against the real backend.
    pub fn open(
        config: ClientConfig,
        token: impl Into<String>,
        peer: UserId,
        product: Option<ProductId>,
    ) -> Self {
        let token = token.into();
        let api = ApiClient::new(&config.base_url).with_token(token.clone());
        let sessions = Arc::new(ApiSessionProvider::new(api.clone()));
        let connector = Arc::new(WsConnector {
            config: config.clone(),
            token,
        });
        Self::spawn(Arc::new(api), sessions, connector, peer, product, &config)
    }

    /// Spawn the runtime with explicit capabilities.
    pub fn spawn(
        api: Arc<dyn ConversationApi>,
        sessions: Arc<dyn SessionProvider>,
        connector: Arc<dyn LiveConnector>,
        peer: UserId,
        product: Option<ProductId>,
        config: &ClientConfig,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::channel(config.command_buffer_size);
        let (phase_tx, phase_rx) = watch::channel(ConversationPhase::default());
        let (messages_tx, messages_rx) = watch::channel(Vec::new());

        let runtime = Runtime {
            api,
            sessions,
            connector,
            peer,
            product,
            poll_interval: config.poll_interval,
            command_rx,
            phase_tx,
            messages_tx,
        };
        let task = tokio::spawn(runtime.run());

        Self {
            commands: command_tx,
            phase_rx,
            messages_rx,
            task,
        }
    }

    /// Composer submit.
    ///
    /// No-op unless the trimmed content is non-empty and the conversation
    /// is ready (channel up, conversation id resolved). Fire and forget:
    /// nothing is awaited beyond handing the text to the runtime.
    pub async fn send(&self, content: &str) {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            debug!("empty message, not sending");
            return;
        }
        if !self.phase_rx.borrow().is_ready() {
            debug!("conversation not ready, dropping send");
            return;
        }
        // A stopped runtime closes the channel; that is a no-op too.
        let _ = self.commands.send(Command::Send(trimmed.to_string())).await;
    }

    /// Current readiness phase.
    pub fn phase(&self) -> ConversationPhase {
        *self.phase_rx.borrow()
    }

    /// Snapshot of the visible message list.
    pub fn messages(&self) -> Vec<Message> {
        self.messages_rx.borrow().clone()
    }

    /// Watch the readiness phase.
    pub fn phase_updates(&self) -> watch::Receiver<ConversationPhase> {
        self.phase_rx.clone()
    }

    /// Watch the visible message list.
    pub fn message_updates(&self) -> watch::Receiver<Vec<Message>> {
        self.messages_rx.clone()
    }

    /// Tear the conversation down.
    pub fn close(&self) {
        self.task.abort();
    }
}

impl Drop for ConversationHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct Runtime {
    api: Arc<dyn ConversationApi>,
    sessions: Arc<dyn SessionProvider>,
    connector: Arc<dyn LiveConnector>,
    peer: UserId,
    product: Option<ProductId>,
    poll_interval: Duration,
    command_rx: mpsc::Receiver<Command>,
    phase_tx: watch::Sender<ConversationPhase>,
    messages_tx: watch::Sender<Vec<Message>>,
}

impl Runtime {
    async fn run(self) {
        // Destructuring allows independent mutable access to the command
        // receiver while the watch senders are used from the loop bodies.
        let Self {
            api,
            sessions,
            connector,
            peer,
            product,
            poll_interval,
            mut command_rx,
            phase_tx,
            messages_tx,
        } = self;

        // Gate 1: identity first, it is what tells own messages apart
        // from the peer's.
        let Some(session) = sessions.resolve().await else {
            warn!("session unresolved, conversation stalls before the first gate");
            return;
        };
        advance(&phase_tx);

        // Gate 2: the conversation id is the hard precondition for every
        // downstream operation.
        let conversation_id = match api.get_or_create(&peer, product.as_ref()).await {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "failed to resolve conversation id");
                return;
            }
        };
        advance(&phase_tx);

        // Gate 3: initial bulk fetch.
        let mut store = MessageStore::new();
        match api.history(&conversation_id).await {
            Ok(history) => {
                store.load_all(history);
                publish(&messages_tx, &store);
            }
            Err(e) => {
                warn!(error = %e, "initial history fetch failed");
                return;
            }
        }

        // Gate 4: live channel up and room joined.
        let (outbound, mut inbound) = match connector.connect(&conversation_id).await {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "live channel connect failed");
                return;
            }
        };
        let join = ClientEvent::JoinConversation {
            conversation_id: conversation_id.clone(),
        };
        if outbound.send(join).await.is_err() {
            warn!("live channel closed before join");
            return;
        }
        advance(&phase_tx);
        info!(conversation = %conversation_id, "conversation ready");

        let mut poll = tokio::time::interval(poll_interval);
        poll.tick().await; // consume the immediate tick, history is fresh
        let mut inbound_open = true;

        loop {
            tokio::select! {
                command = command_rx.recv() => match command {
                    Some(Command::Send(content)) => {
                        store.append(Message::optimistic(&session, content.clone()));
                        publish(&messages_tx, &store);

                        let event = ClientEvent::SendMessage {
                            conversation_id: conversation_id.clone(),
                            receiver_id: peer.clone(),
                            content,
                            product_id: product.clone(),
                        };
                        if outbound.send(event).await.is_err() {
                            debug!("live channel gone, send dropped");
                        }
                    }
                    // Every handle dropped.
                    None => break,
                },

                event = inbound.recv(), if inbound_open => match event {
                    Some(ServerEvent::ReceiveMessage(message)) => {
                        if message.sender_id == session.user_id {
                            // Already represented by the optimistic echo.
                            debug!("suppressing self echo from live channel");
                        } else {
                            store.append(message);
                            publish(&messages_tx, &store);
                        }
                    }
                    None => {
                        warn!("live channel closed, poll loop remains the delivery path");
                        inbound_open = false;
                    }
                },

                _ = poll.tick() => {
                    match api.history(&conversation_id).await {
                        Ok(history) => {
                            store.load_all(history);
                            publish(&messages_tx, &store);
                        }
                        // Not an error-specific retry, the next scheduled
                        // tick repeats unconditionally anyway.
                        Err(e) => debug!(error = %e, "poll tick failed"),
                    }
                }
            }
        }

        debug!(conversation = %conversation_id, "conversation runtime stopped");
    }
}

fn advance(phase_tx: &watch::Sender<ConversationPhase>) {
    let current = *phase_tx.borrow();
    if let Ok(next) = current.advance() {
        let _ = phase_tx.send(next);
    }
}

fn publish(messages_tx: &watch::Sender<Vec<Message>>, store: &MessageStore) {
    let _ = messages_tx.send(store.messages().to_vec());
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Mutex;
    use storyswap_core::{MessageId, Role, Session};
    use tokio::time::sleep;

    struct FakeSessions(Option<Session>);

    #[async_trait]
    impl SessionProvider for FakeSessions {
        async fn resolve(&self) -> Option<Session> {
            self.0.clone()
        }
    }

    struct FakeApi {
        conversation: ConversationId,
        history: Mutex<Vec<Message>>,
    }

    impl FakeApi {
        fn new(conversation: &str, history: Vec<Message>) -> Self {
            Self {
                conversation: ConversationId::new(conversation),
                history: Mutex::new(history),
            }
        }

        fn set_history(&self, history: Vec<Message>) {
            *self.history.lock().unwrap() = history;
        }
    }

    #[async_trait]
    impl ConversationApi for FakeApi {
        async fn get_or_create(
            &self,
            _receiver: &UserId,
            _product: Option<&ProductId>,
        ) -> Result<ConversationId, ClientError> {
            Ok(self.conversation.clone())
        }

        async fn history(
            &self,
            _conversation: &ConversationId,
        ) -> Result<Vec<Message>, ClientError> {
            Ok(self.history.lock().unwrap().clone())
        }
    }

    struct FakeConnector {
        pair: Mutex<Option<(mpsc::Sender<ClientEvent>, mpsc::Receiver<ServerEvent>)>>,
    }

    #[async_trait]
    impl LiveConnector for FakeConnector {
        async fn connect(
            &self,
            _conversation: &ConversationId,
        ) -> Result<(mpsc::Sender<ClientEvent>, mpsc::Receiver<ServerEvent>), ClientError> {
            Ok(self.pair.lock().unwrap().take().expect("channel already taken"))
        }
    }

    fn server_msg(id: &str, sender: &str, content: &str) -> Message {
        Message {
            server_id: Some(MessageId::new(id)),
            sender_id: UserId::new(sender),
            sender_name: sender.to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
            correlation: None,
        }
    }

    struct Wiring {
        api: Arc<FakeApi>,
        handle: ConversationHandle,
        outbound_rx: mpsc::Receiver<ClientEvent>,
        inbound_tx: mpsc::Sender<ServerEvent>,
    }

    fn open_conversation(session: Option<Session>, history: Vec<Message>) -> Wiring {
        let (outbound_tx, outbound_rx) = mpsc::channel(8);
        let (inbound_tx, inbound_rx) = mpsc::channel(8);

        let api = Arc::new(FakeApi::new("C1", history));
        let connector = Arc::new(FakeConnector {
            pair: Mutex::new(Some((outbound_tx, inbound_rx))),
        });
        let handle = ConversationHandle::spawn(
            api.clone(),
            Arc::new(FakeSessions(session)),
            connector,
            UserId::new("U2"),
            None,
            &ClientConfig::default(),
        );

        Wiring {
            api,
            handle,
            outbound_rx,
            inbound_tx,
        }
    }

    fn local_session() -> Session {
        Session::new("U1", "Ada", Role::Buyer)
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_scenario_appends_echo_and_emits() {
        let mut wiring = open_conversation(
            Some(local_session()),
            vec![server_msg("m1", "U2", "hi")],
        );

        let mut phases = wiring.handle.phase_updates();
        phases.wait_for(|p| p.is_ready()).await.unwrap();

        // Room joined on connect.
        assert_eq!(
            wiring.outbound_rx.recv().await,
            Some(ClientEvent::JoinConversation {
                conversation_id: ConversationId::new("C1"),
            })
        );

        wiring.handle.send("hello").await;

        let mut messages = wiring.handle.message_updates();
        messages.wait_for(|m| m.len() == 2).await.unwrap();
        let visible = wiring.handle.messages();
        assert_eq!(visible[0].content, "hi");
        assert_eq!(visible[1].content, "hello");
        assert_eq!(visible[1].sender_id, UserId::new("U1"));
        assert!(visible[1].is_pending());

        assert_eq!(
            wiring.outbound_rx.recv().await,
            Some(ClientEvent::SendMessage {
                conversation_id: ConversationId::new("C1"),
                receiver_id: UserId::new("U2"),
                content: "hello".to_string(),
                product_id: None,
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_whitespace_send_is_noop() {
        let mut wiring = open_conversation(
            Some(local_session()),
            vec![server_msg("m1", "U2", "hi")],
        );
        let mut phases = wiring.handle.phase_updates();
        phases.wait_for(|p| p.is_ready()).await.unwrap();
        let _join = wiring.outbound_rx.recv().await;

        wiring.handle.send("   \n").await;

        assert_eq!(wiring.handle.messages().len(), 1);
        assert!(wiring.outbound_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_before_ready_is_noop() {
        // No session: the runtime stalls in the first gate and never
        // connects a channel, so there is nothing to emit on.
        let wiring = open_conversation(None, Vec::new());

        let mut phases = wiring.handle.phase_updates();
        assert!(phases.wait_for(|p| p.is_ready()).await.is_err());

        wiring.handle.send("hello").await;

        assert_eq!(wiring.handle.phase(), ConversationPhase::AwaitingSession);
        assert!(wiring.handle.messages().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_self_echo_from_channel_is_suppressed() {
        let mut wiring = open_conversation(
            Some(local_session()),
            vec![server_msg("m1", "U2", "hi")],
        );
        let mut phases = wiring.handle.phase_updates();
        phases.wait_for(|p| p.is_ready()).await.unwrap();

        wiring
            .inbound_tx
            .send(ServerEvent::ReceiveMessage(server_msg("m2", "U1", "own send")))
            .await
            .unwrap();
        wiring
            .inbound_tx
            .send(ServerEvent::ReceiveMessage(server_msg("m3", "U2", "reply")))
            .await
            .unwrap();

        // Frames are processed in order: once the peer's message is
        // visible, the self echo has already been dropped.
        let mut messages = wiring.handle.message_updates();
        messages
            .wait_for(|m| m.iter().any(|msg| msg.content == "reply"))
            .await
            .unwrap();

        let visible = wiring.handle.messages();
        assert_eq!(visible.len(), 2);
        assert!(visible.iter().all(|m| m.content != "own send"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_is_idempotent_without_new_messages() {
        let wiring = open_conversation(
            Some(local_session()),
            vec![server_msg("m1", "U2", "hi")],
        );
        let mut phases = wiring.handle.phase_updates();
        phases.wait_for(|p| p.is_ready()).await.unwrap();
        let before = wiring.handle.messages();

        // Two poll periods with an unchanged server history.
        sleep(Duration::from_secs(7)).await;

        assert_eq!(wiring.handle.messages(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_peer_message_arrives_via_poll_after_channel_loss() {
        let mut wiring = open_conversation(
            Some(local_session()),
            vec![server_msg("m1", "U2", "hi")],
        );
        let mut phases = wiring.handle.phase_updates();
        phases.wait_for(|p| p.is_ready()).await.unwrap();

        // Simulate the live channel dropping after join.
        drop(wiring.inbound_tx);

        wiring.api.set_history(vec![
            server_msg("m1", "U2", "hi"),
            server_msg("m2", "U2", "still there?"),
        ]);

        // Visible within one poll interval despite zero push events.
        let mut messages = wiring.handle.message_updates();
        messages.wait_for(|m| m.len() == 2).await.unwrap();
        assert_eq!(wiring.handle.messages()[1].content, "still there?");

        // The join frame went out before the drop.
        assert!(matches!(
            wiring.outbound_rx.recv().await,
            Some(ClientEvent::JoinConversation { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_tears_down_runtime() {
        let mut wiring = open_conversation(
            Some(local_session()),
            vec![server_msg("m1", "U2", "hi")],
        );
        let mut phases = wiring.handle.phase_updates();
        phases.wait_for(|p| p.is_ready()).await.unwrap();
        assert!(wiring.outbound_rx.recv().await.is_some()); // join

        drop(wiring.handle);

        // The aborted runtime drops its outbound sender.
        assert!(wiring.outbound_rx.recv().await.is_none());
    }
}

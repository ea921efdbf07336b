//! crates/yourroom_core/src/conversation.rs
//!
//! The conversation engine: two-party threads and simulated agent replies.
//!
//! A `ConversationView` is one observer of the thread between a client and a
//! counterpart (the agent). Each client send schedules exactly one reply task. The
//! task asks the text generator for an answer, waits a fixed visible delay, then
//! appends the agent's message. All reply tasks share the view's cancellation token,
//! and dropping the view cancels every reply that has not been committed yet.
//!
//! Only client sessions get simulated replies and the welcome message. Agents and
//! administrators opening a thread see the stored messages and write to it directly.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{error, info};

use crate::domain::{Listing, Message, Session, UserRole, DEFAULT_AGENT_NAME};
use crate::generation::TextGenerator;
use crate::ports::{PortError, PortResult};
use crate::store::EntityStore;

/// Id of the synthesized greeting shown in an empty thread. It is never persisted.
pub const WELCOME_MESSAGE_ID: &str = "welcome";

pub const WELCOME_TEXT: &str = "Bonjour ! Bienvenue sur YOURROOM. Je suis ravi de vous aider. Avez-vous des questions sur mes annonces ou souhaitez-vous visiter un bien aujourd'hui ?";

/// Reply context used when the conversation is not tied to a known listing.
pub const GENERIC_REPLY_CONTEXT: &str = "un de mes biens immobiliers";

pub const DEFAULT_REPLY_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    /// No persisted message yet; the welcome message is shown.
    Empty,
    Active,
    /// At least one client message is still waiting for its reply.
    AwaitingResponse,
}

//=========================================================================================
// The Engine
//=========================================================================================

pub struct ConversationEngine {
    store: Arc<EntityStore>,
    generator: TextGenerator,
    reply_delay: Duration,
}

impl ConversationEngine {
    pub fn new(store: Arc<EntityStore>, generator: TextGenerator) -> Self {
        Self {
            store,
            generator,
            reply_delay: DEFAULT_REPLY_DELAY,
        }
    }

    /// Overrides the pause between a generated answer and its appearance in the thread.
    pub fn with_reply_delay(mut self, reply_delay: Duration) -> Self {
        self.reply_delay = reply_delay;
        self
    }

    pub fn reply_delay(&self) -> Duration {
        self.reply_delay
    }

    /// Opens a view of the thread between `session` and `counterpart_id`.
    ///
    /// `listing_id` optionally names the listing the client is asking about; it feeds
    /// the reply context and the agent's display name.
    pub async fn open(
        &self,
        session: Option<Session>,
        counterpart_id: &str,
        listing_id: Option<&str>,
    ) -> ConversationView {
        let listing = match listing_id {
            Some(id) => self.store.find_listing(id).await,
            None => None,
        };
        let counterpart_name = listing
            .as_ref()
            .map(|listing| listing.agent_name.clone())
            .unwrap_or_else(|| DEFAULT_AGENT_NAME.to_string());

        let welcome = Message {
            id: WELCOME_MESSAGE_ID.to_string(),
            sender_id: counterpart_id.to_string(),
            sender_name: Some(counterpart_name.clone()),
            receiver_id: session
                .as_ref()
                .map(|session| session.id.clone())
                .unwrap_or_default(),
            content: WELCOME_TEXT.to_string(),
            timestamp: chrono::Utc::now(),
        };

        let token = CancellationToken::new();
        let (replies_tx, replies_rx) = mpsc::unbounded_channel();

        ConversationView {
            store: self.store.clone(),
            generator: self.generator.clone(),
            reply_delay: self.reply_delay,
            session,
            counterpart_id: counterpart_id.to_string(),
            counterpart_name,
            listing,
            welcome,
            _cancel_on_drop: token.clone().drop_guard(),
            token,
            pending: Arc::new(AtomicUsize::new(0)),
            replies_tx,
            replies_rx,
        }
    }
}

//=========================================================================================
// The View
//=========================================================================================

pub struct ConversationView {
    store: Arc<EntityStore>,
    generator: TextGenerator,
    reply_delay: Duration,
    session: Option<Session>,
    counterpart_id: String,
    counterpart_name: String,
    listing: Option<Listing>,
    welcome: Message,
    token: CancellationToken,
    _cancel_on_drop: DropGuard,
    pending: Arc<AtomicUsize>,
    replies_tx: mpsc::UnboundedSender<Message>,
    replies_rx: mpsc::UnboundedReceiver<Message>,
}

impl ConversationView {
    pub fn counterpart_id(&self) -> &str {
        &self.counterpart_id
    }

    pub fn listing(&self) -> Option<&Listing> {
        self.listing.as_ref()
    }

    /// True when the viewing session is a client, whose sends get a simulated reply.
    pub fn simulates_replies(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.role == UserRole::Client)
    }

    /// The thread in append order. A client sees the single welcome message while
    /// the thread is empty.
    ///
    /// Without a session there is no thread to show.
    pub async fn messages(&self) -> Vec<Message> {
        let Some(session) = &self.session else {
            return Vec::new();
        };
        let thread = self.store.list_thread(&session.id, &self.counterpart_id).await;
        if thread.is_empty() && self.simulates_replies() {
            vec![self.welcome.clone()]
        } else {
            thread
        }
    }

    pub async fn state(&self) -> ThreadState {
        if self.pending_replies() > 0 {
            return ThreadState::AwaitingResponse;
        }
        let Some(session) = &self.session else {
            return ThreadState::Empty;
        };
        let thread = self.store.list_thread(&session.id, &self.counterpart_id).await;
        if thread.is_empty() {
            ThreadState::Empty
        } else {
            ThreadState::Active
        }
    }

    /// Number of client messages whose reply has not been committed yet.
    pub fn pending_replies(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Appends the session's message and, for a client, schedules the agent's reply.
    ///
    /// Returns the stored message as soon as it is written. Fails only on
    /// validation, in which case nothing is written and no reply is scheduled.
    pub async fn send(&self, content: &str) -> PortResult<Message> {
        let content = content.trim();
        if content.is_empty() {
            return Err(PortError::Validation(
                "message content is required".to_string(),
            ));
        }
        let sender = self.session.as_ref().ok_or_else(|| {
            PortError::Validation("an authenticated sender is required".to_string())
        })?;

        let message = Message::new(
            &sender.id,
            Some(sender.name.clone()),
            &self.counterpart_id,
            content,
        );
        self.store.append_message(message.clone()).await?;
        info!(
            "Message {} sent from {} to {}",
            message.id, sender.id, self.counterpart_id
        );

        if self.simulates_replies() {
            self.schedule_reply(sender, content);
        }
        Ok(message)
    }

    /// Waits for the next committed reply.
    pub async fn next_reply(&mut self) -> Option<Message> {
        self.replies_rx.recv().await
    }

    /// Cancels every reply that has not been committed. Dropping the view does the same.
    pub fn close(&self) {
        self.token.cancel();
    }

    fn schedule_reply(&self, client: &Session, content: &str) {
        let task = ReplyTask {
            store: self.store.clone(),
            generator: self.generator.clone(),
            reply_delay: self.reply_delay,
            client_id: client.id.clone(),
            client_message: content.to_string(),
            context: self
                .listing
                .as_ref()
                .map(Listing::reply_context)
                .unwrap_or_else(|| GENERIC_REPLY_CONTEXT.to_string()),
            counterpart_id: self.counterpart_id.clone(),
            counterpart_name: self.counterpart_name.clone(),
            token: self.token.clone(),
            pending: self.pending.clone(),
            replies_tx: self.replies_tx.clone(),
        };

        self.pending.fetch_add(1, Ordering::SeqCst);
        tokio::spawn(task.run());
    }
}

//=========================================================================================
// Reply Task
//=========================================================================================

struct ReplyTask {
    store: Arc<EntityStore>,
    generator: TextGenerator,
    reply_delay: Duration,
    client_id: String,
    client_message: String,
    context: String,
    counterpart_id: String,
    counterpart_name: String,
    token: CancellationToken,
    pending: Arc<AtomicUsize>,
    replies_tx: mpsc::UnboundedSender<Message>,
}

impl ReplyTask {
    async fn run(self) {
        let text = tokio::select! {
            biased;
            _ = self.token.cancelled() => None,
            text = async {
                let text = self
                    .generator
                    .draft_reply(&self.client_message, &self.context)
                    .await;
                tokio::time::sleep(self.reply_delay).await;
                text
            } => Some(text),
        };

        match text {
            Some(text) if !self.token.is_cancelled() => self.commit(&text).await,
            _ => info!(
                "Reply from {} to {} cancelled before commit",
                self.counterpart_id, self.client_id
            ),
        }

        self.pending.fetch_sub(1, Ordering::SeqCst);
    }

    /// Appends the reply unless the view is cancelled first. Cancellation is checked
    /// again under the store's write guard, and an unfinished write is abandoned.
    async fn commit(&self, text: &str) {
        let reply = Message::new(
            &self.counterpart_id,
            Some(self.counterpart_name.clone()),
            &self.client_id,
            text,
        );
        let outcome = tokio::select! {
            biased;
            _ = self.token.cancelled() => Ok(false),
            outcome = self
                .store
                .append_message_if(reply.clone(), || !self.token.is_cancelled()) => outcome,
        };

        match outcome {
            Ok(true) => {
                info!("Reply {} committed to {}", reply.id, self.client_id);
                // The view may already be gone; the reply is stored either way.
                let _ = self.replies_tx.send(reply);
            }
            Ok(false) => info!(
                "Reply from {} to {} cancelled during commit",
                self.counterpart_id, self.client_id
            ),
            Err(e) => error!("Failed to store reply for {}: {}", self.client_id, e),
        }
    }
}

//! services/api/src/web/ws_handler.rs
//!
//! This is the main entry point and control loop for a chat WebSocket connection.
//! One connection is one conversation view: it lives exactly as long as the socket,
//! and dropping it cancels every reply that has not been delivered yet.

use crate::web::{
    protocol::{ClientMessage, ServerMessage},
    rest::ThreadQuery,
    state::AppState,
};
use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket},
        Path, Query, State, WebSocketUpgrade,
    },
    response::Response,
    Extension,
};
use futures::{Sink, SinkExt, Stream, StreamExt};
use std::{fmt::Display, sync::Arc};
use tracing::{error, info, warn};
use yourroom_core::{ConversationView, Session};

/// The handler for upgrading HTTP requests to chat WebSocket connections.
pub async fn chat_ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path(counterpart_id): Path<String>,
    Query(query): Query<ThreadQuery>,
) -> Response {
    ws.on_upgrade(move |socket| {
        handle_socket(socket, app_state, session, counterpart_id, query.listing_id)
    })
}

async fn handle_socket(
    socket: WebSocket,
    app_state: Arc<AppState>,
    session: Session,
    counterpart_id: String,
    listing_id: Option<String>,
) {
    info!(
        "Chat connection opened between {} and {}",
        session.id, counterpart_id
    );
    let (sender, receiver) = socket.split();

    let view = app_state
        .engine
        .open(Some(session), &counterpart_id, listing_id.as_deref())
        .await;
    run_chat(view, sender, receiver).await;
    info!("Chat connection closed.");
}

/// Drives one conversation view over a frame sink and stream until the client leaves.
///
/// The view is dropped on return, which discards any reply still in flight.
pub(crate) async fn run_chat<S, R, E>(mut view: ConversationView, mut sender: S, mut receiver: R)
where
    S: Sink<WsMessage> + Unpin,
    R: Stream<Item = Result<WsMessage, E>> + Unpin,
    E: Display,
{
    // --- 1. Initial Thread ---
    let thread = ServerMessage::Thread {
        messages: view.messages().await,
    };
    if !send_message(&mut sender, &thread).await {
        return;
    }

    // --- 2. Main Message Loop ---
    loop {
        tokio::select! {
            incoming = receiver.next() => match incoming {
                Some(Ok(WsMessage::Text(text))) => {
                    if !handle_text_message(text.as_str(), &view, &mut sender).await {
                        break;
                    }
                }
                Some(Ok(WsMessage::Close(_))) | None => {
                    info!("Client closed the chat connection.");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("Chat socket error: {}", e);
                    break;
                }
            },
            Some(reply) = view.next_reply() => {
                if !send_message(&mut sender, &ServerMessage::Reply { message: reply }).await {
                    break;
                }
            }
        }
    }

    // --- 3. Cleanup ---
    if view.pending_replies() > 0 {
        info!(
            "Discarding {} pending replies for {}",
            view.pending_replies(),
            view.counterpart_id()
        );
    }
}

/// Handles one text frame. Returns `false` when the socket can no longer be written.
async fn handle_text_message<S>(text: &str, view: &ConversationView, sender: &mut S) -> bool
where
    S: Sink<WsMessage> + Unpin,
{
    let ClientMessage::Send { content } = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(e) => {
            warn!("Unparseable chat message: {}", e);
            let reply = ServerMessage::Error {
                message: format!("Invalid message: {}", e),
            };
            return send_message(sender, &reply).await;
        }
    };

    match view.send(&content).await {
        Ok(message) => {
            if !send_message(sender, &ServerMessage::Sent { message }).await {
                return false;
            }
            // Agents and administrators write directly; nobody is typing back.
            if view.simulates_replies() {
                return send_message(sender, &ServerMessage::Typing).await;
            }
            true
        }
        Err(e) => {
            let reply = ServerMessage::Error {
                message: e.to_string(),
            };
            send_message(sender, &reply).await
        }
    }
}

/// Serializes and sends a server message. Returns `false` when the client is gone.
async fn send_message<S>(sender: &mut S, message: &ServerMessage) -> bool
where
    S: Sink<WsMessage> + Unpin,
{
    let json = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize server message: {}", e);
            return true;
        }
    };
    if sender.send(WsMessage::Text(json.into())).await.is_err() {
        error!("Failed to send message to the chat client.");
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::OfflineTextAdapter;
    use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
    use serde_json::Value;
    use std::time::Duration;
    use yourroom_core::{
        conversation::{DEFAULT_REPLY_DELAY, WELCOME_MESSAGE_ID},
        ConversationEngine, EntityStore, InMemoryCollectionStore, PromptKind, TextGenerator,
        UserRole,
    };

    type Incoming = UnboundedSender<Result<WsMessage, axum::Error>>;

    struct Chat {
        store: Arc<EntityStore>,
        input: Incoming,
        output: UnboundedReceiver<WsMessage>,
        task: tokio::task::JoinHandle<()>,
    }

    fn person(id: &str, role: UserRole) -> Session {
        Session {
            id: id.to_string(),
            name: format!("User {}", id),
            email: format!("{}@yourroom.tg", id),
            role,
            avatar: None,
            phone_number: None,
        }
    }

    async fn connect(session: Session, counterpart_id: &str) -> Chat {
        let store = Arc::new(EntityStore::new(Arc::new(InMemoryCollectionStore::new())));
        let engine = ConversationEngine::new(
            store.clone(),
            TextGenerator::new(Arc::new(OfflineTextAdapter)),
        );
        let view = engine.open(Some(session), counterpart_id, None).await;

        let (input, frames_in) = unbounded();
        let (frames_out, output) = unbounded();
        let task = tokio::spawn(run_chat(view, frames_out, frames_in));
        Chat {
            store,
            input,
            output,
            task,
        }
    }

    fn send_text(chat: &Chat, text: &str) {
        chat.input
            .unbounded_send(Ok(WsMessage::Text(text.to_string().into())))
            .unwrap();
    }

    async fn next_frame(chat: &mut Chat) -> Value {
        match chat.output.next().await {
            Some(WsMessage::Text(text)) => serde_json::from_str(text.as_str()).unwrap(),
            other => panic!("expected a text frame, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn client_gets_thread_then_sent_typing_and_reply() {
        let mut chat = connect(person("c", UserRole::Client), "a").await;

        let thread = next_frame(&mut chat).await;
        assert_eq!(thread["type"], "thread");
        assert_eq!(thread["messages"][0]["id"], WELCOME_MESSAGE_ID);

        send_text(&chat, r#"{"type":"send","content":"Quel est le prix ?"}"#);
        let sent = next_frame(&mut chat).await;
        assert_eq!(sent["type"], "sent");
        assert_eq!(sent["message"]["content"], "Quel est le prix ?");
        assert_eq!(next_frame(&mut chat).await["type"], "typing");

        let reply = next_frame(&mut chat).await;
        assert_eq!(reply["type"], "reply");
        assert_eq!(reply["message"]["senderId"], "a");
        assert_eq!(reply["message"]["content"], PromptKind::Reply.failure_fallback());

        drop(chat.input);
        chat.task.await.unwrap();
        assert_eq!(chat.store.list_thread("c", "a").await.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn blank_and_malformed_frames_get_error_frames() {
        let mut chat = connect(person("c", UserRole::Client), "a").await;
        next_frame(&mut chat).await;

        send_text(&chat, r#"{"type":"send","content":"   "}"#);
        let error = next_frame(&mut chat).await;
        assert_eq!(error["type"], "error");
        assert!(error["message"].as_str().unwrap().contains("content"));

        send_text(&chat, "not json");
        assert_eq!(next_frame(&mut chat).await["type"], "error");

        drop(chat.input);
        chat.task.await.unwrap();
        assert!(chat.store.list_messages().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn closing_before_the_delay_commits_no_reply() {
        let mut chat = connect(person("c", UserRole::Client), "a").await;
        next_frame(&mut chat).await;

        send_text(&chat, r#"{"type":"send","content":"Bonjour"}"#);
        assert_eq!(next_frame(&mut chat).await["type"], "sent");
        assert_eq!(next_frame(&mut chat).await["type"], "typing");

        chat.input.unbounded_send(Ok(WsMessage::Close(None))).unwrap();
        chat.task.await.unwrap();
        assert!(chat.output.next().await.is_none());

        tokio::time::sleep(DEFAULT_REPLY_DELAY + Duration::from_secs(30)).await;
        let thread = chat.store.list_thread("c", "a").await;
        assert_eq!(thread.len(), 1);
        assert_eq!(thread[0].sender_id, "c");
    }

    #[tokio::test(start_paused = true)]
    async fn agent_messages_are_sent_without_typing_or_reply() {
        let mut chat = connect(person("a", UserRole::Agent), "c").await;

        let thread = next_frame(&mut chat).await;
        assert_eq!(thread["messages"], Value::Array(Vec::new()));

        send_text(&chat, r#"{"type":"send","content":"Le studio est disponible."}"#);
        assert_eq!(next_frame(&mut chat).await["type"], "sent");

        tokio::time::sleep(DEFAULT_REPLY_DELAY + Duration::from_secs(30)).await;
        drop(chat.input);
        chat.task.await.unwrap();
        assert!(chat.output.next().await.is_none());
        assert_eq!(chat.store.list_thread("a", "c").await.len(), 1);
    }
}

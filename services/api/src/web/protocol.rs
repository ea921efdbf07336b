//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the browser client and the API server
//! for a single chat thread.

use serde::{Deserialize, Serialize};
use yourroom_core::Message;

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Appends a message to the thread and schedules the agent's reply.
    Send { content: String },
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The thread as it stands when the socket opens.
    Thread { messages: Vec<Message> },

    /// Echoes the client's message once it is stored.
    Sent { message: Message },

    /// The agent is composing a reply. The UI can show a typing indicator.
    Typing,

    /// A committed agent reply.
    Reply { message: Message },

    /// A rejected client message. The connection stays open.
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_format_uses_snake_case_tags() {
        let parsed: ClientMessage =
            serde_json::from_str(r#"{"type":"send","content":"Bonjour"}"#).unwrap();
        assert!(matches!(parsed, ClientMessage::Send { content } if content == "Bonjour"));

        assert_eq!(
            serde_json::to_string(&ServerMessage::Typing).unwrap(),
            r#"{"type":"typing"}"#
        );
        let error = serde_json::to_value(ServerMessage::Error {
            message: "message content is required".to_string(),
        })
        .unwrap();
        assert_eq!(error["type"], "error");
        assert_eq!(error["message"], "message content is required");
    }

    #[test]
    fn unknown_client_messages_are_rejected() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"init"}"#).is_err());
    }
}

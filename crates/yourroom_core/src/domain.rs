//! crates/yourroom_core/src/domain.rs
//!
//! Defines the core data structures of the marketplace.
//! Every persisted record serializes with camelCase field names so that the stored
//! collections stay readable by any JSON consumer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sender name used whenever the agent behind a thread is not known.
pub const DEFAULT_AGENT_NAME: &str = "Agent YOURROOM";

/// Region assigned to new listings when the agent leaves it blank.
pub const DEFAULT_REGION: &str = "TOGO";

/// Generates a fresh record identifier.
pub fn new_record_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    Admin,
    /// A field agent ("démarcheur") who publishes listings.
    Agent,
    Client,
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserRole::Admin => write!(f, "ADMIN"),
            UserRole::Agent => write!(f, "AGENT"),
            UserRole::Client => write!(f, "CLIENT"),
        }
    }
}

/// The currently authenticated identity of the running client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    /// Opaque asset reference (URL or data URI) of the profile picture.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

/// A published rental property.
///
/// `agent_name` and `agent_phone` are a snapshot of the owning agent taken when the
/// listing was created or last edited. Later profile edits do not flow back here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Monthly rent in FCFA.
    pub price: u64,
    pub region: String,
    pub commune: String,
    pub quartier: String,
    pub rue: String,
    pub agent_id: String,
    pub agent_name: String,
    pub agent_phone: String,
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Listing {
    /// Short description of the listing handed to the reply generator.
    pub fn reply_context(&self) -> String {
        format!("{} à {}, {} FCFA", self.title, self.quartier, self.price)
    }
}

/// A single chat message. Messages are never edited once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub sender_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    pub receiver_id: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Builds a message with a fresh id stamped with the current time.
    pub fn new(
        sender_id: &str,
        sender_name: Option<String>,
        receiver_id: &str,
        content: &str,
    ) -> Self {
        Self {
            id: new_record_id(),
            sender_id: sender_id.to_string(),
            sender_name,
            receiver_id: receiver_id.to_string(),
            content: content.to_string(),
            timestamp: Utc::now(),
        }
    }

    /// True when the message was exchanged between `party_a` and `party_b`, in either direction.
    pub fn is_between(&self, party_a: &str, party_b: &str) -> bool {
        (self.sender_id == party_a && self.receiver_id == party_b)
            || (self.sender_id == party_b && self.receiver_id == party_a)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    pub apartment_id: String,
    pub client_id: String,
    pub client_name: String,
    /// Between 1 and 5 inclusive.
    pub rating: u8,
    pub comment: String,
    pub date: DateTime<Utc>,
}

//=========================================================================================
// Input and Summary Types
//=========================================================================================

/// The fields an agent fills in when publishing or editing a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: u64,
    #[serde(default = "default_region")]
    pub region: String,
    pub commune: String,
    pub quartier: String,
    #[serde(default)]
    pub rue: String,
    /// Contact number shown on the listing; falls back to the agent's profile phone.
    #[serde(default)]
    pub agent_phone: Option<String>,
    pub images: Vec<String>,
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

/// Sign-up form used to establish a brand new session identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub role: UserRole,
    #[serde(default)]
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// Headline figures for the administration dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketplaceStats {
    pub listings: usize,
    pub agents: usize,
    pub reviews: usize,
}

/// What the text generator is asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKind {
    Description,
    Reply,
}

/// Structured listing fields used to draft a marketing description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptionBrief {
    pub title: String,
    pub price: u64,
    #[serde(default = "default_region")]
    pub region: String,
    pub commune: String,
    pub quartier: String,
}

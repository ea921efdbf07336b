//! crates/yourroom_core/src/store.rs
//!
//! The typed entity store layered over a `CollectionStore` backend.
//!
//! Every collection is persisted as one JSON document and mutated by
//! read-modify-replace. Reads never fail: a missing, unreadable or malformed
//! collection is reported as empty so the application degrades to "no data".

use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::domain::{
    new_record_id, Listing, ListingDraft, MarketplaceStats, Message, Review, Session, UserRole,
};
use crate::ports::{CollectionStore, PortError, PortResult};

//=========================================================================================
// Collection Keys
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKey<'a> {
    Listings,
    Messages,
    /// Reviews of one listing, newest first.
    Reviews(&'a str),
    Session,
}

impl fmt::Display for CollectionKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionKey::Listings => write!(f, "listings"),
            CollectionKey::Messages => write!(f, "messages"),
            CollectionKey::Reviews(listing_id) => write!(f, "reviews:{}", listing_id),
            CollectionKey::Session => write!(f, "session"),
        }
    }
}

//=========================================================================================
// The Entity Store
//=========================================================================================

pub struct EntityStore {
    backend: Arc<dyn CollectionStore>,
    /// Serializes read-modify-replace cycles issued from this process.
    write_guard: Mutex<()>,
}

impl EntityStore {
    pub fn new(backend: Arc<dyn CollectionStore>) -> Self {
        Self {
            backend,
            write_guard: Mutex::new(()),
        }
    }

    /// Loads a whole collection. Never fails.
    pub async fn load<T: DeserializeOwned>(&self, key: CollectionKey<'_>) -> Vec<T> {
        self.load_or_default(key).await
    }

    /// Atomically overwrites a whole collection.
    pub async fn replace<T: Serialize>(&self, key: CollectionKey<'_>, items: &[T]) -> PortResult<()> {
        let _guard = self.write_guard.lock().await;
        self.write_json(key, &items).await
    }

    async fn load_or_default<T: DeserializeOwned + Default>(&self, key: CollectionKey<'_>) -> T {
        let key = key.to_string();
        match self.backend.read(&key).await {
            Ok(Some(text)) => match serde_json::from_str(&text) {
                Ok(value) => value,
                Err(e) => {
                    warn!("Collection '{}' is malformed, treating it as empty: {}", key, e);
                    T::default()
                }
            },
            Ok(None) => T::default(),
            Err(e) => {
                warn!("Failed to read collection '{}', treating it as empty: {}", key, e);
                T::default()
            }
        }
    }

    async fn write_json<T: Serialize + ?Sized>(&self, key: CollectionKey<'_>, value: &T) -> PortResult<()> {
        let text = serde_json::to_string(value).map_err(|e| PortError::Unexpected(e.to_string()))?;
        self.backend.write(&key.to_string(), &text).await
    }

    /// Runs one read-modify-replace cycle under the write guard.
    ///
    /// The collection is only written back when `mutate` succeeds.
    async fn update<T, R, F>(&self, key: CollectionKey<'_>, mutate: F) -> PortResult<R>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut Vec<T>) -> PortResult<R>,
    {
        let _guard = self.write_guard.lock().await;
        let mut items: Vec<T> = self.load_or_default(key).await;
        let result = mutate(&mut items)?;
        self.write_json(key, &items).await?;
        Ok(result)
    }

    // --- Listings ---

    /// Every listing, newest-created first.
    pub async fn list_listings(&self) -> Vec<Listing> {
        self.load(CollectionKey::Listings).await
    }

    pub async fn find_listing(&self, listing_id: &str) -> Option<Listing> {
        self.list_listings()
            .await
            .into_iter()
            .find(|listing| listing.id == listing_id)
    }

    pub async fn list_listings_by_agent(&self, agent_id: &str) -> Vec<Listing> {
        self.list_listings()
            .await
            .into_iter()
            .filter(|listing| listing.agent_id == agent_id)
            .collect()
    }

    /// Case-insensitive match on title, quartier or commune. A blank term matches everything.
    pub async fn search_listings(&self, term: &str) -> Vec<Listing> {
        let needle = term.trim().to_lowercase();
        let listings = self.list_listings().await;
        if needle.is_empty() {
            return listings;
        }
        listings
            .into_iter()
            .filter(|listing| {
                listing.title.to_lowercase().contains(&needle)
                    || listing.quartier.to_lowercase().contains(&needle)
                    || listing.commune.to_lowercase().contains(&needle)
            })
            .collect()
    }

    pub async fn create_listing(&self, agent: &Session, draft: ListingDraft) -> PortResult<Listing> {
        if agent.role != UserRole::Agent {
            return Err(PortError::Forbidden(
                "only agents can publish listings".to_string(),
            ));
        }
        validate_draft(&draft)?;
        let agent_phone = snapshot_phone(agent, &draft);

        let listing = Listing {
            id: new_record_id(),
            agent_id: agent.id.clone(),
            agent_name: agent.name.clone(),
            agent_phone,
            title: draft.title,
            description: draft.description,
            price: draft.price,
            region: draft.region,
            commune: draft.commune,
            quartier: draft.quartier,
            rue: draft.rue,
            images: draft.images,
            created_at: Utc::now(),
        };

        let created = listing.clone();
        self.update(CollectionKey::Listings, move |listings: &mut Vec<Listing>| {
            listings.insert(0, listing);
            Ok(())
        })
        .await?;
        info!("Listing {} created by agent {}", created.id, created.agent_id);
        Ok(created)
    }

    /// Replaces the editable fields of a listing owned by `agent`.
    pub async fn update_listing(
        &self,
        agent: &Session,
        listing_id: &str,
        draft: ListingDraft,
    ) -> PortResult<Listing> {
        validate_draft(&draft)?;
        let agent_phone = snapshot_phone(agent, &draft);

        self.update(CollectionKey::Listings, |listings: &mut Vec<Listing>| {
            let listing = listings
                .iter_mut()
                .find(|listing| listing.id == listing_id)
                .ok_or_else(|| PortError::NotFound(format!("Listing {} not found", listing_id)))?;
            if listing.agent_id != agent.id {
                return Err(PortError::Forbidden(format!(
                    "listing {} belongs to another agent",
                    listing_id
                )));
            }

            listing.title = draft.title;
            listing.description = draft.description;
            listing.price = draft.price;
            listing.region = draft.region;
            listing.commune = draft.commune;
            listing.quartier = draft.quartier;
            listing.rue = draft.rue;
            listing.images = draft.images;
            listing.agent_name = agent.name.clone();
            listing.agent_phone = agent_phone;
            Ok(listing.clone())
        })
        .await
    }

    /// Deletes a listing. Returns `false` when the id was already absent.
    ///
    /// Reviews and messages that reference the listing are left untouched.
    pub async fn delete_listing(&self, actor: &Session, listing_id: &str) -> PortResult<bool> {
        let _guard = self.write_guard.lock().await;
        let mut listings: Vec<Listing> = self.load_or_default(CollectionKey::Listings).await;

        let Some(position) = listings.iter().position(|listing| listing.id == listing_id) else {
            return Ok(false);
        };
        if actor.role != UserRole::Admin && listings[position].agent_id != actor.id {
            return Err(PortError::Forbidden(format!(
                "listing {} belongs to another agent",
                listing_id
            )));
        }

        listings.remove(position);
        self.write_json(CollectionKey::Listings, &listings).await?;
        info!("Listing {} deleted by {}", listing_id, actor.id);
        Ok(true)
    }

    // --- Reviews ---

    pub async fn list_reviews_for(&self, listing_id: &str) -> Vec<Review> {
        self.load(CollectionKey::Reviews(listing_id)).await
    }

    pub async fn add_review(
        &self,
        client: &Session,
        listing_id: &str,
        rating: u8,
        comment: &str,
    ) -> PortResult<Review> {
        if !(1..=5).contains(&rating) {
            return Err(PortError::Validation(
                "rating must be between 1 and 5".to_string(),
            ));
        }
        if comment.trim().is_empty() {
            return Err(PortError::Validation("comment is required".to_string()));
        }
        if self.find_listing(listing_id).await.is_none() {
            return Err(PortError::NotFound(format!("Listing {} not found", listing_id)));
        }

        let review = Review {
            id: new_record_id(),
            apartment_id: listing_id.to_string(),
            client_id: client.id.clone(),
            client_name: client.name.clone(),
            rating,
            comment: comment.to_string(),
            date: Utc::now(),
        };

        let created = review.clone();
        self.update(CollectionKey::Reviews(listing_id), move |reviews: &mut Vec<Review>| {
            reviews.insert(0, review);
            Ok(())
        })
        .await?;
        Ok(created)
    }

    // --- Messages ---

    /// Every message in global append order.
    pub async fn list_messages(&self) -> Vec<Message> {
        self.load(CollectionKey::Messages).await
    }

    /// The messages exchanged between two parties, in append order.
    pub async fn list_thread(&self, party_a: &str, party_b: &str) -> Vec<Message> {
        self.list_messages()
            .await
            .into_iter()
            .filter(|message| message.is_between(party_a, party_b))
            .collect()
    }

    /// Messages addressed to `agent_id`, in append order.
    pub async fn inbox_for(&self, agent_id: &str) -> Vec<Message> {
        self.list_messages()
            .await
            .into_iter()
            .filter(|message| message.receiver_id == agent_id)
            .collect()
    }

    pub async fn append_message(&self, message: Message) -> PortResult<()> {
        self.update(CollectionKey::Messages, move |messages: &mut Vec<Message>| {
            messages.push(message);
            Ok(())
        })
        .await
    }

    /// Appends `message` only if `still_wanted` holds once the write guard is held.
    /// Returns whether the message was written.
    pub async fn append_message_if<F>(&self, message: Message, still_wanted: F) -> PortResult<bool>
    where
        F: FnOnce() -> bool,
    {
        let _guard = self.write_guard.lock().await;
        let mut messages: Vec<Message> = self.load_or_default(CollectionKey::Messages).await;
        if !still_wanted() {
            return Ok(false);
        }
        messages.push(message);
        self.write_json(CollectionKey::Messages, &messages).await?;
        Ok(true)
    }

    // --- Session ---

    pub async fn read_session(&self) -> Option<Session> {
        self.load_or_default(CollectionKey::Session).await
    }

    pub async fn write_session(&self, session: Option<&Session>) -> PortResult<()> {
        let _guard = self.write_guard.lock().await;
        self.write_json(CollectionKey::Session, &session).await
    }

    // --- Administration ---

    pub async fn stats(&self) -> MarketplaceStats {
        let listings = self.list_listings().await;
        let agents = listings
            .iter()
            .map(|listing| listing.agent_id.as_str())
            .collect::<HashSet<_>>()
            .len();

        let mut reviews = 0;
        for listing in &listings {
            reviews += self.list_reviews_for(&listing.id).await.len();
        }

        MarketplaceStats {
            listings: listings.len(),
            agents,
            reviews,
        }
    }
}

fn validate_draft(draft: &ListingDraft) -> PortResult<()> {
    let required = [
        ("title", &draft.title),
        ("commune", &draft.commune),
        ("quartier", &draft.quartier),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(PortError::Validation(format!("{} is required", field)));
        }
    }
    if draft.price == 0 {
        return Err(PortError::Validation("price must be positive".to_string()));
    }
    if draft.images.is_empty() {
        return Err(PortError::Validation(
            "at least one image is required".to_string(),
        ));
    }
    Ok(())
}

/// The phone number frozen onto a listing: the draft's, else the agent profile's.
fn snapshot_phone(agent: &Session, draft: &ListingDraft) -> String {
    draft
        .agent_phone
        .as_deref()
        .filter(|phone| !phone.trim().is_empty())
        .or(agent.phone_number.as_deref())
        .unwrap_or_default()
        .to_string()
}

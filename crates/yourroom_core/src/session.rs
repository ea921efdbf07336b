//! crates/yourroom_core/src/session.rs
//!
//! The process-wide holder of the current session identity.
//!
//! There is at most one session at a time. It is persisted under the `session`
//! collection so a restart picks it back up through `read_at_startup`.

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use crate::domain::{new_record_id, ProfileUpdate, Registration, Session};
use crate::ports::{PortError, PortResult};
use crate::store::EntityStore;

pub struct SessionContext {
    store: Arc<EntityStore>,
    current: RwLock<Option<Session>>,
}

impl SessionContext {
    /// Creates an empty context. Call `read_at_startup` to restore a persisted session.
    pub fn new(store: Arc<EntityStore>) -> Self {
        Self {
            store,
            current: RwLock::new(None),
        }
    }

    /// Restores whatever session was persisted by a previous run.
    pub async fn read_at_startup(&self) -> Option<Session> {
        let restored = self.store.read_session().await;
        if let Some(session) = &restored {
            info!("Restored session for {} ({})", session.id, session.role);
        }
        *self.current.write().await = restored.clone();
        restored
    }

    pub async fn current(&self) -> Option<Session> {
        self.current.read().await.clone()
    }

    /// Makes `session` the current identity, replacing any previous one.
    pub async fn establish(&self, session: Session) -> PortResult<Session> {
        let mut current = self.current.write().await;
        self.store.write_session(Some(&session)).await?;
        info!("Session established for {} ({})", session.id, session.role);
        *current = Some(session.clone());
        Ok(session)
    }

    /// Creates a brand new identity from a sign-up form and establishes it.
    pub async fn register(&self, registration: Registration) -> PortResult<Session> {
        if registration.name.trim().is_empty() {
            return Err(PortError::Validation("name is required".to_string()));
        }
        if registration.email.trim().is_empty() {
            return Err(PortError::Validation("email is required".to_string()));
        }

        let session = Session {
            id: new_record_id(),
            name: registration.name,
            email: registration.email,
            role: registration.role,
            avatar: None,
            phone_number: registration.phone_number.filter(|p| !p.trim().is_empty()),
        };
        self.establish(session).await
    }

    /// Applies a profile edit to the current session.
    ///
    /// Listings keep the agent snapshot they were written with.
    pub async fn update_profile(&self, update: ProfileUpdate) -> PortResult<Session> {
        let mut current = self.current.write().await;
        let mut session = current.clone().ok_or(PortError::Unauthorized)?;

        if let Some(name) = update.name {
            if name.trim().is_empty() {
                return Err(PortError::Validation("name cannot be empty".to_string()));
            }
            session.name = name;
        }
        if let Some(phone) = update.phone_number {
            session.phone_number = Some(phone).filter(|p| !p.trim().is_empty());
        }
        if let Some(avatar) = update.avatar {
            session.avatar = Some(avatar).filter(|a| !a.is_empty());
        }

        self.store.write_session(Some(&session)).await?;
        *current = Some(session.clone());
        Ok(session)
    }

    /// Logs out. Clearing an already empty context is a no-op.
    pub async fn clear(&self) -> PortResult<()> {
        let mut current = self.current.write().await;
        self.store.write_session(None).await?;
        if let Some(session) = current.take() {
            info!("Session cleared for {}", session.id);
        }
        Ok(())
    }
}

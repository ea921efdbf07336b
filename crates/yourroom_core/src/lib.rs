pub mod conversation;
pub mod domain;
pub mod generation;
pub mod memory;
pub mod ports;
pub mod session;
pub mod store;

pub use conversation::{ConversationEngine, ConversationView, ThreadState};
pub use domain::{
    DescriptionBrief, Listing, ListingDraft, MarketplaceStats, Message, ProfileUpdate,
    PromptKind, Registration, Review, Session, UserRole,
};
pub use generation::TextGenerator;
pub use memory::InMemoryCollectionStore;
pub use ports::{
    CollectionStore, GenerationRequest, PortError, PortResult, TextGenerationService,
};
pub use session::SessionContext;
pub use store::{CollectionKey, EntityStore};

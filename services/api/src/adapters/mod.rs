pub mod db;
pub mod file_store;
pub mod text_llm;

pub use db::DbAdapter;
pub use file_store::JsonDirStore;
pub use text_llm::{OfflineTextAdapter, OpenAiTextAdapter};

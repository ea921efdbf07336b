//! services/api/src/adapters/file_store.rs
//!
//! A `CollectionStore` that keeps one JSON file per collection in a data directory.
//! Used when no database is configured.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use yourroom_core::ports::{CollectionStore, PortError, PortResult};

#[derive(Clone, Debug)]
pub struct JsonDirStore {
    data_dir: PathBuf,
}

impl JsonDirStore {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    /// Creates the data directory up front, so an unusable `DATA_DIR` fails at startup
    /// instead of on the first write.
    pub async fn open(data_dir: PathBuf) -> PortResult<Self> {
        let store = Self::new(data_dir);
        store.ensure_dir().await?;
        Ok(store)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// `reviews:<id>` becomes `reviews__<id>.json`; colons are not portable in file names.
    fn path_for(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", key.replace(':', "__")))
    }

    async fn ensure_dir(&self) -> PortResult<()> {
        fs::create_dir_all(&self.data_dir)
            .await
            .map_err(|e| PortError::Unexpected(format!("{}: {}", self.data_dir.display(), e)))
    }
}

#[async_trait]
impl CollectionStore for JsonDirStore {
    async fn read(&self, key: &str) -> PortResult<Option<String>> {
        match fs::read_to_string(self.path_for(key)).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PortError::Unexpected(e.to_string())),
        }
    }

    /// Writes to a sibling temp file then renames it over the target.
    async fn write(&self, key: &str, value: &str) -> PortResult<()> {
        self.ensure_dir().await?;
        let path = self.path_for(key);
        let temp_path = path.with_extension("json.tmp");

        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        file.write_all(value.as_bytes())
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        file.sync_all()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        drop(file);

        fs::rename(&temp_path, &path)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::tempdir;
    use yourroom_core::{EntityStore, Listing, ListingDraft, Session, UserRole};

    #[tokio::test]
    async fn missing_collection_reads_as_none() {
        let temp = tempdir().unwrap();
        let store = JsonDirStore::new(temp.path().join("data"));
        assert_eq!(store.read("listings").await.unwrap(), None);
    }

    #[tokio::test]
    async fn open_creates_the_data_directory() {
        let temp = tempdir().unwrap();
        let store = JsonDirStore::open(temp.path().join("nested/data")).await.unwrap();
        assert!(store.data_dir().is_dir());
    }

    #[tokio::test]
    async fn open_fails_when_the_data_directory_cannot_be_created() {
        let temp = tempdir().unwrap();
        let blocker = temp.path().join("blocker");
        std::fs::write(&blocker, "a file, not a directory").unwrap();

        let result = JsonDirStore::open(blocker.join("data")).await;
        assert!(matches!(result, Err(PortError::Unexpected(_))));
    }

    #[tokio::test]
    async fn write_then_read_and_overwrite() {
        let temp = tempdir().unwrap();
        let store = JsonDirStore::new(temp.path().join("data"));

        store.write("messages", "[]").await.unwrap();
        assert_eq!(store.read("messages").await.unwrap().as_deref(), Some("[]"));

        store.write("messages", "[1]").await.unwrap();
        assert_eq!(store.read("messages").await.unwrap().as_deref(), Some("[1]"));
        assert!(!temp.path().join("data/messages.json.tmp").exists());
    }

    #[tokio::test]
    async fn review_keys_map_to_portable_file_names() {
        let temp = tempdir().unwrap();
        let store = JsonDirStore::new(temp.path().to_path_buf());

        store.write("reviews:abc", "[]").await.unwrap();
        assert!(temp.path().join("reviews__abc.json").exists());
        assert_eq!(store.read("reviews:abc").await.unwrap().as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn entities_survive_a_reopen() {
        let temp = tempdir().unwrap();
        let agent = Session {
            id: "x".to_string(),
            name: "Kossi".to_string(),
            email: "kossi@yourroom.tg".to_string(),
            role: UserRole::Agent,
            avatar: None,
            phone_number: None,
        };
        let draft = ListingDraft {
            title: "Studio meublé".to_string(),
            description: "Proche du marché".to_string(),
            price: 45000,
            region: "TOGO".to_string(),
            commune: "Agoè".to_string(),
            quartier: "Assiyéyé".to_string(),
            rue: "Rue 12".to_string(),
            agent_phone: Some("+228 90 00 00 00".to_string()),
            images: vec!["a.png".to_string(), "b.png".to_string()],
        };

        let created: Listing = {
            let store = EntityStore::new(Arc::new(JsonDirStore::new(temp.path().to_path_buf())));
            store.write_session(Some(&agent)).await.unwrap();
            store.create_listing(&agent, draft).await.unwrap()
        };

        let reopened = EntityStore::new(Arc::new(JsonDirStore::new(temp.path().to_path_buf())));
        assert_eq!(reopened.list_listings().await, vec![created]);
        assert_eq!(reopened.read_session().await, Some(agent));
    }

    #[tokio::test]
    async fn corrupt_file_loads_as_empty_collection() {
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join("listings.json"), "not json at all").unwrap();

        let store = EntityStore::new(Arc::new(JsonDirStore::new(temp.path().to_path_buf())));
        assert!(store.list_listings().await.is_empty());
    }
}

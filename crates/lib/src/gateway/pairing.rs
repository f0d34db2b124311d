//! Pairing artifact store: the last login QR payload, persisted so `/qr` can still show it
//! after the live artifact is gone (e.g. after a restart).

use std::path::{Path, PathBuf};

const LAST_QR_FILE: &str = "last_qr.txt";

/// File-backed copy of the most recent pairing artifact.
pub struct PairingStore {
    path: PathBuf,
}

impl PairingStore {
    /// Store under `state_dir/last_qr.txt`.
    pub fn in_dir(state_dir: impl AsRef<Path>) -> Self {
        Self {
            path: state_dir.as_ref().join(LAST_QR_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the saved artifact.
    pub async fn save(&self, artifact: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, artifact).await
    }

    /// Last saved artifact; `None` if never saved, unreadable, or empty.
    pub async fn load_last(&self) -> Option<String> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_then_load_last() {
        let dir = std::env::temp_dir().join(format!("hydrobot-pairing-{}", uuid::Uuid::new_v4()));
        let store = PairingStore::in_dir(&dir);
        assert!(store.load_last().await.is_none());

        store.save("2@first").await.unwrap();
        store.save("2@second").await.unwrap();
        assert_eq!(store.load_last().await.as_deref(), Some("2@second"));
        assert!(store.path().ends_with(LAST_QR_FILE));
        let _ = std::fs::remove_dir_all(dir);
    }
}

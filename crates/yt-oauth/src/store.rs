use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::{Credential, StoreError};

/// Single-file credential store.
///
/// Saves go through a temporary sibling file that is renamed into place,
/// so a concurrent `load` sees either the old or the new credential.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn display_path(&self) -> String {
        self.path.display().to_string()
    }

    /// Load the stored credential
    pub async fn load(&self) -> Result<Credential, StoreError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(self.display_path()));
            }
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.display_path(),
                    source,
                });
            }
        };

        serde_json::from_str(&content).map_err(|source| StoreError::Parse {
            path: self.display_path(),
            source,
        })
    }

    /// Save the credential, replacing whatever was stored before.
    ///
    /// On failure the temporary file is removed so no copy of the credential
    /// is left behind.
    pub async fn save(&self, credential: &Credential) -> Result<(), StoreError> {
        let content = serde_json::to_string(credential).map_err(StoreError::Serialize)?;

        let _guard = self.write_lock.lock().await;

        let tmp_path = self.tmp_path();
        if let Err(source) = self.replace_with(&tmp_path, content).await {
            tokio::fs::remove_file(&tmp_path).await.ok();
            return Err(StoreError::Write {
                path: self.display_path(),
                source,
            });
        }

        tracing::debug!(path = %self.path.display(), "Saved credential");
        Ok(())
    }

    async fn replace_with(&self, tmp_path: &Path, content: String) -> std::io::Result<()> {
        tokio::fs::write(tmp_path, content).await?;

        // Owner read/write only on Unix-like systems
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            tokio::fs::set_permissions(tmp_path, permissions).await?;
        }

        tokio::fs::rename(tmp_path, &self.path).await
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "token.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

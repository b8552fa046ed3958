use super::{Address, ObjectStore, StoreError};
use bytes::Bytes;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

/// Local-filesystem object store. Each blob lives at `<root>/<hex digest>`;
/// writes land in a staging file first and are renamed into place, so a
/// crashed write never leaves a partial object at a valid address.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, address: &Address) -> Result<PathBuf, StoreError> {
        let digest = address
            .digest()
            .filter(|d| d.bytes().all(|b| b.is_ascii_hexdigit()))
            .ok_or_else(|| StoreError::MalformedAddress(address.clone()))?;
        Ok(self.root.join(digest))
    }

    async fn commit_staged(&self, staged: PathBuf, digest: &[u8]) -> Result<Address, StoreError> {
        let address = Address::from(format!("/{}/{}", self.kind(), hex::encode(digest)));
        let path = self.object_path(&address)?;
        tokio::fs::rename(&staged, &path).await?;
        Ok(address)
    }
}

#[async_trait::async_trait]
impl ObjectStore for FileStore {
    fn kind(&self) -> &'static str {
        "file"
    }

    async fn put(&self, data: Bytes) -> Result<Address, StoreError> {
        let mut reader: &[u8] = &data;
        self.put_stream(&mut reader).await
    }

    async fn get(&self, address: &Address) -> Result<Bytes, StoreError> {
        let path = self.object_path(address)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data.into()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(address.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn has(&self, address: &Address) -> Result<bool, StoreError> {
        let path = self.object_path(address)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }

    /// Streams into a staging file while hashing, then renames the staged
    /// file to its digest. Bodies never need to fit in memory here.
    async fn put_stream(
        &self,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<Address, StoreError> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static STAGE_SEQ: AtomicU64 = AtomicU64::new(0);

        let staged = self.root.join(format!(
            ".staged-{}-{}",
            std::process::id(),
            STAGE_SEQ.fetch_add(1, Ordering::Relaxed),
        ));
        let mut file = tokio::fs::File::create(&staged).await?;
        let mut hasher = Sha256::new();
        let mut buf = [0u8; 8192];

        loop {
            let n = match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(err) => {
                    drop(file);
                    let _ = tokio::fs::remove_file(&staged).await;
                    return Err(err.into());
                }
            };
            hasher.update(&buf[..n]);
            file.write_all(&buf[..n]).await?;
        }
        file.flush().await?;
        drop(file);

        self.commit_staged(staged, &hasher.finalize()).await
    }
}

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

/// Distinguished sentinel returned by read paths when a blob is absent,
/// so callers can branch without string-matching error messages.
#[derive(Debug, Error)]
#[error("resource content not found")]
pub struct NotFound;

/// Returned by mutation calls on read-only backends.
#[derive(Debug, Error)]
#[error("storage is read-only")]
pub struct ReadOnlyStorage;

pub fn is_not_found(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| cause.downcast_ref::<NotFound>().is_some())
}

/// Pluggable blob backend for the registry: one index blob, one content blob
/// and one preview blob per resource ID.
pub trait Storage: Send + Sync {
    fn open_index_read(&self) -> Result<Box<dyn Read>>;
    fn open_index_write(&self) -> Result<Box<dyn Write>>;
    fn open_content_read(&self, id: Uuid) -> Result<Box<dyn Read>>;
    fn open_content_write(&self, id: Uuid) -> Result<Box<dyn Write>>;
    fn delete_content(&self, id: Uuid) -> Result<()>;
    fn open_preview_read(&self, id: Uuid) -> Result<Box<dyn Read>>;
    fn open_preview_write(&self, id: Uuid) -> Result<Box<dyn Write>>;
    fn delete_preview(&self, id: Uuid) -> Result<()>;
}

/// Mutable filesystem backend. Layout: `<dir>/resources.dat`,
/// `<dir>/content/<id>.dat`, `<dir>/preview/<id>.png`.
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn index_path(&self) -> PathBuf {
        self.root.join("resources.dat")
    }

    fn content_path(&self, id: Uuid) -> PathBuf {
        self.root.join("content").join(format!("{id}.dat"))
    }

    fn preview_path(&self, id: Uuid) -> PathBuf {
        self.root.join("preview").join(format!("{id}.png"))
    }
}

fn open_file_read(path: &Path) -> Result<Box<dyn Read>> {
    match File::open(path) {
        Ok(file) => Ok(Box::new(file)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            Err(anyhow::Error::new(NotFound))
        }
        Err(err) => {
            Err(anyhow::Error::new(err).context(format!("opening {}", path.display())))
        }
    }
}

fn open_file_write(path: &Path) -> Result<Box<dyn Write>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating storage directory {}", parent.display()))?;
    }
    let file =
        File::create(path).with_context(|| format!("creating {}", path.display()))?;
    Ok(Box::new(file))
}

fn delete_file(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => {
            Err(anyhow::Error::new(err).context(format!("deleting {}", path.display())))
        }
    }
}

impl Storage for FsStorage {
    fn open_index_read(&self) -> Result<Box<dyn Read>> {
        open_file_read(&self.index_path())
    }

    fn open_index_write(&self) -> Result<Box<dyn Write>> {
        open_file_write(&self.index_path())
    }

    fn open_content_read(&self, id: Uuid) -> Result<Box<dyn Read>> {
        open_file_read(&self.content_path(id))
    }

    fn open_content_write(&self, id: Uuid) -> Result<Box<dyn Write>> {
        open_file_write(&self.content_path(id))
    }

    fn delete_content(&self, id: Uuid) -> Result<()> {
        delete_file(&self.content_path(id))
    }

    fn open_preview_read(&self, id: Uuid) -> Result<Box<dyn Read>> {
        open_file_read(&self.preview_path(id))
    }

    fn open_preview_write(&self, id: Uuid) -> Result<Box<dyn Write>> {
        open_file_write(&self.preview_path(id))
    }

    fn delete_preview(&self, id: Uuid) -> Result<()> {
        delete_file(&self.preview_path(id))
    }
}

/// Read-only HTTP backend mirroring the filesystem layout under a base URL.
pub struct HttpStorage {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpStorage {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url, agent: ureq::agent() }
    }

    fn fetch(&self, path: &str) -> Result<Box<dyn Read>> {
        let url = format!("{}/{path}", self.base_url);
        match self.agent.get(&url).call() {
            Ok(response) => Ok(Box::new(response.into_reader())),
            Err(ureq::Error::Status(404, _)) => Err(anyhow::Error::new(NotFound)),
            Err(err) => Err(anyhow::Error::new(err).context(format!("fetching {url}"))),
        }
    }
}

impl Storage for HttpStorage {
    fn open_index_read(&self) -> Result<Box<dyn Read>> {
        self.fetch("resources.dat")
    }

    fn open_index_write(&self) -> Result<Box<dyn Write>> {
        Err(anyhow::Error::new(ReadOnlyStorage))
    }

    fn open_content_read(&self, id: Uuid) -> Result<Box<dyn Read>> {
        self.fetch(&format!("content/{id}.dat"))
    }

    fn open_content_write(&self, _id: Uuid) -> Result<Box<dyn Write>> {
        Err(anyhow::Error::new(ReadOnlyStorage))
    }

    fn delete_content(&self, _id: Uuid) -> Result<()> {
        Err(anyhow::Error::new(ReadOnlyStorage))
    }

    fn open_preview_read(&self, id: Uuid) -> Result<Box<dyn Read>> {
        self.fetch(&format!("preview/{id}.png"))
    }

    fn open_preview_write(&self, _id: Uuid) -> Result<Box<dyn Write>> {
        Err(anyhow::Error::new(ReadOnlyStorage))
    }

    fn delete_preview(&self, _id: Uuid) -> Result<()> {
        Err(anyhow::Error::new(ReadOnlyStorage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_content_is_the_not_found_sentinel() {
        let dir = tempdir().expect("temp dir");
        let storage = FsStorage::new(dir.path());
        let err = storage.open_content_read(Uuid::new_v4()).err().expect("no content yet");
        assert!(is_not_found(&err));
        let err = storage.open_index_read().err().expect("no index yet");
        assert!(is_not_found(&err));
    }

    #[test]
    fn content_blobs_round_trip_per_id() {
        let dir = tempdir().expect("temp dir");
        let storage = FsStorage::new(dir.path());
        let id = Uuid::new_v4();
        storage
            .open_content_write(id)
            .expect("open for write")
            .write_all(b"packed")
            .expect("write");
        let mut data = Vec::new();
        storage.open_content_read(id).expect("open for read").read_to_end(&mut data).expect("read");
        assert_eq!(data, b"packed");
        storage.delete_content(id).expect("delete");
        assert!(is_not_found(&storage.open_content_read(id).err().expect("deleted")));
    }

    #[test]
    fn http_storage_refuses_mutation() {
        let storage = HttpStorage::new("http://localhost:9/assets/");
        let err = storage.open_content_write(Uuid::new_v4()).err().expect("read-only");
        assert!(err.chain().any(|cause| cause.downcast_ref::<ReadOnlyStorage>().is_some()));
        assert!(storage.delete_content(Uuid::new_v4()).is_err());
    }
}

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use uuid::Uuid;

mod formatter;
mod storage;

pub use formatter::Formatter;
pub use storage::{is_not_found, FsStorage, HttpStorage, NotFound, ReadOnlyStorage, Storage};

use crate::dsl::Digest;

/// A named, ID'd registry entry. Content and preview bytes live in storage;
/// the record only tracks identity and the digest of the builder graph that
/// produced the content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: Uuid,
    pub name: String,
    pub source_digest: Option<Digest>,
}

/// `target_id` depends on `source_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub source_id: Uuid,
    pub target_id: Uuid,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryIndex {
    resources: Vec<Resource>,
    dependencies: Vec<DependencyEdge>,
}

/// Resource store over pluggable storage and formatter. Mutations are not
/// internally synchronized; callers serialize access (the build runner keeps
/// the registry behind a mutex).
pub struct Registry {
    storage: Box<dyn Storage>,
    formatter: Formatter,
    resources: Vec<Resource>,
    dependencies: Vec<DependencyEdge>,
}

impl Registry {
    /// Opens the registry, reading the persisted index when one exists.
    pub fn open(storage: Box<dyn Storage>, formatter: Formatter) -> Result<Self> {
        let index = match storage.open_index_read() {
            Ok(mut reader) => formatter
                .decode::<RegistryIndex>(&mut reader)
                .context("reading registry index")?,
            Err(err) if is_not_found(&err) => RegistryIndex::default(),
            Err(err) => return Err(err.context("opening registry index")),
        };
        Ok(Self {
            storage,
            formatter,
            resources: index.resources,
            dependencies: index.dependencies,
        })
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn resource(&self, id: Uuid) -> Option<&Resource> {
        self.resources.iter().find(|resource| resource.id == id)
    }

    pub fn resource_by_name(&self, name: &str) -> Option<&Resource> {
        self.resources.iter().find(|resource| resource.name == name)
    }

    /// Creates a fresh resource record. Names are unique; reusing one is an
    /// error.
    pub fn create_resource(&mut self, name: &str) -> Result<Resource> {
        if self.resource_by_name(name).is_some() {
            bail!("resource named {name:?} already exists");
        }
        let resource =
            Resource { id: Uuid::new_v4(), name: name.to_string(), source_digest: None };
        self.resources.push(resource.clone());
        self.save_index()?;
        Ok(resource)
    }

    /// Stores content bytes and replaces the resource's dependency edges with
    /// the declared set. The index is persisted before the content bytes: a
    /// crash in between may leave edges pointing at unwritten content, but
    /// never content with a stale dependency record.
    pub fn save_content(&mut self, id: Uuid, content: &[u8], dependencies: &[Uuid]) -> Result<()> {
        if self.resource(id).is_none() {
            return Err(anyhow!("unknown resource {id}"));
        }
        self.dependencies.retain(|edge| edge.target_id != id);
        for dependency in dependencies {
            self.dependencies.push(DependencyEdge { source_id: *dependency, target_id: id });
        }
        self.save_index()?;
        let mut writer = self.storage.open_content_write(id)?;
        writer.write_all(content).with_context(|| format!("writing content of {id}"))?;
        writer.flush().with_context(|| format!("flushing content of {id}"))?;
        Ok(())
    }

    pub fn read_content(&self, id: Uuid) -> Result<Vec<u8>> {
        let mut reader = self.storage.open_content_read(id)?;
        let mut content = Vec::new();
        reader.read_to_end(&mut content).with_context(|| format!("reading content of {id}"))?;
        Ok(content)
    }

    pub fn save_preview(&mut self, id: Uuid, png: &[u8]) -> Result<()> {
        if self.resource(id).is_none() {
            return Err(anyhow!("unknown resource {id}"));
        }
        let mut writer = self.storage.open_preview_write(id)?;
        writer.write_all(png).with_context(|| format!("writing preview of {id}"))?;
        writer.flush().with_context(|| format!("flushing preview of {id}"))?;
        Ok(())
    }

    pub fn read_preview(&self, id: Uuid) -> Result<Vec<u8>> {
        let mut reader = self.storage.open_preview_read(id)?;
        let mut preview = Vec::new();
        reader.read_to_end(&mut preview).with_context(|| format!("reading preview of {id}"))?;
        Ok(preview)
    }

    pub fn set_source_digest(&mut self, id: Uuid, digest: Digest) -> Result<()> {
        let resource = self
            .resources
            .iter_mut()
            .find(|resource| resource.id == id)
            .ok_or_else(|| anyhow!("unknown resource {id}"))?;
        resource.source_digest = Some(digest);
        self.save_index()
    }

    /// Removes the record, its content and preview blobs, and every
    /// dependency edge referencing it in either direction.
    pub fn delete_resource(&mut self, id: Uuid) -> Result<()> {
        let position = self
            .resources
            .iter()
            .position(|resource| resource.id == id)
            .ok_or_else(|| anyhow!("unknown resource {id}"))?;
        self.resources.remove(position);
        self.dependencies.retain(|edge| edge.source_id != id && edge.target_id != id);
        self.save_index()?;
        self.storage.delete_content(id)?;
        self.storage.delete_preview(id)?;
        Ok(())
    }

    /// Resource IDs this resource depends on.
    pub fn dependencies_of(&self, id: Uuid) -> Vec<Uuid> {
        self.dependencies
            .iter()
            .filter(|edge| edge.target_id == id)
            .map(|edge| edge.source_id)
            .collect()
    }

    /// Resource IDs depending on this resource.
    pub fn dependents_of(&self, id: Uuid) -> Vec<Uuid> {
        self.dependencies
            .iter()
            .filter(|edge| edge.source_id == id)
            .map(|edge| edge.target_id)
            .collect()
    }

    fn save_index(&self) -> Result<()> {
        let mut writer = self.storage.open_index_write()?;
        let index = RegistryIndex {
            resources: self.resources.clone(),
            dependencies: self.dependencies.clone(),
        };
        self.formatter.encode(&mut writer, &index).context("writing registry index")?;
        writer.flush().context("flushing registry index")?;
        Ok(())
    }
}

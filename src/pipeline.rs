use anyhow::{anyhow, Context, Result};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::thread::{self, ScopedJoinHandle};
use uuid::Uuid;

use crate::asset;
use crate::dsl::{self, convert_model, SharedProvider};
use crate::raster::{encode_png, Image};
use crate::registry::Registry;

/// Named build targets. An explicit object rather than package-level state,
/// so independent builds can coexist in one process.
#[derive(Default)]
pub struct BuildSet {
    models: BTreeMap<String, SharedProvider<dsl::Model>>,
    scenes: BTreeMap<String, SharedProvider<dsl::SceneDef>>,
}

impl BuildSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a named model target. Reusing a name is a programming error
    /// and fails eagerly.
    pub fn register_model(&mut self, name: &str, provider: SharedProvider<dsl::Model>) {
        if self.models.insert(name.to_string(), provider).is_some() {
            panic!("model provider {name:?} registered twice");
        }
    }

    pub fn register_scene(&mut self, name: &str, provider: SharedProvider<dsl::SceneDef>) {
        if self.scenes.insert(name.to_string(), provider).is_some() {
            panic!("scene provider {name:?} registered twice");
        }
    }

    /// Builds every registered target whose digest differs from the stored
    /// one. Model jobs run concurrently, then scene jobs (scenes resolve
    /// model resource IDs). The first failure cancels jobs that have not
    /// started and surfaces to the caller.
    pub fn run(&self, registry: &mut Registry) -> Result<()> {
        let guarded = Mutex::new(registry);
        let cancelled = AtomicBool::new(false);

        thread::scope(|scope| {
            let handles: Vec<ScopedJoinHandle<'_, Result<()>>> = self
                .models
                .iter()
                .map(|(name, provider)| {
                    let guarded = &guarded;
                    let cancelled = &cancelled;
                    scope.spawn(move || process_model(name, provider.as_ref(), guarded, cancelled))
                })
                .collect();
            collect_results(handles, &cancelled)
        })?;

        thread::scope(|scope| {
            let handles: Vec<ScopedJoinHandle<'_, Result<()>>> = self
                .scenes
                .iter()
                .map(|(name, provider)| {
                    let guarded = &guarded;
                    let cancelled = &cancelled;
                    scope.spawn(move || process_scene(name, provider.as_ref(), guarded, cancelled))
                })
                .collect();
            collect_results(handles, &cancelled)
        })
    }
}

fn collect_results(
    handles: Vec<ScopedJoinHandle<'_, Result<()>>>,
    cancelled: &AtomicBool,
) -> Result<()> {
    let mut first_error = None;
    for handle in handles {
        if let Err(err) = handle.join().expect("build worker") {
            cancelled.store(true, Ordering::SeqCst);
            if first_error.is_none() {
                first_error = Some(err);
            }
        }
    }
    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn process_model(
    name: &str,
    provider: &dyn dsl::Provider<Output = dsl::Model>,
    registry: &Mutex<&mut Registry>,
    cancelled: &AtomicBool,
) -> Result<()> {
    if cancelled.load(Ordering::SeqCst) {
        return Ok(());
    }
    eprintln!("[pipeline] Model {name:?} - processing");
    let digest = provider.digest().with_context(|| format!("digesting model {name:?}"))?;
    let resource = {
        let mut registry = registry.lock().expect("registry lock");
        let existing = registry.resource_by_name(name).cloned();
        match existing {
            Some(resource) => resource,
            None => registry.create_resource(name)?,
        }
    };
    if resource.source_digest == Some(digest) {
        eprintln!("[pipeline] Model {name:?} - up to date");
        return Ok(());
    }

    eprintln!("[pipeline] Model {name:?} - building");
    let built = provider.get().with_context(|| format!("building model {name:?}"))?;
    let wire = convert_model(&built).with_context(|| format!("converting model {name:?}"))?;
    let mut content = Vec::new();
    wire.encode_to(&mut content).with_context(|| format!("encoding model {name:?}"))?;
    let preview = model_preview(name, &wire);

    {
        let mut registry = registry.lock().expect("registry lock");
        registry.save_content(resource.id, &content, &[])?;
        if let Some(png) = preview {
            registry.save_preview(resource.id, &png)?;
        }
        registry.set_source_digest(resource.id, digest)?;
    }
    eprintln!("[pipeline] Model {name:?} - done");
    Ok(())
}

fn process_scene(
    name: &str,
    provider: &dyn dsl::Provider<Output = dsl::SceneDef>,
    registry: &Mutex<&mut Registry>,
    cancelled: &AtomicBool,
) -> Result<()> {
    if cancelled.load(Ordering::SeqCst) {
        return Ok(());
    }
    eprintln!("[pipeline] Scene {name:?} - processing");
    let digest = provider.digest().with_context(|| format!("digesting scene {name:?}"))?;
    let resource = {
        let mut registry = registry.lock().expect("registry lock");
        let existing = registry.resource_by_name(name).cloned();
        match existing {
            Some(resource) => resource,
            None => registry.create_resource(name)?,
        }
    };
    if resource.source_digest == Some(digest) {
        eprintln!("[pipeline] Scene {name:?} - up to date");
        return Ok(());
    }

    eprintln!("[pipeline] Scene {name:?} - building");
    let built = provider.get().with_context(|| format!("building scene {name:?}"))?;
    let (wire, dependencies) = {
        let registry = registry.lock().expect("registry lock");
        resolve_scene(name, &built, &registry)?
    };
    let mut content = Vec::new();
    wire.encode_to(&mut content).with_context(|| format!("encoding scene {name:?}"))?;

    {
        let mut registry = registry.lock().expect("registry lock");
        registry.save_content(resource.id, &content, &dependencies)?;
        registry.set_source_digest(resource.id, digest)?;
    }
    eprintln!("[pipeline] Scene {name:?} - done");
    Ok(())
}

fn resolve_scene(
    name: &str,
    scene: &dsl::SceneDef,
    registry: &Registry,
) -> Result<(asset::Scene, Vec<Uuid>)> {
    let mut models = Vec::with_capacity(scene.placements.len());
    let mut dependencies = Vec::new();
    for placement in &scene.placements {
        let resource = registry.resource_by_name(&placement.model).ok_or_else(|| {
            anyhow!("scene {name:?} references unknown model {:?}", placement.model)
        })?;
        if !dependencies.contains(&resource.id) {
            dependencies.push(resource.id);
        }
        models.push(asset::SceneModel {
            resource_id: resource.id.to_string(),
            translation: placement.translation.to_array(),
            rotation: [
                placement.rotation.x,
                placement.rotation.y,
                placement.rotation.z,
                placement.rotation.w,
            ],
            scale: placement.scale.to_array(),
        });
    }
    let wire = asset::Scene { ambient_color: scene.ambient_color.to_array(), models };
    Ok((wire, dependencies))
}

/// Preview blob for content carrying a small-enough 2D RGBA8 texture: the
/// first such texture scaled to at most 128px and PNG-encoded. Preview
/// failures only cost the preview, never the build.
fn model_preview(name: &str, model: &asset::Model) -> Option<Vec<u8>> {
    let texture = model
        .textures
        .iter()
        .find(|texture| texture.format == asset::TexelFormat::Rgba8 && texture.layers.len() == 1)?;
    let width = texture.width as usize;
    let height = texture.height as usize;
    if width == 0 || height == 0 {
        return None;
    }
    let image = Image::from_rgba8_data(width, height, &texture.layers[0].data);
    let largest = width.max(height);
    let scaled = if largest > 128 {
        let factor = 128.0 / largest as f64;
        image.scale(
            ((width as f64 * factor) as usize).max(1),
            ((height as f64 * factor) as usize).max(1),
        )
    } else {
        image
    };
    match encode_png(&scaled) {
        Ok(png) => Some(png),
        Err(err) => {
            eprintln!("[pipeline] Model {name:?} - preview failed: {err:?}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl;

    #[test]
    #[should_panic(expected = "registered twice")]
    fn duplicate_model_registration_is_fatal() {
        let mut build_set = BuildSet::new();
        build_set.register_model("tree", dsl::model("tree", Vec::new()));
        build_set.register_model("tree", dsl::model("tree", Vec::new()));
    }
}

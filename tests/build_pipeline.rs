use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use glam::DVec3;
use merlin_assets::asset::Scene;
use merlin_assets::dsl::{
    self, create_digest, Digest, Model, Provider, ScenePlacement, SharedProvider,
};
use merlin_assets::registry::{Formatter, FsStorage, Registry};
use merlin_assets::BuildSet;
use tempfile::tempdir;

struct CountingModelProvider {
    marker: f64,
    get_calls: Arc<AtomicUsize>,
}

impl Provider for CountingModelProvider {
    type Output = Model;

    fn get(&self) -> Result<Model> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        let mut model = Model::default();
        let mut node = dsl::Node::new("root");
        node.translation = DVec3::new(self.marker, 0.0, 0.0);
        model.nodes.push(node);
        Ok(model)
    }

    fn digest(&self) -> Result<Digest> {
        Ok(create_digest("counting-model", |hasher| hasher.write_f64(self.marker)))
    }
}

struct FailingModelProvider;

impl Provider for FailingModelProvider {
    type Output = Model;

    fn get(&self) -> Result<Model> {
        Err(anyhow!("source file corrupted"))
    }

    fn digest(&self) -> Result<Digest> {
        Ok(create_digest("failing-model", |_| {}))
    }
}

fn open_registry(dir: &std::path::Path) -> Registry {
    Registry::open(Box::new(FsStorage::new(dir)), Formatter::Binary).expect("open registry")
}

#[test]
fn unchanged_providers_are_skipped_on_rebuild() {
    let dir = tempdir().expect("temp dir");
    let get_calls = Arc::new(AtomicUsize::new(0));
    let provider: SharedProvider<Model> =
        Arc::new(CountingModelProvider { marker: 1.0, get_calls: get_calls.clone() });
    let mut build_set = BuildSet::new();
    build_set.register_model("cottage", provider);

    let mut registry = open_registry(dir.path());
    build_set.run(&mut registry).expect("first build");
    assert_eq!(get_calls.load(Ordering::SeqCst), 1);

    let id = registry.resource_by_name("cottage").expect("resource").id;
    let content_path = dir.path().join("content").join(format!("{id}.dat"));
    let first_bytes = std::fs::read(&content_path).expect("content bytes");

    build_set.run(&mut registry).expect("second build");
    assert_eq!(get_calls.load(Ordering::SeqCst), 1, "unchanged graph must not rebuild");
    assert_eq!(
        std::fs::read(&content_path).expect("content bytes"),
        first_bytes,
        "content bytes must be untouched by the skipped rebuild"
    );
}

#[test]
fn changed_digest_triggers_rebuild() {
    let dir = tempdir().expect("temp dir");
    let mut registry = open_registry(dir.path());

    let first_calls = Arc::new(AtomicUsize::new(0));
    let mut build_set = BuildSet::new();
    build_set.register_model(
        "cottage",
        Arc::new(CountingModelProvider { marker: 1.0, get_calls: first_calls.clone() }),
    );
    build_set.run(&mut registry).expect("first build");

    let second_calls = Arc::new(AtomicUsize::new(0));
    let mut build_set = BuildSet::new();
    build_set.register_model(
        "cottage",
        Arc::new(CountingModelProvider { marker: 2.0, get_calls: second_calls.clone() }),
    );
    build_set.run(&mut registry).expect("second build");
    assert_eq!(second_calls.load(Ordering::SeqCst), 1, "changed digest must rebuild");
}

#[test]
fn failing_provider_aborts_the_run() {
    let dir = tempdir().expect("temp dir");
    let mut registry = open_registry(dir.path());
    let mut build_set = BuildSet::new();
    build_set.register_model("broken", Arc::new(FailingModelProvider));
    let err = build_set.run(&mut registry).expect_err("run must fail");
    assert!(format!("{err:#}").contains("source file corrupted"));
}

#[test]
fn scenes_depend_on_their_placed_models() {
    let dir = tempdir().expect("temp dir");
    let mut registry = open_registry(dir.path());

    let mut build_set = BuildSet::new();
    build_set.register_model("cottage", dsl::model("cottage", Vec::new()));
    build_set.register_model("barn", dsl::model("barn", Vec::new()));
    build_set.register_scene(
        "farm",
        dsl::scene(
            "farm",
            DVec3::new(0.1, 0.1, 0.1),
            vec![ScenePlacement::new("cottage"), ScenePlacement::new("barn")],
        ),
    );
    build_set.run(&mut registry).expect("build");

    let scene_id = registry.resource_by_name("farm").expect("scene resource").id;
    let cottage_id = registry.resource_by_name("cottage").expect("cottage resource").id;
    let barn_id = registry.resource_by_name("barn").expect("barn resource").id;
    let mut dependencies = registry.dependencies_of(scene_id);
    dependencies.sort();
    let mut expected = vec![cottage_id, barn_id];
    expected.sort();
    assert_eq!(dependencies, expected);

    let content = registry.read_content(scene_id).expect("scene content");
    let decoded = Scene::decode_from(&mut content.as_slice()).expect("scene decodes");
    assert_eq!(decoded.models.len(), 2);
    assert_eq!(decoded.models[0].resource_id, cottage_id.to_string());
}

#[test]
fn scene_with_unknown_model_fails() {
    let dir = tempdir().expect("temp dir");
    let mut registry = open_registry(dir.path());
    let mut build_set = BuildSet::new();
    build_set.register_scene(
        "farm",
        dsl::scene("farm", DVec3::ZERO, vec![ScenePlacement::new("missing")]),
    );
    let err = build_set.run(&mut registry).expect_err("unknown model must fail");
    assert!(format!("{err:#}").contains("missing"));
}

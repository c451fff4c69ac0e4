use merlin_assets::registry::{is_not_found, Formatter, FsStorage, Registry};
use tempfile::tempdir;

fn open_registry(dir: &std::path::Path, formatter: Formatter) -> Registry {
    Registry::open(Box::new(FsStorage::new(dir)), formatter).expect("open registry")
}

#[test]
fn resources_and_content_persist_across_reopen() {
    let dir = tempdir().expect("temp dir");
    for formatter in [Formatter::Json { pretty: true }, Formatter::Binary] {
        let root = dir.path().join(format!("{formatter:?}"));
        let id = {
            let mut registry = open_registry(&root, formatter);
            let resource = registry.create_resource("cottage").expect("create");
            registry.save_content(resource.id, b"packed model", &[]).expect("save content");
            registry.set_source_digest(resource.id, [7u8; 32]).expect("set digest");
            resource.id
        };
        let registry = open_registry(&root, formatter);
        let resource = registry.resource_by_name("cottage").expect("resource survives reopen");
        assert_eq!(resource.id, id);
        assert_eq!(resource.source_digest, Some([7u8; 32]));
        assert_eq!(registry.read_content(id).expect("content"), b"packed model");
    }
}

#[test]
fn duplicate_names_are_rejected() {
    let dir = tempdir().expect("temp dir");
    let mut registry = open_registry(dir.path(), Formatter::Binary);
    registry.create_resource("cottage").expect("create");
    assert!(registry.create_resource("cottage").is_err());
}

#[test]
fn missing_content_is_distinguishable() {
    let dir = tempdir().expect("temp dir");
    let mut registry = open_registry(dir.path(), Formatter::Binary);
    let resource = registry.create_resource("cottage").expect("create");
    let err = registry.read_content(resource.id).expect_err("no content yet");
    assert!(is_not_found(&err));
}

#[test]
fn save_content_replaces_dependency_edges() {
    let dir = tempdir().expect("temp dir");
    let mut registry = open_registry(dir.path(), Formatter::Binary);
    let a = registry.create_resource("texture-a").expect("create a").id;
    let b = registry.create_resource("texture-b").expect("create b").id;
    let c = registry.create_resource("texture-c").expect("create c").id;
    let scene = registry.create_resource("scene").expect("create scene").id;

    registry.save_content(scene, b"v1", &[a, b]).expect("save with [a, b]");
    let mut deps = registry.dependencies_of(scene);
    deps.sort();
    let mut expected = vec![a, b];
    expected.sort();
    assert_eq!(deps, expected);

    registry.save_content(scene, b"v2", &[a, c]).expect("save with [a, c]");
    let mut deps = registry.dependencies_of(scene);
    deps.sort();
    let mut expected = vec![a, c];
    expected.sort();
    assert_eq!(deps, expected, "edge set must be replaced, not merged");

    assert_eq!(registry.dependents_of(a), vec![scene]);
    assert!(registry.dependents_of(b).is_empty());
}

#[test]
fn delete_removes_content_and_edges_in_both_directions() {
    let dir = tempdir().expect("temp dir");
    let mut registry = open_registry(dir.path(), Formatter::Binary);
    let texture = registry.create_resource("texture").expect("create").id;
    let model = registry.create_resource("model").expect("create").id;
    let scene = registry.create_resource("scene").expect("create").id;
    registry.save_content(model, b"model", &[texture]).expect("save model");
    registry.save_content(scene, b"scene", &[model]).expect("save scene");

    registry.delete_resource(model).expect("delete");
    assert!(registry.resource(model).is_none());
    assert!(is_not_found(&registry.read_content(model).expect_err("content removed")));
    assert!(registry.dependencies_of(scene).is_empty(), "edges into the resource are gone");
    assert!(registry.dependents_of(texture).is_empty(), "edges out of the resource are gone");
}

#[test]
fn previews_round_trip() {
    let dir = tempdir().expect("temp dir");
    let mut registry = open_registry(dir.path(), Formatter::Binary);
    let resource = registry.create_resource("cottage").expect("create");
    registry.save_preview(resource.id, b"not really a png").expect("save preview");
    assert_eq!(registry.read_preview(resource.id).expect("read preview"), b"not really a png");
}

use std::sync::Arc;

use glam::DVec3;
use merlin_assets::dsl::{self, PassSlot};
use merlin_assets::raster::{Color, CubeImage, CubeSide, Image};
use merlin_assets::registry::{Formatter, FsStorage, Registry};
use merlin_assets::{BuildSet, ResourceSet};
use tempfile::tempdir;

fn checker_image() -> Image {
    let mut image = Image::new(4, 4);
    for y in 0..4 {
        for x in 0..4 {
            let value = ((x + y) % 2) as f64;
            image.set_texel(x, y, Color::new(value, value, value, 1.0));
        }
    }
    image
}

struct CheckerImageProvider;

impl dsl::Provider for CheckerImageProvider {
    type Output = Image;

    fn get(&self) -> anyhow::Result<Image> {
        Ok(checker_image())
    }

    fn digest(&self) -> anyhow::Result<dsl::Digest> {
        Ok(dsl::create_digest("checker-image", |_| {}))
    }
}

struct SmallCubeProvider;

impl dsl::Provider for SmallCubeProvider {
    type Output = CubeImage;

    fn get(&self) -> anyhow::Result<CubeImage> {
        let mut cube = CubeImage::new(2);
        for side in CubeSide::ALL {
            let mut image = Image::new(2, 2);
            for y in 0..2 {
                for x in 0..2 {
                    image.set_texel(x, y, Color::new(0.5, 0.5, 1.0, 1.0));
                }
            }
            cube.set_side(side, image);
        }
        Ok(cube)
    }

    fn digest(&self) -> anyhow::Result<dsl::Digest> {
        Ok(dsl::create_digest("small-cube", |_| {}))
    }
}

fn build_sample_model(dir: &std::path::Path) -> uuid::Uuid {
    let shader = dsl::shader("pbr", "shader://pbr/forward");
    let base_color = dsl::texture_2d(
        "checker",
        Arc::new(CheckerImageProvider),
        vec![dsl::set_mipmapping(true)],
    );
    let material = dsl::material(
        "checker",
        vec![
            dsl::set_pass(PassSlot::Forward, shader.clone(), Default::default()),
            dsl::set_pass(PassSlot::Shadow, shader, Default::default()),
            dsl::bind_texture("baseColorTexture", base_color, Vec::new()),
            dsl::bind_property("roughnessFactor", dsl::PropertyValue::Float(0.5)),
        ],
    );
    let definition = dsl::mesh_definition("crate", dsl::cube_geometry(1.0), vec![material]);

    let environment = dsl::cube_texture("environment", Arc::new(SmallCubeProvider), Vec::new());
    let body_material = dsl::body_material("wood", 0.7, 0.2);
    let body = dsl::body_definition(
        "crate-collision",
        body_material,
        vec![dsl::CollisionBoxDef {
            translation: DVec3::ZERO,
            rotation: glam::DQuat::IDENTITY,
            width: 1.0,
            height: 1.0,
            length: 1.0,
        }],
        Vec::new(),
    );

    let model = dsl::model(
        "playground",
        vec![
            dsl::append_node(dsl::node("crate", vec![dsl::set_mesh(definition)])),
            dsl::append_node(dsl::node("crate-body", vec![dsl::set_body(body)])),
            dsl::append_node(dsl::node(
                "sun",
                vec![dsl::set_directional_light(DVec3::new(1.0, 1.0, 0.9))],
            )),
            dsl::append_node(dsl::node(
                "ambience",
                vec![dsl::set_ambient_light(environment.clone(), environment)],
            )),
        ],
    );

    let mut build_set = BuildSet::new();
    build_set.register_model("playground", model);
    let mut registry =
        Registry::open(Box::new(FsStorage::new(dir)), Formatter::Binary).expect("open registry");
    build_set.run(&mut registry).expect("build");
    registry.resource_by_name("playground").expect("resource").id
}

#[test]
fn built_models_hydrate_into_live_engine_objects() {
    let dir = tempdir().expect("temp dir");
    let id = build_sample_model(dir.path());

    let resource_set = ResourceSet::new(Arc::new(FsStorage::new(dir.path())));
    let resource = resource_set.load_model(id).wait().expect("load model");

    assert_eq!(resource.nodes.len(), 4);
    assert_eq!(resource.meshes.len(), 1);
    assert_eq!(resource.mesh_definitions.len(), 1);
    assert_eq!(resource.geometries.len(), 1);
    assert_eq!(resource.materials.len(), 1);
    assert_eq!(resource.shaders.len(), 1);
    assert_eq!(resource.textures.len(), 2, "base color plus environment cube");
    assert_eq!(resource.bodies.len(), 1);
    assert_eq!(resource.body_definitions.len(), 1);
    assert_eq!(resource.body_materials.len(), 1);
    assert_eq!(resource.directional_lights.len(), 1);
    assert_eq!(resource.ambient_lights.len(), 1);

    let mesh = &resource.meshes[0];
    assert_eq!(mesh.node_index, 0);
    assert!(Arc::ptr_eq(&mesh.definition, &resource.mesh_definitions[0]));
    assert!(Arc::ptr_eq(&mesh.definition.geometry, &resource.geometries[0]));
    assert!(Arc::ptr_eq(&mesh.definition.materials[0], &resource.materials[0]));

    let ambient = &resource.ambient_lights[0];
    assert!(
        Arc::ptr_eq(&ambient.reflection, &ambient.refraction),
        "one texture entry shared by both ambient slots"
    );
    assert_eq!(ambient.reflection.layer_count, 6);
}

#[test]
fn repeated_loads_share_the_same_resource() {
    let dir = tempdir().expect("temp dir");
    let id = build_sample_model(dir.path());

    let resource_set = ResourceSet::new(Arc::new(FsStorage::new(dir.path())));
    let first = resource_set.load_model(id).wait().expect("first load");
    let second = resource_set.load_model(id).wait().expect("second load");
    assert!(Arc::ptr_eq(&first, &second), "loads share one hydrated resource");
}

#[test]
fn loading_a_missing_resource_fails() {
    let dir = tempdir().expect("temp dir");
    std::fs::create_dir_all(dir.path()).expect("dir");
    let resource_set = ResourceSet::new(Arc::new(FsStorage::new(dir.path())));
    let err = resource_set.load_model(uuid::Uuid::new_v4()).wait().expect_err("missing content");
    assert!(merlin_assets::registry::is_not_found(&err));
}

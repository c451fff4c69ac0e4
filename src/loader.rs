use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread;
use uuid::Uuid;

use crate::asset;
use crate::engine::{self, Engine};
use crate::registry::Storage;
use crate::task::{wait_all, Promise, Worker};

/// Live engine objects hydrated from one packed model asset, index-aligned
/// with the wire arrays.
#[derive(Debug)]
pub struct ModelResource {
    pub nodes: Vec<asset::Node>,
    pub textures: Vec<Arc<engine::Texture>>,
    pub shaders: Vec<Arc<engine::Shader>>,
    pub materials: Vec<Arc<engine::Material>>,
    pub geometries: Vec<Arc<engine::Geometry>>,
    pub mesh_definitions: Vec<Arc<engine::MeshDefinition>>,
    pub meshes: Vec<Arc<engine::Mesh>>,
    pub body_materials: Vec<Arc<engine::BodyMaterial>>,
    pub body_definitions: Vec<Arc<engine::BodyDefinition>>,
    pub bodies: Vec<Arc<engine::Body>>,
    pub ambient_lights: Vec<Arc<engine::AmbientLight>>,
    pub point_lights: Vec<Arc<engine::PointLight>>,
    pub spot_lights: Vec<Arc<engine::SpotLight>>,
    pub directional_lights: Vec<Arc<engine::DirectionalLight>>,
    pub skies: Vec<Arc<engine::Sky>>,
}

struct IoContext {
    storage: Arc<dyn Storage>,
}

/// Asynchronous loader hydrating packed assets into live engine objects.
///
/// Reads and decodes happen on the I/O worker; every `create_*` call runs on
/// the engine worker, the only thread allowed to touch the engine contexts.
/// Loaded models are cached by resource ID, so concurrent and repeated loads
/// share one promise and one set of live objects.
pub struct ResourceSet {
    io_worker: Arc<Worker<IoContext>>,
    engine_worker: Arc<Worker<Engine>>,
    cache: Mutex<HashMap<Uuid, Promise<Arc<ModelResource>>>>,
}

impl ResourceSet {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            io_worker: Arc::new(Worker::spawn("asset-io", IoContext { storage })),
            engine_worker: Arc::new(Worker::spawn("engine", Engine::new())),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn load_model(&self, id: Uuid) -> Promise<Arc<ModelResource>> {
        let mut cache = self.cache.lock().expect("resource cache lock");
        if let Some(promise) = cache.get(&id) {
            return promise.clone();
        }
        let promise = Promise::pending();
        cache.insert(id, promise.clone());
        drop(cache);

        let delivery = promise.clone();
        let io_worker = self.io_worker.clone();
        let engine_worker = self.engine_worker.clone();
        let _coordinator = thread::Builder::new()
            .name(format!("model-load-{id}"))
            .spawn(move || {
                let read = io_worker.schedule(move |io| {
                    let mut reader = io.storage.open_content_read(id)?;
                    let model = asset::Model::decode_from(&mut reader)
                        .with_context(|| format!("decoding model {id}"))?;
                    model.validate().with_context(|| format!("validating model {id}"))?;
                    Ok(Arc::new(model))
                });
                let outcome = read
                    .wait()
                    .and_then(|model| convert_model_resource(&engine_worker, &model));
                match outcome {
                    Ok(resource) => delivery.deliver(resource),
                    Err(err) => {
                        eprintln!("[loader] model {id} failed: {err:#}");
                        delivery.fail(err);
                    }
                }
            })
            .expect("model load thread");
        promise
    }
}

/// Stage-by-stage conversion in dependency order. Each stage's promise slice
/// is fully drained before the next stage starts, so index lookups into the
/// previous stage always resolve; composite objects additionally wait on the
/// promises of the specific entries they reference before scheduling their
/// own creation.
fn convert_model_resource(
    worker: &Worker<Engine>,
    model: &asset::Model,
) -> Result<Arc<ModelResource>> {
    let texture_promises: Vec<_> =
        model.textures.iter().map(|texture| convert_texture(worker, texture)).collect();
    let shader_promises: Vec<_> =
        model.shaders.iter().map(|shader| convert_shader(worker, shader)).collect();
    let textures = wait_all(&texture_promises)?;
    let shaders = wait_all(&shader_promises)?;

    let material_promises: Vec<_> = model
        .materials
        .iter()
        .map(|material| convert_material(worker, material, &texture_promises, &shader_promises))
        .collect();
    let materials = wait_all(&material_promises)?;

    let geometry_promises: Vec<_> =
        model.geometries.iter().map(|geometry| convert_geometry(worker, geometry)).collect();
    let geometries = wait_all(&geometry_promises)?;

    let definition_promises: Vec<_> = model
        .mesh_definitions
        .iter()
        .map(|definition| {
            convert_mesh_definition(worker, definition, &geometry_promises, &material_promises)
        })
        .collect();
    let mesh_definitions = wait_all(&definition_promises)?;

    let mesh_promises: Vec<_> = model
        .meshes
        .iter()
        .map(|mesh| convert_mesh(worker, mesh, &definition_promises))
        .collect();
    let meshes = wait_all(&mesh_promises)?;

    let body_material_promises: Vec<_> = model
        .body_materials
        .iter()
        .map(|material| {
            let friction = material.friction_coefficient;
            let restitution = material.restitution_coefficient;
            worker.schedule(move |engine| {
                Ok(engine.physics.create_body_material(friction, restitution))
            })
        })
        .collect();
    let body_materials = wait_all(&body_material_promises)?;

    let body_definition_promises: Vec<_> = model
        .body_definitions
        .iter()
        .map(|definition| convert_body_definition(worker, definition, &body_material_promises))
        .collect();
    let body_definitions = wait_all(&body_definition_promises)?;

    let body_promises: Vec<_> = model
        .bodies
        .iter()
        .map(|body| {
            let definition = body_definition_promises[body.definition_index as usize].clone();
            let node_index = body.node_index as u32;
            match definition.wait() {
                Ok(definition) => worker.schedule(move |engine| {
                    Ok(engine.physics.create_body(definition, node_index))
                }),
                Err(err) => Promise::failed(err),
            }
        })
        .collect();
    let bodies = wait_all(&body_promises)?;

    let ambient_promises: Vec<_> = model
        .ambient_lights
        .iter()
        .map(|light| convert_ambient_light(worker, light, &texture_promises))
        .collect();
    let ambient_lights = wait_all(&ambient_promises)?;

    let point_promises: Vec<_> = model
        .point_lights
        .iter()
        .map(|light| {
            let emit_color = light.emit_color;
            let emit_distance = light.emit_distance;
            let node_index = light.node_index as u32;
            worker.schedule(move |engine| {
                Ok(engine.graphics.create_point_light(emit_color, emit_distance, node_index))
            })
        })
        .collect();
    let point_lights = wait_all(&point_promises)?;

    let spot_promises: Vec<_> = model
        .spot_lights
        .iter()
        .map(|light| {
            let emit_color = light.emit_color;
            let emit_distance = light.emit_distance;
            let emit_angle_outer = light.emit_angle_outer;
            let emit_angle_inner = light.emit_angle_inner;
            let node_index = light.node_index as u32;
            worker.schedule(move |engine| {
                Ok(engine.graphics.create_spot_light(
                    emit_color,
                    emit_distance,
                    emit_angle_outer,
                    emit_angle_inner,
                    node_index,
                ))
            })
        })
        .collect();
    let spot_lights = wait_all(&spot_promises)?;

    let directional_promises: Vec<_> = model
        .directional_lights
        .iter()
        .map(|light| {
            let emit_color = light.emit_color;
            let node_index = light.node_index as u32;
            worker.schedule(move |engine| {
                Ok(engine.graphics.create_directional_light(emit_color, node_index))
            })
        })
        .collect();
    let directional_lights = wait_all(&directional_promises)?;

    let sky_promises: Vec<_> = model
        .skies
        .iter()
        .map(|sky| {
            let material = material_promises[sky.material_index as usize].clone();
            let node_index = sky.node_index as u32;
            match material.wait() {
                Ok(material) => worker
                    .schedule(move |engine| Ok(engine.graphics.create_sky(material, node_index))),
                Err(err) => Promise::failed(err),
            }
        })
        .collect();
    let skies = wait_all(&sky_promises)?;

    Ok(Arc::new(ModelResource {
        nodes: model.nodes.clone(),
        textures,
        shaders,
        materials,
        geometries,
        mesh_definitions,
        meshes,
        body_materials,
        body_definitions,
        bodies,
        ambient_lights,
        point_lights,
        spot_lights,
        directional_lights,
        skies,
    }))
}

fn convert_texture(
    worker: &Worker<Engine>,
    texture: &asset::Texture,
) -> Promise<Arc<engine::Texture>> {
    let width = texture.width;
    let height = texture.height;
    let format = texture.format;
    let flags = texture.flags;
    let layers: Vec<Vec<u8>> = texture.layers.iter().map(|layer| layer.data.clone()).collect();
    worker.schedule(move |engine| {
        engine.graphics.create_texture(width, height, format, flags, &layers)
    })
}

fn convert_shader(
    worker: &Worker<Engine>,
    shader: &asset::Shader,
) -> Promise<Arc<engine::Shader>> {
    let source = shader.source.clone();
    worker.schedule(move |engine| engine.graphics.create_shader(&source))
}

fn convert_material(
    worker: &Worker<Engine>,
    material: &asset::Material,
    texture_promises: &[Promise<Arc<engine::Texture>>],
    shader_promises: &[Promise<Arc<engine::Shader>>],
) -> Promise<Arc<engine::Material>> {
    let needed_textures: Vec<_> = material
        .textures
        .iter()
        .map(|binding| texture_promises[binding.texture_index as usize].clone())
        .collect();
    let needed_shaders: Vec<_> = material
        .passes()
        .map(|pass| shader_promises[pass.shader_index as usize].clone())
        .collect();
    let textures = match wait_all(&needed_textures) {
        Ok(textures) => textures,
        Err(err) => return Promise::failed(err),
    };
    let shaders = match wait_all(&needed_shaders) {
        Ok(shaders) => shaders,
        Err(err) => return Promise::failed(err),
    };
    let name = material.name.clone();
    worker.schedule(move |engine| Ok(engine.graphics.create_material(&name, shaders, textures)))
}

fn convert_geometry(
    worker: &Worker<Engine>,
    geometry: &asset::Geometry,
) -> Promise<Arc<engine::Geometry>> {
    let stride = geometry
        .vertex_buffers
        .first()
        .map(|buffer| buffer.stride.max(1))
        .unwrap_or(1);
    let vertex_count = geometry
        .vertex_buffers
        .first()
        .map(|buffer| buffer.data.len() as u32 / stride)
        .unwrap_or(0);
    let index_count =
        (geometry.index_buffer.data.len() / geometry.index_buffer.layout.index_size()) as u32;
    let fragment_count = geometry.fragments.len() as u32;
    worker.schedule(move |engine| {
        Ok(engine.graphics.create_geometry(vertex_count, index_count, fragment_count))
    })
}

fn convert_mesh_definition(
    worker: &Worker<Engine>,
    definition: &asset::MeshDefinition,
    geometry_promises: &[Promise<Arc<engine::Geometry>>],
    material_promises: &[Promise<Arc<engine::Material>>],
) -> Promise<Arc<engine::MeshDefinition>> {
    let geometry_promise = geometry_promises[definition.geometry_index as usize].clone();
    let needed_materials: Vec<_> = definition
        .material_indices
        .iter()
        .map(|index| material_promises[*index as usize].clone())
        .collect();
    let geometry = match geometry_promise.wait() {
        Ok(geometry) => geometry,
        Err(err) => return Promise::failed(err),
    };
    let materials = match wait_all(&needed_materials) {
        Ok(materials) => materials,
        Err(err) => return Promise::failed(err),
    };
    worker.schedule(move |engine| Ok(engine.graphics.create_mesh_definition(geometry, materials)))
}

fn convert_mesh(
    worker: &Worker<Engine>,
    mesh: &asset::Mesh,
    definition_promises: &[Promise<Arc<engine::MeshDefinition>>],
) -> Promise<Arc<engine::Mesh>> {
    let definition_promise = definition_promises[mesh.definition_index as usize].clone();
    let node_index = mesh.node_index as u32;
    match definition_promise.wait() {
        Ok(definition) => {
            worker.schedule(move |engine| Ok(engine.graphics.create_mesh(definition, node_index)))
        }
        Err(err) => Promise::failed(err),
    }
}

fn convert_body_definition(
    worker: &Worker<Engine>,
    definition: &asset::BodyDefinition,
    material_promises: &[Promise<Arc<engine::BodyMaterial>>],
) -> Promise<Arc<engine::BodyDefinition>> {
    let material_promise = material_promises[definition.material_index as usize].clone();
    let collision_box_count = definition.collision_boxes.len() as u32;
    let collision_sphere_count = definition.collision_spheres.len() as u32;
    match material_promise.wait() {
        Ok(material) => worker.schedule(move |engine| {
            Ok(engine.physics.create_body_definition(
                material,
                collision_box_count,
                collision_sphere_count,
            ))
        }),
        Err(err) => Promise::failed(err),
    }
}

fn convert_ambient_light(
    worker: &Worker<Engine>,
    light: &asset::AmbientLight,
    texture_promises: &[Promise<Arc<engine::Texture>>],
) -> Promise<Arc<engine::AmbientLight>> {
    let reflection_promise = texture_promises[light.reflection_texture_index as usize].clone();
    let refraction_promise = texture_promises[light.refraction_texture_index as usize].clone();
    let node_index = light.node_index as u32;
    let reflection = match reflection_promise.wait() {
        Ok(reflection) => reflection,
        Err(err) => return Promise::failed(err),
    };
    let refraction = match refraction_promise.wait() {
        Ok(refraction) => refraction,
        Err(err) => return Promise::failed(err),
    };
    worker.schedule(move |engine| {
        Ok(engine.graphics.create_ambient_light(reflection, refraction, node_index))
    })
}

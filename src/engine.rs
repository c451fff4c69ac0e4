//! Black-box engine services. The pipeline treats the graphics and physics
//! engines as external collaborators exposing `create_*` factory calls that
//! return opaque, ID'd live objects.

use anyhow::{bail, Result};
use std::cell::Cell;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::asset::{TexelFormat, TextureFlags};

#[derive(Debug)]
pub struct Texture {
    pub id: u32,
    pub width: u32,
    pub height: u32,
    pub format: TexelFormat,
    pub flags: TextureFlags,
    pub layer_count: u32,
}

#[derive(Debug)]
pub struct Shader {
    pub id: u32,
    pub source: String,
}

#[derive(Debug)]
pub struct Material {
    pub id: u32,
    pub name: String,
    pub shaders: Vec<Arc<Shader>>,
    pub textures: Vec<Arc<Texture>>,
}

#[derive(Debug)]
pub struct Geometry {
    pub id: u32,
    pub vertex_count: u32,
    pub index_count: u32,
    pub fragment_count: u32,
}

#[derive(Debug)]
pub struct MeshDefinition {
    pub id: u32,
    pub geometry: Arc<Geometry>,
    pub materials: Vec<Arc<Material>>,
}

#[derive(Debug)]
pub struct Mesh {
    pub id: u32,
    pub definition: Arc<MeshDefinition>,
    pub node_index: u32,
}

#[derive(Debug)]
pub struct BodyMaterial {
    pub id: u32,
    pub friction_coefficient: f64,
    pub restitution_coefficient: f64,
}

#[derive(Debug)]
pub struct BodyDefinition {
    pub id: u32,
    pub material: Arc<BodyMaterial>,
    pub collision_box_count: u32,
    pub collision_sphere_count: u32,
}

#[derive(Debug)]
pub struct Body {
    pub id: u32,
    pub definition: Arc<BodyDefinition>,
    pub node_index: u32,
}

#[derive(Debug)]
pub struct AmbientLight {
    pub id: u32,
    pub reflection: Arc<Texture>,
    pub refraction: Arc<Texture>,
    pub node_index: u32,
}

#[derive(Debug)]
pub struct PointLight {
    pub id: u32,
    pub emit_color: [f64; 3],
    pub emit_distance: f64,
    pub node_index: u32,
}

#[derive(Debug)]
pub struct SpotLight {
    pub id: u32,
    pub emit_color: [f64; 3],
    pub emit_distance: f64,
    pub emit_angle_outer: f64,
    pub emit_angle_inner: f64,
    pub node_index: u32,
}

#[derive(Debug)]
pub struct DirectionalLight {
    pub id: u32,
    pub emit_color: [f64; 3],
    pub node_index: u32,
}

#[derive(Debug)]
pub struct Sky {
    pub id: u32,
    pub material: Arc<Material>,
    pub node_index: u32,
}

/// Graphics context. Not thread-safe: it lives on the engine worker and all
/// creation calls are marshaled onto that thread.
pub struct Graphics {
    next_id: u32,
    _single_thread: PhantomData<Cell<()>>,
}

impl Graphics {
    pub fn new() -> Self {
        Self { next_id: 1, _single_thread: PhantomData }
    }

    fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn create_texture(
        &mut self,
        width: u32,
        height: u32,
        format: TexelFormat,
        flags: TextureFlags,
        layers: &[Vec<u8>],
    ) -> Result<Arc<Texture>> {
        if layers.len() != 1 && layers.len() != 6 {
            bail!("texture must carry 1 or 6 layers, got {}", layers.len());
        }
        let texel_size = match format {
            TexelFormat::Rgba8 => 4usize,
            TexelFormat::Rgba16F => 8,
            TexelFormat::Rgba32F => 16,
        };
        let expected = width as usize * height as usize * texel_size;
        for (layer_index, layer) in layers.iter().enumerate() {
            if layer.len() != expected {
                bail!(
                    "texture layer {layer_index} holds {} bytes, expected {expected}",
                    layer.len()
                );
            }
        }
        Ok(Arc::new(Texture {
            id: self.allocate_id(),
            width,
            height,
            format,
            flags,
            layer_count: layers.len() as u32,
        }))
    }

    pub fn create_shader(&mut self, source: &str) -> Result<Arc<Shader>> {
        if source.is_empty() {
            bail!("shader source is empty");
        }
        Ok(Arc::new(Shader { id: self.allocate_id(), source: source.to_string() }))
    }

    pub fn create_material(
        &mut self,
        name: &str,
        shaders: Vec<Arc<Shader>>,
        textures: Vec<Arc<Texture>>,
    ) -> Arc<Material> {
        Arc::new(Material { id: self.allocate_id(), name: name.to_string(), shaders, textures })
    }

    pub fn create_geometry(
        &mut self,
        vertex_count: u32,
        index_count: u32,
        fragment_count: u32,
    ) -> Arc<Geometry> {
        Arc::new(Geometry { id: self.allocate_id(), vertex_count, index_count, fragment_count })
    }

    pub fn create_mesh_definition(
        &mut self,
        geometry: Arc<Geometry>,
        materials: Vec<Arc<Material>>,
    ) -> Arc<MeshDefinition> {
        Arc::new(MeshDefinition { id: self.allocate_id(), geometry, materials })
    }

    pub fn create_mesh(&mut self, definition: Arc<MeshDefinition>, node_index: u32) -> Arc<Mesh> {
        Arc::new(Mesh { id: self.allocate_id(), definition, node_index })
    }

    pub fn create_ambient_light(
        &mut self,
        reflection: Arc<Texture>,
        refraction: Arc<Texture>,
        node_index: u32,
    ) -> Arc<AmbientLight> {
        Arc::new(AmbientLight { id: self.allocate_id(), reflection, refraction, node_index })
    }

    pub fn create_point_light(
        &mut self,
        emit_color: [f64; 3],
        emit_distance: f64,
        node_index: u32,
    ) -> Arc<PointLight> {
        Arc::new(PointLight { id: self.allocate_id(), emit_color, emit_distance, node_index })
    }

    pub fn create_spot_light(
        &mut self,
        emit_color: [f64; 3],
        emit_distance: f64,
        emit_angle_outer: f64,
        emit_angle_inner: f64,
        node_index: u32,
    ) -> Arc<SpotLight> {
        Arc::new(SpotLight {
            id: self.allocate_id(),
            emit_color,
            emit_distance,
            emit_angle_outer,
            emit_angle_inner,
            node_index,
        })
    }

    pub fn create_directional_light(
        &mut self,
        emit_color: [f64; 3],
        node_index: u32,
    ) -> Arc<DirectionalLight> {
        Arc::new(DirectionalLight { id: self.allocate_id(), emit_color, node_index })
    }

    pub fn create_sky(&mut self, material: Arc<Material>, node_index: u32) -> Arc<Sky> {
        Arc::new(Sky { id: self.allocate_id(), material, node_index })
    }
}

impl Default for Graphics {
    fn default() -> Self {
        Self::new()
    }
}

/// Physics context. Same single-thread discipline as `Graphics`.
pub struct Physics {
    next_id: u32,
    _single_thread: PhantomData<Cell<()>>,
}

impl Physics {
    pub fn new() -> Self {
        Self { next_id: 1, _single_thread: PhantomData }
    }

    fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn create_body_material(
        &mut self,
        friction_coefficient: f64,
        restitution_coefficient: f64,
    ) -> Arc<BodyMaterial> {
        Arc::new(BodyMaterial {
            id: self.allocate_id(),
            friction_coefficient,
            restitution_coefficient,
        })
    }

    pub fn create_body_definition(
        &mut self,
        material: Arc<BodyMaterial>,
        collision_box_count: u32,
        collision_sphere_count: u32,
    ) -> Arc<BodyDefinition> {
        Arc::new(BodyDefinition {
            id: self.allocate_id(),
            material,
            collision_box_count,
            collision_sphere_count,
        })
    }

    pub fn create_body(&mut self, definition: Arc<BodyDefinition>, node_index: u32) -> Arc<Body> {
        Arc::new(Body { id: self.allocate_id(), definition, node_index })
    }
}

impl Default for Physics {
    fn default() -> Self {
        Self::new()
    }
}

/// The engine worker's context: both contexts live on one dedicated thread.
pub struct Engine {
    pub graphics: Graphics,
    pub physics: Physics,
}

impl Engine {
    pub fn new() -> Self {
        Self { graphics: Graphics::new(), physics: Physics::new() }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

use anyhow::{Context, Result};
use glam::{DMat4, DQuat, DVec3};
use std::path::PathBuf;
use std::sync::Arc;

use super::digest::{create_digest, digest_file, Digest};
use super::geometry::{GeometryBuilder, Vertex, VertexFormat};
use super::operation::{Operation, Target};
use super::provider::{once, Provider, SharedProvider};
use crate::asset::{
    Blending, Comparison, CullMode, FaceOrientation, FilterMode, NodeFlags, TexelFormat,
    TextureFlags, Topology, WrapMode,
};
use crate::raster::{
    build_equirectangular_cube_image, build_irradiance_cube_image, load_image, CubeImage, Image,
};

pub type Operations = Vec<Arc<dyn Operation>>;

#[derive(Debug, Clone)]
pub struct ShaderDef {
    pub source: String,
}

#[derive(Debug, Clone)]
pub enum TextureContent {
    TwoD(Image),
    Cube(CubeImage),
}

#[derive(Debug, Clone)]
pub struct TextureDef {
    pub content: TextureContent,
    pub format: TexelFormat,
    pub flags: TextureFlags,
}

#[derive(Debug, Clone)]
pub struct SamplerDef {
    pub texture: Arc<TextureDef>,
    pub wrapping: WrapMode,
    pub filtering: FilterMode,
    pub mipmapping: bool,
}

impl SamplerDef {
    pub fn new(texture: Arc<TextureDef>) -> Self {
        Self {
            texture,
            wrapping: WrapMode::Repeat,
            filtering: FilterMode::Linear,
            mipmapping: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MaterialPassDef {
    pub culling: CullMode,
    pub front_face: FaceOrientation,
    pub depth_test: bool,
    pub depth_write: bool,
    pub depth_comparison: Comparison,
    pub blending: Blending,
    pub shader: Arc<ShaderDef>,
}

impl MaterialPassDef {
    pub fn new(shader: Arc<ShaderDef>) -> Self {
        Self {
            culling: CullMode::Back,
            front_face: FaceOrientation::CounterClockwise,
            depth_test: true,
            depth_write: true,
            depth_comparison: Comparison::LessOrEqual,
            blending: Blending::Opaque,
            shader,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassSlot {
    Geometry,
    Shadow,
    Forward,
    Sky,
    Postprocess,
}

impl PassSlot {
    pub(crate) fn tag(self) -> u8 {
        match self {
            PassSlot::Geometry => 0,
            PassSlot::Shadow => 1,
            PassSlot::Forward => 2,
            PassSlot::Sky => 3,
            PassSlot::Postprocess => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PropertyValue {
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Uint(u32),
}

impl PropertyValue {
    /// Little-endian byte rendering used in wire property bindings.
    pub fn data(&self) -> Vec<u8> {
        match self {
            PropertyValue::Float(value) => value.to_le_bytes().to_vec(),
            PropertyValue::Vec2(values) => values.iter().flat_map(|v| v.to_le_bytes()).collect(),
            PropertyValue::Vec3(values) => values.iter().flat_map(|v| v.to_le_bytes()).collect(),
            PropertyValue::Vec4(values) => values.iter().flat_map(|v| v.to_le_bytes()).collect(),
            PropertyValue::Uint(value) => value.to_le_bytes().to_vec(),
        }
    }
}

#[derive(Debug, Default)]
pub struct MaterialDef {
    pub name: String,
    pub geometry_pass: Option<MaterialPassDef>,
    pub shadow_pass: Option<MaterialPassDef>,
    pub forward_pass: Option<MaterialPassDef>,
    pub sky_pass: Option<MaterialPassDef>,
    pub postprocess_pass: Option<MaterialPassDef>,
    pub samplers: Vec<(String, SamplerDef)>,
    pub properties: Vec<(String, PropertyValue)>,
}

impl MaterialDef {
    pub fn named(name: &str) -> Self {
        Self { name: name.to_string(), ..Self::default() }
    }

    pub fn pass_slot_mut(&mut self, slot: PassSlot) -> &mut Option<MaterialPassDef> {
        match slot {
            PassSlot::Geometry => &mut self.geometry_pass,
            PassSlot::Shadow => &mut self.shadow_pass,
            PassSlot::Forward => &mut self.forward_pass,
            PassSlot::Sky => &mut self.sky_pass,
            PassSlot::Postprocess => &mut self.postprocess_pass,
        }
    }
}

/// Deduplicated vertex/index data plus the attribute mask it carries.
#[derive(Debug)]
pub struct GeometryDef {
    pub format: VertexFormat,
    pub builder: GeometryBuilder,
}

#[derive(Debug)]
pub struct MeshDefinitionDef {
    pub geometry: Arc<GeometryDef>,
    /// One material per geometry fragment.
    pub materials: Vec<Arc<MaterialDef>>,
}

#[derive(Debug, Clone)]
pub struct BodyMaterialDef {
    pub friction_coefficient: f64,
    pub restitution_coefficient: f64,
}

#[derive(Debug, Clone)]
pub struct CollisionBoxDef {
    pub translation: DVec3,
    pub rotation: DQuat,
    pub width: f64,
    pub height: f64,
    pub length: f64,
}

#[derive(Debug, Clone)]
pub struct CollisionSphereDef {
    pub translation: DVec3,
    pub radius: f64,
}

#[derive(Debug)]
pub struct BodyDefinitionDef {
    pub material: Arc<BodyMaterialDef>,
    pub collision_boxes: Vec<CollisionBoxDef>,
    pub collision_spheres: Vec<CollisionSphereDef>,
}

#[derive(Debug, Clone)]
pub struct JointDef {
    /// Resolved to a node index by the converter.
    pub node_name: String,
    pub inverse_bind_matrix: DMat4,
}

#[derive(Debug, Clone)]
pub struct ArmatureDef {
    pub joints: Vec<JointDef>,
}

#[derive(Debug, Clone)]
pub enum NodeEssence {
    Empty,
    Mesh {
        definition: Arc<MeshDefinitionDef>,
        armature: Option<Arc<ArmatureDef>>,
    },
    Body {
        definition: Arc<BodyDefinitionDef>,
    },
    PointLight {
        emit_color: DVec3,
        emit_distance: f64,
    },
    SpotLight {
        emit_color: DVec3,
        emit_distance: f64,
        emit_angle_outer: f64,
        emit_angle_inner: f64,
    },
    DirectionalLight {
        emit_color: DVec3,
    },
    AmbientLight {
        reflection: Arc<TextureDef>,
        refraction: Arc<TextureDef>,
    },
    Sky {
        material: Arc<MaterialDef>,
    },
}

/// Builder-time scene-graph node. The tree is owned exclusively by the build
/// that produced it.
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub translation: DVec3,
    pub rotation: DQuat,
    pub scale: DVec3,
    pub flags: NodeFlags,
    pub essence: NodeEssence,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            translation: DVec3::ZERO,
            rotation: DQuat::IDENTITY,
            scale: DVec3::ONE,
            flags: NodeFlags::empty(),
            essence: NodeEssence::Empty,
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Model {
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone)]
pub struct ScenePlacement {
    /// Name of a registered model provider; resolved to a resource ID by the
    /// build runner.
    pub model: String,
    pub translation: DVec3,
    pub rotation: DQuat,
    pub scale: DVec3,
}

impl ScenePlacement {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            translation: DVec3::ZERO,
            rotation: DQuat::IDENTITY,
            scale: DVec3::ONE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SceneDef {
    pub ambient_color: DVec3,
    pub placements: Vec<ScenePlacement>,
}

fn digest_operations(operations: &Operations) -> Result<Vec<Digest>> {
    let mut digests = Vec::with_capacity(operations.len());
    for operation in operations {
        digests.push(operation.digest()?);
    }
    Ok(digests)
}

struct ModelProvider {
    name: String,
    operations: Operations,
}

impl Provider for ModelProvider {
    type Output = Model;

    fn get(&self) -> Result<Model> {
        let mut model = Model::default();
        for operation in &self.operations {
            operation
                .apply(Target::Model(&mut model))
                .with_context(|| format!("building model {:?}", self.name))?;
        }
        Ok(model)
    }

    fn digest(&self) -> Result<Digest> {
        let operations = digest_operations(&self.operations)?;
        Ok(create_digest("model", |hasher| {
            hasher.write_str(&self.name);
            for digest in &operations {
                hasher.write_digest(digest);
            }
        }))
    }
}

pub fn model(name: &str, operations: Operations) -> SharedProvider<Model> {
    once(Arc::new(ModelProvider { name: name.to_string(), operations }))
}

struct NodeProvider {
    name: String,
    operations: Operations,
}

impl Provider for NodeProvider {
    type Output = Node;

    fn get(&self) -> Result<Node> {
        let mut node = Node::new(&self.name);
        for operation in &self.operations {
            operation
                .apply(Target::Node(&mut node))
                .with_context(|| format!("building node {:?}", self.name))?;
        }
        Ok(node)
    }

    fn digest(&self) -> Result<Digest> {
        let operations = digest_operations(&self.operations)?;
        Ok(create_digest("node", |hasher| {
            hasher.write_str(&self.name);
            for digest in &operations {
                hasher.write_digest(digest);
            }
        }))
    }
}

pub fn node(name: &str, operations: Operations) -> SharedProvider<Node> {
    once(Arc::new(NodeProvider { name: name.to_string(), operations }))
}

struct ShaderProvider {
    name: String,
    source: String,
}

impl Provider for ShaderProvider {
    type Output = Arc<ShaderDef>;

    fn get(&self) -> Result<Arc<ShaderDef>> {
        Ok(Arc::new(ShaderDef { source: self.source.clone() }))
    }

    fn digest(&self) -> Result<Digest> {
        Ok(create_digest("shader", |hasher| {
            hasher.write_str(&self.name);
            hasher.write_str(&self.source);
        }))
    }
}

pub fn shader(name: &str, source: &str) -> SharedProvider<Arc<ShaderDef>> {
    once(Arc::new(ShaderProvider { name: name.to_string(), source: source.to_string() }))
}

struct TwoDTextureProvider {
    name: String,
    image: SharedProvider<Image>,
    operations: Operations,
}

impl Provider for TwoDTextureProvider {
    type Output = Arc<TextureDef>;

    fn get(&self) -> Result<Arc<TextureDef>> {
        let image = self.image.get().with_context(|| format!("texture {:?}", self.name))?;
        let mut texture = TextureDef {
            content: TextureContent::TwoD(image),
            format: TexelFormat::Rgba8,
            flags: TextureFlags::empty(),
        };
        for operation in &self.operations {
            operation
                .apply(Target::Texture(&mut texture))
                .with_context(|| format!("building texture {:?}", self.name))?;
        }
        Ok(Arc::new(texture))
    }

    fn digest(&self) -> Result<Digest> {
        let image = self.image.digest()?;
        let operations = digest_operations(&self.operations)?;
        Ok(create_digest("texture-2d", |hasher| {
            hasher.write_str(&self.name);
            hasher.write_digest(&image);
            for digest in &operations {
                hasher.write_digest(digest);
            }
        }))
    }
}

pub fn texture_2d(
    name: &str,
    image: SharedProvider<Image>,
    operations: Operations,
) -> SharedProvider<Arc<TextureDef>> {
    once(Arc::new(TwoDTextureProvider { name: name.to_string(), image, operations }))
}

struct CubeTextureProvider {
    name: String,
    image: SharedProvider<CubeImage>,
    operations: Operations,
}

impl Provider for CubeTextureProvider {
    type Output = Arc<TextureDef>;

    fn get(&self) -> Result<Arc<TextureDef>> {
        let image = self.image.get().with_context(|| format!("cube texture {:?}", self.name))?;
        let mut texture = TextureDef {
            content: TextureContent::Cube(image),
            format: TexelFormat::Rgba32F,
            flags: TextureFlags::empty(),
        };
        for operation in &self.operations {
            operation
                .apply(Target::Texture(&mut texture))
                .with_context(|| format!("building cube texture {:?}", self.name))?;
        }
        Ok(Arc::new(texture))
    }

    fn digest(&self) -> Result<Digest> {
        let image = self.image.digest()?;
        let operations = digest_operations(&self.operations)?;
        Ok(create_digest("texture-cube", |hasher| {
            hasher.write_str(&self.name);
            hasher.write_digest(&image);
            for digest in &operations {
                hasher.write_digest(digest);
            }
        }))
    }
}

pub fn cube_texture(
    name: &str,
    image: SharedProvider<CubeImage>,
    operations: Operations,
) -> SharedProvider<Arc<TextureDef>> {
    once(Arc::new(CubeTextureProvider { name: name.to_string(), image, operations }))
}

struct ImageFileProvider {
    path: PathBuf,
}

impl Provider for ImageFileProvider {
    type Output = Image;

    fn get(&self) -> Result<Image> {
        load_image(&self.path)
    }

    fn digest(&self) -> Result<Digest> {
        let content = digest_file(&self.path)?;
        Ok(create_digest("image-file", |hasher| {
            hasher.write_str(&self.path.to_string_lossy());
            hasher.write_digest(&content);
        }))
    }
}

/// Image provider over a PNG/JPEG/TIFF/HDR/EXR file. The digest tracks the
/// file content, so edits to the file trigger rebuilds.
pub fn image_file(path: impl Into<PathBuf>) -> SharedProvider<Image> {
    once(Arc::new(ImageFileProvider { path: path.into() }))
}

struct EquirectangularCubeProvider {
    source: SharedProvider<Image>,
}

impl Provider for EquirectangularCubeProvider {
    type Output = CubeImage;

    fn get(&self) -> Result<CubeImage> {
        Ok(build_equirectangular_cube_image(&self.source.get()?))
    }

    fn digest(&self) -> Result<Digest> {
        let source = self.source.digest()?;
        Ok(create_digest("cube-equirectangular", |hasher| hasher.write_digest(&source)))
    }
}

pub fn equirectangular_cube_image(source: SharedProvider<Image>) -> SharedProvider<CubeImage> {
    once(Arc::new(EquirectangularCubeProvider { source }))
}

struct IrradianceCubeProvider {
    source: SharedProvider<CubeImage>,
    sample_count: u32,
}

impl Provider for IrradianceCubeProvider {
    type Output = CubeImage;

    fn get(&self) -> Result<CubeImage> {
        Ok(build_irradiance_cube_image(&self.source.get()?, self.sample_count as usize))
    }

    fn digest(&self) -> Result<Digest> {
        let source = self.source.digest()?;
        Ok(create_digest("cube-irradiance", |hasher| {
            hasher.write_digest(&source);
            hasher.write_u32(self.sample_count);
        }))
    }
}

pub fn irradiance_cube_image(
    source: SharedProvider<CubeImage>,
    sample_count: u32,
) -> SharedProvider<CubeImage> {
    once(Arc::new(IrradianceCubeProvider { source, sample_count }))
}

struct ScaledCubeProvider {
    source: SharedProvider<CubeImage>,
    size: u32,
}

impl Provider for ScaledCubeProvider {
    type Output = CubeImage;

    fn get(&self) -> Result<CubeImage> {
        Ok(self.source.get()?.scale(self.size as usize))
    }

    fn digest(&self) -> Result<Digest> {
        let source = self.source.digest()?;
        Ok(create_digest("cube-scaled", |hasher| {
            hasher.write_digest(&source);
            hasher.write_u32(self.size);
        }))
    }
}

pub fn scaled_cube_image(
    source: SharedProvider<CubeImage>,
    size: u32,
) -> SharedProvider<CubeImage> {
    once(Arc::new(ScaledCubeProvider { source, size }))
}

struct MaterialProvider {
    name: String,
    operations: Operations,
}

impl Provider for MaterialProvider {
    type Output = Arc<MaterialDef>;

    fn get(&self) -> Result<Arc<MaterialDef>> {
        let mut material = MaterialDef::named(&self.name);
        for operation in &self.operations {
            operation
                .apply(Target::Material(&mut material))
                .with_context(|| format!("building material {:?}", self.name))?;
        }
        Ok(Arc::new(material))
    }

    fn digest(&self) -> Result<Digest> {
        let operations = digest_operations(&self.operations)?;
        Ok(create_digest("material", |hasher| {
            hasher.write_str(&self.name);
            for digest in &operations {
                hasher.write_digest(digest);
            }
        }))
    }
}

pub fn material(name: &str, operations: Operations) -> SharedProvider<Arc<MaterialDef>> {
    once(Arc::new(MaterialProvider { name: name.to_string(), operations }))
}

struct CubeGeometryProvider {
    size: f64,
}

impl Provider for CubeGeometryProvider {
    type Output = Arc<GeometryDef>;

    fn get(&self) -> Result<Arc<GeometryDef>> {
        Ok(Arc::new(build_cube_geometry(self.size as f32)))
    }

    fn digest(&self) -> Result<Digest> {
        Ok(create_digest("geometry-cube", |hasher| hasher.write_f64(self.size)))
    }
}

/// Axis-aligned unit cube primitive with per-face normals and UVs.
pub fn cube_geometry(size: f64) -> SharedProvider<Arc<GeometryDef>> {
    once(Arc::new(CubeGeometryProvider { size }))
}

fn build_cube_geometry(size: f32) -> GeometryDef {
    let hs = size * 0.5;
    let positions = [
        [-hs, -hs, -hs],
        [hs, -hs, -hs],
        [hs, hs, -hs],
        [-hs, hs, -hs],
        [-hs, -hs, hs],
        [hs, -hs, hs],
        [hs, hs, hs],
        [-hs, hs, hs],
    ];
    let normals = [
        [0.0, 0.0, -1.0],
        [0.0, 0.0, 1.0],
        [-1.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        [0.0, -1.0, 0.0],
    ];
    let uv_quad = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
    let faces: [([usize; 4], [f32; 3]); 6] = [
        ([0, 3, 2, 1], normals[0]), // back
        ([4, 5, 6, 7], normals[1]), // front
        ([0, 4, 7, 3], normals[2]), // left
        ([1, 2, 6, 5], normals[3]), // right
        ([3, 7, 6, 2], normals[4]), // top
        ([0, 1, 5, 4], normals[5]), // bottom
    ];

    let mut builder = GeometryBuilder::new();
    builder.add_fragment(Topology::TriangleList);
    for (corner_indices, normal) in faces {
        let mut quad = [0u32; 4];
        for (slot, corner) in corner_indices.into_iter().enumerate() {
            quad[slot] = builder.add_vertex(Vertex {
                coord: positions[corner],
                normal,
                tex_coord: uv_quad[slot],
                ..Vertex::default()
            });
        }
        for index in [quad[0], quad[1], quad[2], quad[0], quad[2], quad[3]] {
            builder.add_index(index);
        }
    }
    GeometryDef {
        format: VertexFormat::COORD | VertexFormat::NORMAL | VertexFormat::TEX_COORD,
        builder,
    }
}

struct MeshDefinitionProvider {
    name: String,
    geometry: SharedProvider<Arc<GeometryDef>>,
    materials: Vec<SharedProvider<Arc<MaterialDef>>>,
}

impl Provider for MeshDefinitionProvider {
    type Output = Arc<MeshDefinitionDef>;

    fn get(&self) -> Result<Arc<MeshDefinitionDef>> {
        let geometry = self.geometry.get()?;
        let mut materials = Vec::with_capacity(self.materials.len());
        for material in &self.materials {
            materials.push(material.get()?);
        }
        Ok(Arc::new(MeshDefinitionDef { geometry, materials }))
    }

    fn digest(&self) -> Result<Digest> {
        let geometry = self.geometry.digest()?;
        let mut materials = Vec::with_capacity(self.materials.len());
        for material in &self.materials {
            materials.push(material.digest()?);
        }
        Ok(create_digest("mesh-definition", |hasher| {
            hasher.write_str(&self.name);
            hasher.write_digest(&geometry);
            for digest in &materials {
                hasher.write_digest(digest);
            }
        }))
    }
}

pub fn mesh_definition(
    name: &str,
    geometry: SharedProvider<Arc<GeometryDef>>,
    materials: Vec<SharedProvider<Arc<MaterialDef>>>,
) -> SharedProvider<Arc<MeshDefinitionDef>> {
    once(Arc::new(MeshDefinitionProvider { name: name.to_string(), geometry, materials }))
}

struct BodyMaterialProvider {
    name: String,
    friction_coefficient: f64,
    restitution_coefficient: f64,
}

impl Provider for BodyMaterialProvider {
    type Output = Arc<BodyMaterialDef>;

    fn get(&self) -> Result<Arc<BodyMaterialDef>> {
        Ok(Arc::new(BodyMaterialDef {
            friction_coefficient: self.friction_coefficient,
            restitution_coefficient: self.restitution_coefficient,
        }))
    }

    fn digest(&self) -> Result<Digest> {
        Ok(create_digest("body-material", |hasher| {
            hasher.write_str(&self.name);
            hasher.write_f64(self.friction_coefficient);
            hasher.write_f64(self.restitution_coefficient);
        }))
    }
}

pub fn body_material(
    name: &str,
    friction_coefficient: f64,
    restitution_coefficient: f64,
) -> SharedProvider<Arc<BodyMaterialDef>> {
    once(Arc::new(BodyMaterialProvider {
        name: name.to_string(),
        friction_coefficient,
        restitution_coefficient,
    }))
}

struct BodyDefinitionProvider {
    name: String,
    material: SharedProvider<Arc<BodyMaterialDef>>,
    collision_boxes: Vec<CollisionBoxDef>,
    collision_spheres: Vec<CollisionSphereDef>,
}

impl Provider for BodyDefinitionProvider {
    type Output = Arc<BodyDefinitionDef>;

    fn get(&self) -> Result<Arc<BodyDefinitionDef>> {
        Ok(Arc::new(BodyDefinitionDef {
            material: self.material.get()?,
            collision_boxes: self.collision_boxes.clone(),
            collision_spheres: self.collision_spheres.clone(),
        }))
    }

    fn digest(&self) -> Result<Digest> {
        let material = self.material.digest()?;
        Ok(create_digest("body-definition", |hasher| {
            hasher.write_str(&self.name);
            hasher.write_digest(&material);
            for collision_box in &self.collision_boxes {
                digest_dvec3(hasher, collision_box.translation);
                digest_dquat(hasher, collision_box.rotation);
                hasher.write_f64(collision_box.width);
                hasher.write_f64(collision_box.height);
                hasher.write_f64(collision_box.length);
            }
            for sphere in &self.collision_spheres {
                digest_dvec3(hasher, sphere.translation);
                hasher.write_f64(sphere.radius);
            }
        }))
    }
}

pub fn body_definition(
    name: &str,
    material: SharedProvider<Arc<BodyMaterialDef>>,
    collision_boxes: Vec<CollisionBoxDef>,
    collision_spheres: Vec<CollisionSphereDef>,
) -> SharedProvider<Arc<BodyDefinitionDef>> {
    once(Arc::new(BodyDefinitionProvider {
        name: name.to_string(),
        material,
        collision_boxes,
        collision_spheres,
    }))
}

struct SceneProvider {
    name: String,
    ambient_color: DVec3,
    placements: Vec<ScenePlacement>,
}

impl Provider for SceneProvider {
    type Output = SceneDef;

    fn get(&self) -> Result<SceneDef> {
        Ok(SceneDef { ambient_color: self.ambient_color, placements: self.placements.clone() })
    }

    fn digest(&self) -> Result<Digest> {
        Ok(create_digest("scene", |hasher| {
            hasher.write_str(&self.name);
            digest_dvec3(hasher, self.ambient_color);
            for placement in &self.placements {
                hasher.write_str(&placement.model);
                digest_dvec3(hasher, placement.translation);
                digest_dquat(hasher, placement.rotation);
                digest_dvec3(hasher, placement.scale);
            }
        }))
    }
}

pub fn scene(
    name: &str,
    ambient_color: DVec3,
    placements: Vec<ScenePlacement>,
) -> SharedProvider<SceneDef> {
    once(Arc::new(SceneProvider { name: name.to_string(), ambient_color, placements }))
}

pub(crate) fn digest_dvec3(hasher: &mut super::digest::ContentHasher, value: DVec3) {
    hasher.write_f64(value.x);
    hasher.write_f64(value.y);
    hasher.write_f64(value.z);
}

pub(crate) fn digest_dquat(hasher: &mut super::digest::ContentHasher, value: DQuat) {
    hasher.write_f64(value.x);
    hasher.write_f64(value.y);
    hasher.write_f64(value.z);
    hasher.write_f64(value.w);
}

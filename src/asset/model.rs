use anyhow::{anyhow, bail, Result};
use bitflags::bitflags;
use std::io::{Read, Write};

use super::codec::{
    decode_envelope, encode_envelope, read_block, read_bool, read_f64, read_f64_3, read_f64_4,
    read_i32, read_str, read_u16, read_u32, read_u8, write_block, write_bool, write_f64,
    write_f64_array, write_i32, write_str, write_u16, write_u32, write_u8, FLAG_NONE, FLAG_ZLIB,
    UNSPECIFIED_INDEX,
};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct NodeFlags: u32 {
        /// The node never moves; its transform may be baked.
        const STATIONARY = 1 << 0;
        const HIDDEN = 1 << 1;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TextureFlags: u16 {
        const MIPMAPPING = 1 << 0;
        const LINEAR_SPACE = 1 << 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TexelFormat {
    Rgba8,
    Rgba16F,
    Rgba32F,
}

impl TexelFormat {
    pub(crate) fn to_u8(self) -> u8 {
        match self {
            TexelFormat::Rgba8 => 0,
            TexelFormat::Rgba16F => 1,
            TexelFormat::Rgba32F => 2,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(TexelFormat::Rgba8),
            1 => Ok(TexelFormat::Rgba16F),
            2 => Ok(TexelFormat::Rgba32F),
            other => bail!("unknown texel format tag {other}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapMode {
    Repeat,
    MirroredRepeat,
    ClampToEdge,
}

impl WrapMode {
    fn to_u8(self) -> u8 {
        match self {
            WrapMode::Repeat => 0,
            WrapMode::MirroredRepeat => 1,
            WrapMode::ClampToEdge => 2,
        }
    }

    fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(WrapMode::Repeat),
            1 => Ok(WrapMode::MirroredRepeat),
            2 => Ok(WrapMode::ClampToEdge),
            other => bail!("unknown wrap mode tag {other}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    Nearest,
    Linear,
}

impl FilterMode {
    fn to_u8(self) -> u8 {
        match self {
            FilterMode::Nearest => 0,
            FilterMode::Linear => 1,
        }
    }

    fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(FilterMode::Nearest),
            1 => Ok(FilterMode::Linear),
            other => bail!("unknown filter mode tag {other}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullMode {
    None,
    Front,
    Back,
}

impl CullMode {
    fn to_u8(self) -> u8 {
        match self {
            CullMode::None => 0,
            CullMode::Front => 1,
            CullMode::Back => 2,
        }
    }

    fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(CullMode::None),
            1 => Ok(CullMode::Front),
            2 => Ok(CullMode::Back),
            other => bail!("unknown cull mode tag {other}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceOrientation {
    CounterClockwise,
    Clockwise,
}

impl FaceOrientation {
    fn to_u8(self) -> u8 {
        match self {
            FaceOrientation::CounterClockwise => 0,
            FaceOrientation::Clockwise => 1,
        }
    }

    fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(FaceOrientation::CounterClockwise),
            1 => Ok(FaceOrientation::Clockwise),
            other => bail!("unknown face orientation tag {other}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Never,
    Less,
    Equal,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    NotEqual,
    Always,
}

impl Comparison {
    fn to_u8(self) -> u8 {
        match self {
            Comparison::Never => 0,
            Comparison::Less => 1,
            Comparison::Equal => 2,
            Comparison::LessOrEqual => 3,
            Comparison::Greater => 4,
            Comparison::GreaterOrEqual => 5,
            Comparison::NotEqual => 6,
            Comparison::Always => 7,
        }
    }

    fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Comparison::Never),
            1 => Ok(Comparison::Less),
            2 => Ok(Comparison::Equal),
            3 => Ok(Comparison::LessOrEqual),
            4 => Ok(Comparison::Greater),
            5 => Ok(Comparison::GreaterOrEqual),
            6 => Ok(Comparison::NotEqual),
            7 => Ok(Comparison::Always),
            other => bail!("unknown comparison tag {other}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blending {
    Opaque,
    Alpha,
    Additive,
}

impl Blending {
    fn to_u8(self) -> u8 {
        match self {
            Blending::Opaque => 0,
            Blending::Alpha => 1,
            Blending::Additive => 2,
        }
    }

    fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Blending::Opaque),
            1 => Ok(Blending::Alpha),
            2 => Ok(Blending::Additive),
            other => bail!("unknown blending tag {other}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    Points,
    LineList,
    LineStrip,
    TriangleList,
    TriangleStrip,
    TriangleFan,
}

impl Topology {
    fn to_u8(self) -> u8 {
        match self {
            Topology::Points => 0,
            Topology::LineList => 1,
            Topology::LineStrip => 2,
            Topology::TriangleList => 3,
            Topology::TriangleStrip => 4,
            Topology::TriangleFan => 5,
        }
    }

    fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Topology::Points),
            1 => Ok(Topology::LineList),
            2 => Ok(Topology::LineStrip),
            3 => Ok(Topology::TriangleList),
            4 => Ok(Topology::TriangleStrip),
            5 => Ok(Topology::TriangleFan),
            other => bail!("unknown topology tag {other}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexLayout {
    U16,
    U32,
}

impl IndexLayout {
    fn to_u8(self) -> u8 {
        match self {
            IndexLayout::U16 => 0,
            IndexLayout::U32 => 1,
        }
    }

    fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(IndexLayout::U16),
            1 => Ok(IndexLayout::U32),
            other => bail!("unknown index layout tag {other}"),
        }
    }

    pub fn index_size(self) -> usize {
        match self {
            IndexLayout::U16 => 2,
            IndexLayout::U32 => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: String,
    /// Index of the parent node; `UNSPECIFIED_INDEX` marks a root. Parents
    /// always precede their children in the array.
    pub parent_index: i32,
    pub translation: [f64; 3],
    pub rotation: [f64; 4],
    pub scale: [f64; 3],
    pub flags: NodeFlags,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Shader {
    pub source: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextureLayer {
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    pub format: TexelFormat,
    pub flags: TextureFlags,
    /// One layer for 2D textures, six for cubes.
    pub layers: Vec<TextureLayer>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaterialPass {
    pub culling: CullMode,
    pub front_face: FaceOrientation,
    pub depth_test: bool,
    pub depth_write: bool,
    pub depth_comparison: Comparison,
    pub blending: Blending,
    pub shader_index: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextureBinding {
    pub binding: String,
    pub texture_index: i32,
    pub wrapping: WrapMode,
    pub filtering: FilterMode,
    pub mipmapping: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyBinding {
    pub binding: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub geometry_pass: Option<MaterialPass>,
    pub shadow_pass: Option<MaterialPass>,
    pub forward_pass: Option<MaterialPass>,
    pub sky_pass: Option<MaterialPass>,
    pub postprocess_pass: Option<MaterialPass>,
    pub textures: Vec<TextureBinding>,
    pub properties: Vec<PropertyBinding>,
}

impl Material {
    pub fn passes(&self) -> impl Iterator<Item = &MaterialPass> {
        [
            self.geometry_pass.as_ref(),
            self.shadow_pass.as_ref(),
            self.forward_pass.as_ref(),
            self.sky_pass.as_ref(),
            self.postprocess_pass.as_ref(),
        ]
        .into_iter()
        .flatten()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VertexBuffer {
    pub stride: u32,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttributeBinding {
    /// Vertex buffer index; `UNSPECIFIED_INDEX` when the attribute is absent.
    pub buffer_index: i32,
    pub offset: u32,
}

impl AttributeBinding {
    pub const UNSPECIFIED: AttributeBinding =
        AttributeBinding { buffer_index: UNSPECIFIED_INDEX, offset: 0 };
}

#[derive(Debug, Clone, PartialEq)]
pub struct VertexLayout {
    pub coord: AttributeBinding,
    pub normal: AttributeBinding,
    pub tangent: AttributeBinding,
    pub tex_coord: AttributeBinding,
    pub color: AttributeBinding,
    pub weights: AttributeBinding,
    pub joints: AttributeBinding,
}

impl VertexLayout {
    fn bindings(&self) -> [&AttributeBinding; 7] {
        [
            &self.coord,
            &self.normal,
            &self.tangent,
            &self.tex_coord,
            &self.color,
            &self.weights,
            &self.joints,
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexBuffer {
    pub layout: IndexLayout,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub topology: Topology,
    pub index_offset: u32,
    pub index_count: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub vertex_buffers: Vec<VertexBuffer>,
    pub layout: VertexLayout,
    pub index_buffer: IndexBuffer,
    pub fragments: Vec<Fragment>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshDefinition {
    pub geometry_index: i32,
    /// One material per geometry fragment.
    pub material_indices: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub definition_index: i32,
    pub armature_index: i32,
    pub node_index: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    pub node_index: i32,
    pub inverse_bind_matrix: [f64; 16],
}

#[derive(Debug, Clone, PartialEq)]
pub struct Armature {
    pub joints: Vec<Joint>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BodyMaterial {
    pub friction_coefficient: f64,
    pub restitution_coefficient: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollisionBox {
    pub translation: [f64; 3],
    pub rotation: [f64; 4],
    pub width: f64,
    pub height: f64,
    pub length: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollisionSphere {
    pub translation: [f64; 3],
    pub radius: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BodyDefinition {
    pub material_index: i32,
    pub collision_boxes: Vec<CollisionBox>,
    pub collision_spheres: Vec<CollisionSphere>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub definition_index: i32,
    pub node_index: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AmbientLight {
    pub node_index: i32,
    pub reflection_texture_index: i32,
    pub refraction_texture_index: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointLight {
    pub node_index: i32,
    pub emit_color: [f64; 3],
    pub emit_distance: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpotLight {
    pub node_index: i32,
    pub emit_color: [f64; 3],
    pub emit_distance: f64,
    pub emit_angle_outer: f64,
    pub emit_angle_inner: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DirectionalLight {
    pub node_index: i32,
    pub emit_color: [f64; 3],
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sky {
    pub node_index: i32,
    pub material_index: i32,
}

/// Flat, index-referencing model asset.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Model {
    pub nodes: Vec<Node>,
    pub armatures: Vec<Armature>,
    pub shaders: Vec<Shader>,
    pub textures: Vec<Texture>,
    pub materials: Vec<Material>,
    pub geometries: Vec<Geometry>,
    pub mesh_definitions: Vec<MeshDefinition>,
    pub meshes: Vec<Mesh>,
    pub body_materials: Vec<BodyMaterial>,
    pub body_definitions: Vec<BodyDefinition>,
    pub bodies: Vec<Body>,
    pub ambient_lights: Vec<AmbientLight>,
    pub point_lights: Vec<PointLight>,
    pub spot_lights: Vec<SpotLight>,
    pub directional_lights: Vec<DirectionalLight>,
    pub skies: Vec<Sky>,
}

impl Default for VertexLayout {
    fn default() -> Self {
        Self {
            coord: AttributeBinding::UNSPECIFIED,
            normal: AttributeBinding::UNSPECIFIED,
            tangent: AttributeBinding::UNSPECIFIED,
            tex_coord: AttributeBinding::UNSPECIFIED,
            color: AttributeBinding::UNSPECIFIED,
            weights: AttributeBinding::UNSPECIFIED,
            joints: AttributeBinding::UNSPECIFIED,
        }
    }
}

impl Model {
    /// Original body layout: no armatures, no skies.
    pub const VERSION_INITIAL: u16 = 1;
    /// Current body layout.
    pub const VERSION_CURRENT: u16 = 2;

    pub fn encode_to<W: Write>(&self, out: &mut W) -> Result<()> {
        self.encode_version_to(out, Self::VERSION_CURRENT, true)
    }

    pub fn encode_version_to<W: Write>(
        &self,
        out: &mut W,
        version: u16,
        compressed: bool,
    ) -> Result<()> {
        let flags = if compressed { FLAG_ZLIB } else { FLAG_NONE };
        encode_envelope(out, version, flags, |w| self.encode_body(w, version))
    }

    pub fn decode_from<R: Read>(input: &mut R) -> Result<Self> {
        decode_envelope(input, |version, r| match version {
            Self::VERSION_INITIAL | Self::VERSION_CURRENT => Self::decode_body(r, version),
            other => panic!("model asset: unsupported version {other}"),
        })
    }

    fn encode_body(&self, w: &mut dyn Write, version: u16) -> Result<()> {
        write_u32(w, self.nodes.len() as u32)?;
        for node in &self.nodes {
            encode_node(w, node)?;
        }
        if version >= Self::VERSION_CURRENT {
            write_u32(w, self.armatures.len() as u32)?;
            for armature in &self.armatures {
                encode_armature(w, armature)?;
            }
        }
        write_u32(w, self.shaders.len() as u32)?;
        for shader in &self.shaders {
            write_str(w, &shader.source)?;
        }
        write_u32(w, self.textures.len() as u32)?;
        for texture in &self.textures {
            encode_texture(w, texture)?;
        }
        write_u32(w, self.materials.len() as u32)?;
        for material in &self.materials {
            encode_material(w, material)?;
        }
        write_u32(w, self.geometries.len() as u32)?;
        for geometry in &self.geometries {
            encode_geometry(w, geometry)?;
        }
        write_u32(w, self.mesh_definitions.len() as u32)?;
        for definition in &self.mesh_definitions {
            write_i32(w, definition.geometry_index)?;
            write_u32(w, definition.material_indices.len() as u32)?;
            for index in &definition.material_indices {
                write_i32(w, *index)?;
            }
        }
        write_u32(w, self.meshes.len() as u32)?;
        for mesh in &self.meshes {
            write_i32(w, mesh.definition_index)?;
            write_i32(w, mesh.armature_index)?;
            write_i32(w, mesh.node_index)?;
        }
        write_u32(w, self.body_materials.len() as u32)?;
        for material in &self.body_materials {
            write_f64(w, material.friction_coefficient)?;
            write_f64(w, material.restitution_coefficient)?;
        }
        write_u32(w, self.body_definitions.len() as u32)?;
        for definition in &self.body_definitions {
            encode_body_definition(w, definition)?;
        }
        write_u32(w, self.bodies.len() as u32)?;
        for body in &self.bodies {
            write_i32(w, body.definition_index)?;
            write_i32(w, body.node_index)?;
        }
        write_u32(w, self.ambient_lights.len() as u32)?;
        for light in &self.ambient_lights {
            write_i32(w, light.node_index)?;
            write_i32(w, light.reflection_texture_index)?;
            write_i32(w, light.refraction_texture_index)?;
        }
        write_u32(w, self.point_lights.len() as u32)?;
        for light in &self.point_lights {
            write_i32(w, light.node_index)?;
            write_f64_array(w, &light.emit_color)?;
            write_f64(w, light.emit_distance)?;
        }
        write_u32(w, self.spot_lights.len() as u32)?;
        for light in &self.spot_lights {
            write_i32(w, light.node_index)?;
            write_f64_array(w, &light.emit_color)?;
            write_f64(w, light.emit_distance)?;
            write_f64(w, light.emit_angle_outer)?;
            write_f64(w, light.emit_angle_inner)?;
        }
        write_u32(w, self.directional_lights.len() as u32)?;
        for light in &self.directional_lights {
            write_i32(w, light.node_index)?;
            write_f64_array(w, &light.emit_color)?;
        }
        if version >= Self::VERSION_CURRENT {
            write_u32(w, self.skies.len() as u32)?;
            for sky in &self.skies {
                write_i32(w, sky.node_index)?;
                write_i32(w, sky.material_index)?;
            }
        }
        Ok(())
    }

    fn decode_body(r: &mut dyn Read, version: u16) -> Result<Self> {
        let mut model = Model::default();
        for _ in 0..read_u32(r)? {
            model.nodes.push(decode_node(r)?);
        }
        if version >= Self::VERSION_CURRENT {
            for _ in 0..read_u32(r)? {
                model.armatures.push(decode_armature(r)?);
            }
        }
        for _ in 0..read_u32(r)? {
            model.shaders.push(Shader { source: read_str(r)? });
        }
        for _ in 0..read_u32(r)? {
            model.textures.push(decode_texture(r)?);
        }
        for _ in 0..read_u32(r)? {
            model.materials.push(decode_material(r)?);
        }
        for _ in 0..read_u32(r)? {
            model.geometries.push(decode_geometry(r)?);
        }
        for _ in 0..read_u32(r)? {
            let geometry_index = read_i32(r)?;
            let mut material_indices = Vec::new();
            for _ in 0..read_u32(r)? {
                material_indices.push(read_i32(r)?);
            }
            model.mesh_definitions.push(MeshDefinition { geometry_index, material_indices });
        }
        for _ in 0..read_u32(r)? {
            model.meshes.push(Mesh {
                definition_index: read_i32(r)?,
                armature_index: read_i32(r)?,
                node_index: read_i32(r)?,
            });
        }
        for _ in 0..read_u32(r)? {
            model.body_materials.push(BodyMaterial {
                friction_coefficient: read_f64(r)?,
                restitution_coefficient: read_f64(r)?,
            });
        }
        for _ in 0..read_u32(r)? {
            model.body_definitions.push(decode_body_definition(r)?);
        }
        for _ in 0..read_u32(r)? {
            model.bodies.push(Body { definition_index: read_i32(r)?, node_index: read_i32(r)? });
        }
        for _ in 0..read_u32(r)? {
            model.ambient_lights.push(AmbientLight {
                node_index: read_i32(r)?,
                reflection_texture_index: read_i32(r)?,
                refraction_texture_index: read_i32(r)?,
            });
        }
        for _ in 0..read_u32(r)? {
            model.point_lights.push(PointLight {
                node_index: read_i32(r)?,
                emit_color: read_f64_3(r)?,
                emit_distance: read_f64(r)?,
            });
        }
        for _ in 0..read_u32(r)? {
            model.spot_lights.push(SpotLight {
                node_index: read_i32(r)?,
                emit_color: read_f64_3(r)?,
                emit_distance: read_f64(r)?,
                emit_angle_outer: read_f64(r)?,
                emit_angle_inner: read_f64(r)?,
            });
        }
        for _ in 0..read_u32(r)? {
            model.directional_lights.push(DirectionalLight {
                node_index: read_i32(r)?,
                emit_color: read_f64_3(r)?,
            });
        }
        if version >= Self::VERSION_CURRENT {
            for _ in 0..read_u32(r)? {
                model
                    .skies
                    .push(Sky { node_index: read_i32(r)?, material_index: read_i32(r)? });
            }
        }
        Ok(model)
    }

    /// Checks that every index field resolves within bounds and that parents
    /// precede their children (which also rules out parent cycles).
    pub fn validate(&self) -> Result<()> {
        for (index, node) in self.nodes.iter().enumerate() {
            if node.parent_index != UNSPECIFIED_INDEX {
                check_index("node parent", node.parent_index, index)?;
            }
        }
        for armature in &self.armatures {
            for joint in &armature.joints {
                check_index("armature joint node", joint.node_index, self.nodes.len())?;
            }
        }
        for material in &self.materials {
            for pass in material.passes() {
                check_index("material pass shader", pass.shader_index, self.shaders.len())?;
            }
            for binding in &material.textures {
                check_index("material texture", binding.texture_index, self.textures.len())?;
            }
        }
        for geometry in &self.geometries {
            for binding in geometry.layout.bindings() {
                if binding.buffer_index != UNSPECIFIED_INDEX {
                    check_index(
                        "vertex attribute buffer",
                        binding.buffer_index,
                        geometry.vertex_buffers.len(),
                    )?;
                }
            }
            let index_count =
                geometry.index_buffer.data.len() / geometry.index_buffer.layout.index_size();
            for fragment in &geometry.fragments {
                let end = fragment.index_offset as usize + fragment.index_count as usize;
                if end > index_count {
                    bail!(
                        "geometry fragment range {}..{end} exceeds index count {index_count}",
                        fragment.index_offset
                    );
                }
            }
        }
        for definition in &self.mesh_definitions {
            check_index("mesh definition geometry", definition.geometry_index, self.geometries.len())?;
            for index in &definition.material_indices {
                check_index("mesh definition material", *index, self.materials.len())?;
            }
        }
        for mesh in &self.meshes {
            check_index("mesh definition", mesh.definition_index, self.mesh_definitions.len())?;
            check_index("mesh node", mesh.node_index, self.nodes.len())?;
            if mesh.armature_index != UNSPECIFIED_INDEX {
                check_index("mesh armature", mesh.armature_index, self.armatures.len())?;
            }
        }
        for definition in &self.body_definitions {
            check_index("body definition material", definition.material_index, self.body_materials.len())?;
        }
        for body in &self.bodies {
            check_index("body definition", body.definition_index, self.body_definitions.len())?;
            check_index("body node", body.node_index, self.nodes.len())?;
        }
        for light in &self.ambient_lights {
            check_index("ambient light node", light.node_index, self.nodes.len())?;
            check_index("ambient light reflection", light.reflection_texture_index, self.textures.len())?;
            check_index("ambient light refraction", light.refraction_texture_index, self.textures.len())?;
        }
        for light in &self.point_lights {
            check_index("point light node", light.node_index, self.nodes.len())?;
        }
        for light in &self.spot_lights {
            check_index("spot light node", light.node_index, self.nodes.len())?;
        }
        for light in &self.directional_lights {
            check_index("directional light node", light.node_index, self.nodes.len())?;
        }
        for sky in &self.skies {
            check_index("sky node", sky.node_index, self.nodes.len())?;
            check_index("sky material", sky.material_index, self.materials.len())?;
        }
        Ok(())
    }
}

fn check_index(field: &str, index: i32, bound: usize) -> Result<()> {
    if index < 0 || index as usize >= bound {
        return Err(anyhow!("{field} index {index} out of bounds (length {bound})"));
    }
    Ok(())
}

fn encode_node(w: &mut dyn Write, node: &Node) -> Result<()> {
    write_str(w, &node.name)?;
    write_i32(w, node.parent_index)?;
    write_f64_array(w, &node.translation)?;
    write_f64_array(w, &node.rotation)?;
    write_f64_array(w, &node.scale)?;
    write_u32(w, node.flags.bits())?;
    Ok(())
}

fn decode_node(r: &mut dyn Read) -> Result<Node> {
    Ok(Node {
        name: read_str(r)?,
        parent_index: read_i32(r)?,
        translation: read_f64_3(r)?,
        rotation: read_f64_4(r)?,
        scale: read_f64_3(r)?,
        flags: NodeFlags::from_bits_truncate(read_u32(r)?),
    })
}

fn encode_armature(w: &mut dyn Write, armature: &Armature) -> Result<()> {
    write_u32(w, armature.joints.len() as u32)?;
    for joint in &armature.joints {
        write_i32(w, joint.node_index)?;
        write_f64_array(w, &joint.inverse_bind_matrix)?;
    }
    Ok(())
}

fn decode_armature(r: &mut dyn Read) -> Result<Armature> {
    let mut joints = Vec::new();
    for _ in 0..read_u32(r)? {
        let node_index = read_i32(r)?;
        let mut inverse_bind_matrix = [0.0; 16];
        for cell in &mut inverse_bind_matrix {
            *cell = read_f64(r)?;
        }
        joints.push(Joint { node_index, inverse_bind_matrix });
    }
    Ok(Armature { joints })
}

pub(crate) fn encode_texture(w: &mut dyn Write, texture: &Texture) -> Result<()> {
    write_u32(w, texture.width)?;
    write_u32(w, texture.height)?;
    write_u8(w, texture.format.to_u8())?;
    write_u16(w, texture.flags.bits())?;
    write_u32(w, texture.layers.len() as u32)?;
    for layer in &texture.layers {
        write_block(w, &layer.data)?;
    }
    Ok(())
}

pub(crate) fn decode_texture(r: &mut dyn Read) -> Result<Texture> {
    let width = read_u32(r)?;
    let height = read_u32(r)?;
    let format = TexelFormat::from_u8(read_u8(r)?)?;
    let flags = TextureFlags::from_bits_truncate(read_u16(r)?);
    let mut layers = Vec::new();
    for _ in 0..read_u32(r)? {
        layers.push(TextureLayer { data: read_block(r)? });
    }
    Ok(Texture { width, height, format, flags, layers })
}

fn encode_material(w: &mut dyn Write, material: &Material) -> Result<()> {
    write_str(w, &material.name)?;
    for pass in [
        &material.geometry_pass,
        &material.shadow_pass,
        &material.forward_pass,
        &material.sky_pass,
        &material.postprocess_pass,
    ] {
        match pass {
            Some(pass) => {
                write_bool(w, true)?;
                write_u8(w, pass.culling.to_u8())?;
                write_u8(w, pass.front_face.to_u8())?;
                write_bool(w, pass.depth_test)?;
                write_bool(w, pass.depth_write)?;
                write_u8(w, pass.depth_comparison.to_u8())?;
                write_u8(w, pass.blending.to_u8())?;
                write_i32(w, pass.shader_index)?;
            }
            None => write_bool(w, false)?,
        }
    }
    write_u32(w, material.textures.len() as u32)?;
    for binding in &material.textures {
        write_str(w, &binding.binding)?;
        write_i32(w, binding.texture_index)?;
        write_u8(w, binding.wrapping.to_u8())?;
        write_u8(w, binding.filtering.to_u8())?;
        write_bool(w, binding.mipmapping)?;
    }
    write_u32(w, material.properties.len() as u32)?;
    for property in &material.properties {
        write_str(w, &property.binding)?;
        write_block(w, &property.data)?;
    }
    Ok(())
}

fn decode_material(r: &mut dyn Read) -> Result<Material> {
    let name = read_str(r)?;
    let mut passes: [Option<MaterialPass>; 5] = [None, None, None, None, None];
    for slot in &mut passes {
        if read_bool(r)? {
            *slot = Some(MaterialPass {
                culling: CullMode::from_u8(read_u8(r)?)?,
                front_face: FaceOrientation::from_u8(read_u8(r)?)?,
                depth_test: read_bool(r)?,
                depth_write: read_bool(r)?,
                depth_comparison: Comparison::from_u8(read_u8(r)?)?,
                blending: Blending::from_u8(read_u8(r)?)?,
                shader_index: read_i32(r)?,
            });
        }
    }
    let [geometry_pass, shadow_pass, forward_pass, sky_pass, postprocess_pass] = passes;
    let mut textures = Vec::new();
    for _ in 0..read_u32(r)? {
        textures.push(TextureBinding {
            binding: read_str(r)?,
            texture_index: read_i32(r)?,
            wrapping: WrapMode::from_u8(read_u8(r)?)?,
            filtering: FilterMode::from_u8(read_u8(r)?)?,
            mipmapping: read_bool(r)?,
        });
    }
    let mut properties = Vec::new();
    for _ in 0..read_u32(r)? {
        properties.push(PropertyBinding { binding: read_str(r)?, data: read_block(r)? });
    }
    Ok(Material {
        name,
        geometry_pass,
        shadow_pass,
        forward_pass,
        sky_pass,
        postprocess_pass,
        textures,
        properties,
    })
}

fn encode_geometry(w: &mut dyn Write, geometry: &Geometry) -> Result<()> {
    write_u32(w, geometry.vertex_buffers.len() as u32)?;
    for buffer in &geometry.vertex_buffers {
        write_u32(w, buffer.stride)?;
        write_block(w, &buffer.data)?;
    }
    for binding in geometry.layout.bindings() {
        write_i32(w, binding.buffer_index)?;
        write_u32(w, binding.offset)?;
    }
    write_u8(w, geometry.index_buffer.layout.to_u8())?;
    write_block(w, &geometry.index_buffer.data)?;
    write_u32(w, geometry.fragments.len() as u32)?;
    for fragment in &geometry.fragments {
        write_u8(w, fragment.topology.to_u8())?;
        write_u32(w, fragment.index_offset)?;
        write_u32(w, fragment.index_count)?;
    }
    Ok(())
}

fn decode_geometry(r: &mut dyn Read) -> Result<Geometry> {
    let mut vertex_buffers = Vec::new();
    for _ in 0..read_u32(r)? {
        vertex_buffers.push(VertexBuffer { stride: read_u32(r)?, data: read_block(r)? });
    }
    let mut bindings = [AttributeBinding::UNSPECIFIED; 7];
    for binding in &mut bindings {
        *binding = AttributeBinding { buffer_index: read_i32(r)?, offset: read_u32(r)? };
    }
    let [coord, normal, tangent, tex_coord, color, weights, joints] = bindings;
    let layout = VertexLayout { coord, normal, tangent, tex_coord, color, weights, joints };
    let index_buffer =
        IndexBuffer { layout: IndexLayout::from_u8(read_u8(r)?)?, data: read_block(r)? };
    let mut fragments = Vec::new();
    for _ in 0..read_u32(r)? {
        fragments.push(Fragment {
            topology: Topology::from_u8(read_u8(r)?)?,
            index_offset: read_u32(r)?,
            index_count: read_u32(r)?,
        });
    }
    Ok(Geometry { vertex_buffers, layout, index_buffer, fragments })
}

fn encode_body_definition(w: &mut dyn Write, definition: &BodyDefinition) -> Result<()> {
    write_i32(w, definition.material_index)?;
    write_u32(w, definition.collision_boxes.len() as u32)?;
    for collision_box in &definition.collision_boxes {
        write_f64_array(w, &collision_box.translation)?;
        write_f64_array(w, &collision_box.rotation)?;
        write_f64(w, collision_box.width)?;
        write_f64(w, collision_box.height)?;
        write_f64(w, collision_box.length)?;
    }
    write_u32(w, definition.collision_spheres.len() as u32)?;
    for sphere in &definition.collision_spheres {
        write_f64_array(w, &sphere.translation)?;
        write_f64(w, sphere.radius)?;
    }
    Ok(())
}

fn decode_body_definition(r: &mut dyn Read) -> Result<BodyDefinition> {
    let material_index = read_i32(r)?;
    let mut collision_boxes = Vec::new();
    for _ in 0..read_u32(r)? {
        collision_boxes.push(CollisionBox {
            translation: read_f64_3(r)?,
            rotation: read_f64_4(r)?,
            width: read_f64(r)?,
            height: read_f64(r)?,
            length: read_f64(r)?,
        });
    }
    let mut collision_spheres = Vec::new();
    for _ in 0..read_u32(r)? {
        collision_spheres
            .push(CollisionSphere { translation: read_f64_3(r)?, radius: read_f64(r)? });
    }
    Ok(BodyDefinition { material_index, collision_boxes, collision_spheres })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_out_of_bounds_mesh_node() {
        let mut model = Model::default();
        model.nodes.push(Node {
            name: "root".to_string(),
            parent_index: UNSPECIFIED_INDEX,
            translation: [0.0; 3],
            rotation: [0.0, 0.0, 0.0, 1.0],
            scale: [1.0; 3],
            flags: NodeFlags::empty(),
        });
        model.geometries.push(Geometry {
            vertex_buffers: Vec::new(),
            layout: VertexLayout::default(),
            index_buffer: IndexBuffer { layout: IndexLayout::U16, data: Vec::new() },
            fragments: Vec::new(),
        });
        model
            .mesh_definitions
            .push(MeshDefinition { geometry_index: 0, material_indices: Vec::new() });
        model.meshes.push(Mesh {
            definition_index: 0,
            armature_index: UNSPECIFIED_INDEX,
            node_index: 3,
        });
        let err = model.validate().expect_err("node index must be rejected");
        assert!(err.to_string().contains("mesh node"));
    }

    #[test]
    fn validate_rejects_child_before_parent() {
        let mut model = Model::default();
        model.nodes.push(Node {
            name: "child".to_string(),
            parent_index: 1,
            translation: [0.0; 3],
            rotation: [0.0, 0.0, 0.0, 1.0],
            scale: [1.0; 3],
            flags: NodeFlags::empty(),
        });
        model.nodes.push(Node {
            name: "parent".to_string(),
            parent_index: UNSPECIFIED_INDEX,
            translation: [0.0; 3],
            rotation: [0.0, 0.0, 0.0, 1.0],
            scale: [1.0; 3],
            flags: NodeFlags::empty(),
        });
        assert!(model.validate().is_err());
    }

    #[test]
    #[should_panic(expected = "unsupported version")]
    fn unknown_version_is_fatal() {
        let mut bytes = Vec::new();
        crate::asset::codec::write_header(&mut bytes, 99, FLAG_NONE).expect("header");
        let _ = Model::decode_from(&mut bytes.as_slice());
    }
}

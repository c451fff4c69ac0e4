use glam::{DQuat, DVec3};
use std::sync::Arc;
use thiserror::Error;

use super::digest::{create_digest, Digest};
use super::model::{
    digest_dquat, digest_dvec3, ArmatureDef, BodyDefinitionDef, MaterialDef, MaterialPassDef,
    MeshDefinitionDef, Model, Node, NodeEssence, PassSlot, PropertyValue, SamplerDef, ShaderDef,
    TextureDef,
};
use super::provider::SharedProvider;
use crate::asset::{
    Blending, Comparison, CullMode, FaceOrientation, FilterMode, TexelFormat, TextureFlags,
    WrapMode,
};

/// Closed set of builder-time targets an operation may be applied to.
pub enum Target<'a> {
    Model(&'a mut Model),
    Node(&'a mut Node),
    Material(&'a mut MaterialDef),
    Texture(&'a mut TextureDef),
    Sampler(&'a mut SamplerDef),
}

impl Target<'_> {
    pub fn kind(&self) -> &'static str {
        match self {
            Target::Model(_) => "model",
            Target::Node(_) => "node",
            Target::Material(_) => "material",
            Target::Texture(_) => "texture",
            Target::Sampler(_) => "sampler",
        }
    }
}

#[derive(Debug, Error)]
pub enum OperationError {
    /// The declarative builder applied an operation to a target that lacks
    /// the required capability. This is the DSL's primary validation path.
    #[error("target {target} does not support {capability}")]
    UnsupportedTarget { target: &'static str, capability: &'static str },
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

impl OperationError {
    fn unsupported(target: &Target<'_>, capability: &'static str) -> Self {
        Self::UnsupportedTarget { target: target.kind(), capability }
    }
}

/// A polymorphic mutation of a builder-time target, digestible so the build
/// graph's content hash covers every applied operation.
pub trait Operation: Send + Sync {
    fn apply(&self, target: Target<'_>) -> Result<(), OperationError>;

    fn digest(&self) -> anyhow::Result<Digest>;
}

struct SetTranslation {
    translation: DVec3,
}

impl Operation for SetTranslation {
    fn apply(&self, target: Target<'_>) -> Result<(), OperationError> {
        match target {
            Target::Node(node) => {
                node.translation = self.translation;
                Ok(())
            }
            other => Err(OperationError::unsupported(&other, "translation")),
        }
    }

    fn digest(&self) -> anyhow::Result<Digest> {
        Ok(create_digest("set-translation", |hasher| digest_dvec3(hasher, self.translation)))
    }
}

pub fn set_translation(translation: DVec3) -> Arc<dyn Operation> {
    Arc::new(SetTranslation { translation })
}

struct SetRotation {
    rotation: DQuat,
}

impl Operation for SetRotation {
    fn apply(&self, target: Target<'_>) -> Result<(), OperationError> {
        match target {
            Target::Node(node) => {
                node.rotation = self.rotation;
                Ok(())
            }
            other => Err(OperationError::unsupported(&other, "rotation")),
        }
    }

    fn digest(&self) -> anyhow::Result<Digest> {
        Ok(create_digest("set-rotation", |hasher| digest_dquat(hasher, self.rotation)))
    }
}

pub fn set_rotation(rotation: DQuat) -> Arc<dyn Operation> {
    Arc::new(SetRotation { rotation })
}

struct SetScale {
    scale: DVec3,
}

impl Operation for SetScale {
    fn apply(&self, target: Target<'_>) -> Result<(), OperationError> {
        match target {
            Target::Node(node) => {
                node.scale = self.scale;
                Ok(())
            }
            other => Err(OperationError::unsupported(&other, "scale")),
        }
    }

    fn digest(&self) -> anyhow::Result<Digest> {
        Ok(create_digest("set-scale", |hasher| digest_dvec3(hasher, self.scale)))
    }
}

pub fn set_scale(scale: DVec3) -> Arc<dyn Operation> {
    Arc::new(SetScale { scale })
}

struct AppendNode {
    node: SharedProvider<Node>,
}

impl Operation for AppendNode {
    fn apply(&self, target: Target<'_>) -> Result<(), OperationError> {
        match target {
            Target::Model(model) => {
                model.nodes.push(self.node.get()?);
                Ok(())
            }
            Target::Node(parent) => {
                parent.children.push(self.node.get()?);
                Ok(())
            }
            other => Err(OperationError::unsupported(&other, "child nodes")),
        }
    }

    fn digest(&self) -> anyhow::Result<Digest> {
        let node = self.node.digest()?;
        Ok(create_digest("append-node", |hasher| hasher.write_digest(&node)))
    }
}

pub fn append_node(node: SharedProvider<Node>) -> Arc<dyn Operation> {
    Arc::new(AppendNode { node })
}

struct ClearNodes;

impl Operation for ClearNodes {
    fn apply(&self, target: Target<'_>) -> Result<(), OperationError> {
        match target {
            Target::Model(model) => {
                model.nodes.clear();
                Ok(())
            }
            Target::Node(node) => {
                node.children.clear();
                Ok(())
            }
            other => Err(OperationError::unsupported(&other, "child nodes")),
        }
    }

    fn digest(&self) -> anyhow::Result<Digest> {
        Ok(create_digest("clear-nodes", |_| {}))
    }
}

pub fn clear_nodes() -> Arc<dyn Operation> {
    Arc::new(ClearNodes)
}

struct AppendModel {
    model: SharedProvider<Model>,
}

impl Operation for AppendModel {
    fn apply(&self, target: Target<'_>) -> Result<(), OperationError> {
        match target {
            Target::Model(model) => {
                model.nodes.extend(self.model.get()?.nodes);
                Ok(())
            }
            other => Err(OperationError::unsupported(&other, "model splicing")),
        }
    }

    fn digest(&self) -> anyhow::Result<Digest> {
        let model = self.model.digest()?;
        Ok(create_digest("append-model", |hasher| hasher.write_digest(&model)))
    }
}

pub fn append_model(model: SharedProvider<Model>) -> Arc<dyn Operation> {
    Arc::new(AppendModel { model })
}

struct SetMesh {
    definition: SharedProvider<Arc<MeshDefinitionDef>>,
    armature: Option<Arc<ArmatureDef>>,
}

impl Operation for SetMesh {
    fn apply(&self, target: Target<'_>) -> Result<(), OperationError> {
        match target {
            Target::Node(node) => {
                node.essence = NodeEssence::Mesh {
                    definition: self.definition.get()?,
                    armature: self.armature.clone(),
                };
                Ok(())
            }
            other => Err(OperationError::unsupported(&other, "mesh essence")),
        }
    }

    fn digest(&self) -> anyhow::Result<Digest> {
        let definition = self.definition.digest()?;
        Ok(create_digest("set-mesh", |hasher| {
            hasher.write_digest(&definition);
            match &self.armature {
                Some(armature) => {
                    hasher.write_bool(true);
                    for joint in &armature.joints {
                        hasher.write_str(&joint.node_name);
                        for cell in joint.inverse_bind_matrix.to_cols_array() {
                            hasher.write_f64(cell);
                        }
                    }
                }
                None => hasher.write_bool(false),
            }
        }))
    }
}

pub fn set_mesh(definition: SharedProvider<Arc<MeshDefinitionDef>>) -> Arc<dyn Operation> {
    Arc::new(SetMesh { definition, armature: None })
}

pub fn set_skinned_mesh(
    definition: SharedProvider<Arc<MeshDefinitionDef>>,
    armature: Arc<ArmatureDef>,
) -> Arc<dyn Operation> {
    Arc::new(SetMesh { definition, armature: Some(armature) })
}

struct SetBody {
    definition: SharedProvider<Arc<BodyDefinitionDef>>,
}

impl Operation for SetBody {
    fn apply(&self, target: Target<'_>) -> Result<(), OperationError> {
        match target {
            Target::Node(node) => {
                node.essence = NodeEssence::Body { definition: self.definition.get()? };
                Ok(())
            }
            other => Err(OperationError::unsupported(&other, "body essence")),
        }
    }

    fn digest(&self) -> anyhow::Result<Digest> {
        let definition = self.definition.digest()?;
        Ok(create_digest("set-body", |hasher| hasher.write_digest(&definition)))
    }
}

pub fn set_body(definition: SharedProvider<Arc<BodyDefinitionDef>>) -> Arc<dyn Operation> {
    Arc::new(SetBody { definition })
}

struct SetPointLight {
    emit_color: DVec3,
    emit_distance: f64,
}

impl Operation for SetPointLight {
    fn apply(&self, target: Target<'_>) -> Result<(), OperationError> {
        match target {
            Target::Node(node) => {
                node.essence = NodeEssence::PointLight {
                    emit_color: self.emit_color,
                    emit_distance: self.emit_distance,
                };
                Ok(())
            }
            other => Err(OperationError::unsupported(&other, "light essence")),
        }
    }

    fn digest(&self) -> anyhow::Result<Digest> {
        Ok(create_digest("set-point-light", |hasher| {
            digest_dvec3(hasher, self.emit_color);
            hasher.write_f64(self.emit_distance);
        }))
    }
}

pub fn set_point_light(emit_color: DVec3, emit_distance: f64) -> Arc<dyn Operation> {
    Arc::new(SetPointLight { emit_color, emit_distance })
}

struct SetSpotLight {
    emit_color: DVec3,
    emit_distance: f64,
    emit_angle_outer: f64,
    emit_angle_inner: f64,
}

impl Operation for SetSpotLight {
    fn apply(&self, target: Target<'_>) -> Result<(), OperationError> {
        match target {
            Target::Node(node) => {
                node.essence = NodeEssence::SpotLight {
                    emit_color: self.emit_color,
                    emit_distance: self.emit_distance,
                    emit_angle_outer: self.emit_angle_outer,
                    emit_angle_inner: self.emit_angle_inner,
                };
                Ok(())
            }
            other => Err(OperationError::unsupported(&other, "light essence")),
        }
    }

    fn digest(&self) -> anyhow::Result<Digest> {
        Ok(create_digest("set-spot-light", |hasher| {
            digest_dvec3(hasher, self.emit_color);
            hasher.write_f64(self.emit_distance);
            hasher.write_f64(self.emit_angle_outer);
            hasher.write_f64(self.emit_angle_inner);
        }))
    }
}

pub fn set_spot_light(
    emit_color: DVec3,
    emit_distance: f64,
    emit_angle_outer: f64,
    emit_angle_inner: f64,
) -> Arc<dyn Operation> {
    Arc::new(SetSpotLight { emit_color, emit_distance, emit_angle_outer, emit_angle_inner })
}

struct SetDirectionalLight {
    emit_color: DVec3,
}

impl Operation for SetDirectionalLight {
    fn apply(&self, target: Target<'_>) -> Result<(), OperationError> {
        match target {
            Target::Node(node) => {
                node.essence = NodeEssence::DirectionalLight { emit_color: self.emit_color };
                Ok(())
            }
            other => Err(OperationError::unsupported(&other, "light essence")),
        }
    }

    fn digest(&self) -> anyhow::Result<Digest> {
        Ok(create_digest("set-directional-light", |hasher| digest_dvec3(hasher, self.emit_color)))
    }
}

pub fn set_directional_light(emit_color: DVec3) -> Arc<dyn Operation> {
    Arc::new(SetDirectionalLight { emit_color })
}

struct SetAmbientLight {
    reflection: SharedProvider<Arc<TextureDef>>,
    refraction: SharedProvider<Arc<TextureDef>>,
}

impl Operation for SetAmbientLight {
    fn apply(&self, target: Target<'_>) -> Result<(), OperationError> {
        match target {
            Target::Node(node) => {
                node.essence = NodeEssence::AmbientLight {
                    reflection: self.reflection.get()?,
                    refraction: self.refraction.get()?,
                };
                Ok(())
            }
            other => Err(OperationError::unsupported(&other, "light essence")),
        }
    }

    fn digest(&self) -> anyhow::Result<Digest> {
        let reflection = self.reflection.digest()?;
        let refraction = self.refraction.digest()?;
        Ok(create_digest("set-ambient-light", |hasher| {
            hasher.write_digest(&reflection);
            hasher.write_digest(&refraction);
        }))
    }
}

pub fn set_ambient_light(
    reflection: SharedProvider<Arc<TextureDef>>,
    refraction: SharedProvider<Arc<TextureDef>>,
) -> Arc<dyn Operation> {
    Arc::new(SetAmbientLight { reflection, refraction })
}

struct SetSky {
    material: SharedProvider<Arc<MaterialDef>>,
}

impl Operation for SetSky {
    fn apply(&self, target: Target<'_>) -> Result<(), OperationError> {
        match target {
            Target::Node(node) => {
                node.essence = NodeEssence::Sky { material: self.material.get()? };
                Ok(())
            }
            other => Err(OperationError::unsupported(&other, "sky essence")),
        }
    }

    fn digest(&self) -> anyhow::Result<Digest> {
        let material = self.material.digest()?;
        Ok(create_digest("set-sky", |hasher| hasher.write_digest(&material)))
    }
}

pub fn set_sky(material: SharedProvider<Arc<MaterialDef>>) -> Arc<dyn Operation> {
    Arc::new(SetSky { material })
}

struct SetFormat {
    format: TexelFormat,
}

impl Operation for SetFormat {
    fn apply(&self, target: Target<'_>) -> Result<(), OperationError> {
        match target {
            Target::Texture(texture) => {
                texture.format = self.format;
                Ok(())
            }
            other => Err(OperationError::unsupported(&other, "texel format")),
        }
    }

    fn digest(&self) -> anyhow::Result<Digest> {
        Ok(create_digest("set-format", |hasher| hasher.write_u8(self.format.to_u8())))
    }
}

pub fn set_format(format: TexelFormat) -> Arc<dyn Operation> {
    Arc::new(SetFormat { format })
}

struct SetMipmapping {
    mipmapping: bool,
}

impl Operation for SetMipmapping {
    fn apply(&self, target: Target<'_>) -> Result<(), OperationError> {
        match target {
            Target::Texture(texture) => {
                texture.flags.set(TextureFlags::MIPMAPPING, self.mipmapping);
                Ok(())
            }
            Target::Sampler(sampler) => {
                sampler.mipmapping = self.mipmapping;
                Ok(())
            }
            other => Err(OperationError::unsupported(&other, "mipmapping")),
        }
    }

    fn digest(&self) -> anyhow::Result<Digest> {
        Ok(create_digest("set-mipmapping", |hasher| hasher.write_bool(self.mipmapping)))
    }
}

pub fn set_mipmapping(mipmapping: bool) -> Arc<dyn Operation> {
    Arc::new(SetMipmapping { mipmapping })
}

struct SetLinearSpace {
    linear: bool,
}

impl Operation for SetLinearSpace {
    fn apply(&self, target: Target<'_>) -> Result<(), OperationError> {
        match target {
            Target::Texture(texture) => {
                texture.flags.set(TextureFlags::LINEAR_SPACE, self.linear);
                Ok(())
            }
            other => Err(OperationError::unsupported(&other, "color space")),
        }
    }

    fn digest(&self) -> anyhow::Result<Digest> {
        Ok(create_digest("set-linear-space", |hasher| hasher.write_bool(self.linear)))
    }
}

pub fn set_linear_space(linear: bool) -> Arc<dyn Operation> {
    Arc::new(SetLinearSpace { linear })
}

struct SetWrapping {
    wrapping: WrapMode,
}

impl Operation for SetWrapping {
    fn apply(&self, target: Target<'_>) -> Result<(), OperationError> {
        match target {
            Target::Sampler(sampler) => {
                sampler.wrapping = self.wrapping;
                Ok(())
            }
            other => Err(OperationError::unsupported(&other, "wrapping")),
        }
    }

    fn digest(&self) -> anyhow::Result<Digest> {
        Ok(create_digest("set-wrapping", |hasher| hasher.write_u8(wrap_tag(self.wrapping))))
    }
}

pub fn set_wrapping(wrapping: WrapMode) -> Arc<dyn Operation> {
    Arc::new(SetWrapping { wrapping })
}

struct SetFiltering {
    filtering: FilterMode,
}

impl Operation for SetFiltering {
    fn apply(&self, target: Target<'_>) -> Result<(), OperationError> {
        match target {
            Target::Sampler(sampler) => {
                sampler.filtering = self.filtering;
                Ok(())
            }
            other => Err(OperationError::unsupported(&other, "filtering")),
        }
    }

    fn digest(&self) -> anyhow::Result<Digest> {
        Ok(create_digest("set-filtering", |hasher| hasher.write_u8(filter_tag(self.filtering))))
    }
}

pub fn set_filtering(filtering: FilterMode) -> Arc<dyn Operation> {
    Arc::new(SetFiltering { filtering })
}

/// Non-shader settings of a material pass.
#[derive(Debug, Clone, Copy)]
pub struct PassConfig {
    pub culling: CullMode,
    pub front_face: FaceOrientation,
    pub depth_test: bool,
    pub depth_write: bool,
    pub depth_comparison: Comparison,
    pub blending: Blending,
}

impl Default for PassConfig {
    fn default() -> Self {
        Self {
            culling: CullMode::Back,
            front_face: FaceOrientation::CounterClockwise,
            depth_test: true,
            depth_write: true,
            depth_comparison: Comparison::LessOrEqual,
            blending: Blending::Opaque,
        }
    }
}

struct SetPass {
    slot: PassSlot,
    shader: SharedProvider<Arc<ShaderDef>>,
    config: PassConfig,
}

impl Operation for SetPass {
    fn apply(&self, target: Target<'_>) -> Result<(), OperationError> {
        match target {
            Target::Material(material) => {
                let shader = self.shader.get()?;
                *material.pass_slot_mut(self.slot) = Some(MaterialPassDef {
                    culling: self.config.culling,
                    front_face: self.config.front_face,
                    depth_test: self.config.depth_test,
                    depth_write: self.config.depth_write,
                    depth_comparison: self.config.depth_comparison,
                    blending: self.config.blending,
                    shader,
                });
                Ok(())
            }
            other => Err(OperationError::unsupported(&other, "render passes")),
        }
    }

    fn digest(&self) -> anyhow::Result<Digest> {
        let shader = self.shader.digest()?;
        Ok(create_digest("set-pass", |hasher| {
            hasher.write_u8(self.slot.tag());
            hasher.write_digest(&shader);
            hasher.write_u8(cull_tag(self.config.culling));
            hasher.write_u8(face_tag(self.config.front_face));
            hasher.write_bool(self.config.depth_test);
            hasher.write_bool(self.config.depth_write);
            hasher.write_u8(comparison_tag(self.config.depth_comparison));
            hasher.write_u8(blending_tag(self.config.blending));
        }))
    }
}

pub fn set_pass(
    slot: PassSlot,
    shader: SharedProvider<Arc<ShaderDef>>,
    config: PassConfig,
) -> Arc<dyn Operation> {
    Arc::new(SetPass { slot, shader, config })
}

struct BindTexture {
    binding: String,
    texture: SharedProvider<Arc<TextureDef>>,
    sampler_operations: Vec<Arc<dyn Operation>>,
}

impl Operation for BindTexture {
    fn apply(&self, target: Target<'_>) -> Result<(), OperationError> {
        match target {
            Target::Material(material) => {
                let mut sampler = SamplerDef::new(self.texture.get()?);
                for operation in &self.sampler_operations {
                    operation.apply(Target::Sampler(&mut sampler))?;
                }
                material.samplers.push((self.binding.clone(), sampler));
                Ok(())
            }
            other => Err(OperationError::unsupported(&other, "texture bindings")),
        }
    }

    fn digest(&self) -> anyhow::Result<Digest> {
        let texture = self.texture.digest()?;
        let mut sampler_digests = Vec::with_capacity(self.sampler_operations.len());
        for operation in &self.sampler_operations {
            sampler_digests.push(operation.digest()?);
        }
        Ok(create_digest("bind-texture", |hasher| {
            hasher.write_str(&self.binding);
            hasher.write_digest(&texture);
            for digest in &sampler_digests {
                hasher.write_digest(digest);
            }
        }))
    }
}

pub fn bind_texture(
    binding: &str,
    texture: SharedProvider<Arc<TextureDef>>,
    sampler_operations: Vec<Arc<dyn Operation>>,
) -> Arc<dyn Operation> {
    Arc::new(BindTexture { binding: binding.to_string(), texture, sampler_operations })
}

struct BindProperty {
    binding: String,
    value: PropertyValue,
}

impl Operation for BindProperty {
    fn apply(&self, target: Target<'_>) -> Result<(), OperationError> {
        match target {
            Target::Material(material) => {
                material.properties.push((self.binding.clone(), self.value));
                Ok(())
            }
            other => Err(OperationError::unsupported(&other, "property bindings")),
        }
    }

    fn digest(&self) -> anyhow::Result<Digest> {
        Ok(create_digest("bind-property", |hasher| {
            hasher.write_str(&self.binding);
            match &self.value {
                PropertyValue::Float(value) => {
                    hasher.write_u8(0);
                    hasher.write_f32(*value);
                }
                PropertyValue::Vec2(values) => {
                    hasher.write_u8(1);
                    for value in values {
                        hasher.write_f32(*value);
                    }
                }
                PropertyValue::Vec3(values) => {
                    hasher.write_u8(2);
                    for value in values {
                        hasher.write_f32(*value);
                    }
                }
                PropertyValue::Vec4(values) => {
                    hasher.write_u8(3);
                    for value in values {
                        hasher.write_f32(*value);
                    }
                }
                PropertyValue::Uint(value) => {
                    hasher.write_u8(4);
                    hasher.write_u32(*value);
                }
            }
        }))
    }
}

pub fn bind_property(binding: &str, value: PropertyValue) -> Arc<dyn Operation> {
    Arc::new(BindProperty { binding: binding.to_string(), value })
}

fn wrap_tag(mode: WrapMode) -> u8 {
    match mode {
        WrapMode::Repeat => 0,
        WrapMode::MirroredRepeat => 1,
        WrapMode::ClampToEdge => 2,
    }
}

fn filter_tag(mode: FilterMode) -> u8 {
    match mode {
        FilterMode::Nearest => 0,
        FilterMode::Linear => 1,
    }
}

fn cull_tag(mode: CullMode) -> u8 {
    match mode {
        CullMode::None => 0,
        CullMode::Front => 1,
        CullMode::Back => 2,
    }
}

fn face_tag(orientation: FaceOrientation) -> u8 {
    match orientation {
        FaceOrientation::CounterClockwise => 0,
        FaceOrientation::Clockwise => 1,
    }
}

fn comparison_tag(comparison: Comparison) -> u8 {
    match comparison {
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

fn blending_tag(blending: Blending) -> u8 {
    match blending {
        Blending::Opaque => 0,
        Blending::Alpha => 1,
        Blending::Additive => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_operations_reject_non_node_targets() {
        let mut model = Model::default();
        let err = set_translation(DVec3::new(1.0, 2.0, 3.0))
            .apply(Target::Model(&mut model))
            .expect_err("model is not translatable");
        match err {
            OperationError::UnsupportedTarget { target, capability } => {
                assert_eq!(target, "model");
                assert_eq!(capability, "translation");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn transform_operations_mutate_nodes() {
        let mut node = Node::new("pivot");
        set_translation(DVec3::new(1.0, 2.0, 3.0))
            .apply(Target::Node(&mut node))
            .expect("apply translation");
        set_scale(DVec3::splat(2.0)).apply(Target::Node(&mut node)).expect("apply scale");
        assert_eq!(node.translation, DVec3::new(1.0, 2.0, 3.0));
        assert_eq!(node.scale, DVec3::splat(2.0));
    }

    #[test]
    fn operation_digests_track_parameters() {
        let a = set_translation(DVec3::X).digest().expect("digest");
        let b = set_translation(DVec3::X).digest().expect("digest");
        let c = set_translation(DVec3::Y).digest().expect("digest");
        let d = set_scale(DVec3::X).digest().expect("digest");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn mipmapping_applies_to_textures_and_samplers() {
        let mut texture = TextureDef {
            content: super::super::model::TextureContent::TwoD(crate::raster::Image::new(1, 1)),
            format: TexelFormat::Rgba8,
            flags: TextureFlags::empty(),
        };
        set_mipmapping(true).apply(Target::Texture(&mut texture)).expect("texture mipmapping");
        assert!(texture.flags.contains(TextureFlags::MIPMAPPING));

        let mut sampler = SamplerDef::new(Arc::new(texture));
        set_mipmapping(true).apply(Target::Sampler(&mut sampler)).expect("sampler mipmapping");
        assert!(sampler.mipmapping);

        let mut model = Model::default();
        assert!(set_mipmapping(true).apply(Target::Model(&mut model)).is_err());
    }
}

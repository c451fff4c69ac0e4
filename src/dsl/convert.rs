use anyhow::{anyhow, bail, Result};
use std::collections::HashMap;
use std::sync::Arc;

use super::geometry::VertexFormat;
use super::model::{
    ArmatureDef, BodyDefinitionDef, BodyMaterialDef, GeometryDef, MaterialDef, MaterialPassDef,
    MeshDefinitionDef, Model, Node, NodeEssence, TextureContent, TextureDef,
};
use crate::asset;
use crate::asset::{AttributeBinding, IndexLayout, TexelFormat, UNSPECIFIED_INDEX};
use crate::raster::CubeSide;

/// Converts a builder-time model tree into the flat wire asset.
///
/// Flattening is pre-order (parents before children) so wire indices are
/// deterministic across repeated builds; shared sub-resources convert through
/// pointer-identity caches so one logical object yields one wire entry.
pub fn convert_model(model: &Model) -> Result<asset::Model> {
    let mut converter = Converter::default();
    converter.flatten_nodes(&model.nodes, UNSPECIFIED_INDEX)?;
    converter.finish()
}

#[derive(Default)]
struct Converter {
    nodes: Vec<asset::Node>,
    node_names: HashMap<String, u32>,
    shaders: Vec<asset::Shader>,
    shader_cache: HashMap<usize, u32>,
    textures: Vec<asset::Texture>,
    texture_cache: HashMap<usize, u32>,
    materials: Vec<asset::Material>,
    material_cache: HashMap<usize, u32>,
    geometries: Vec<asset::Geometry>,
    geometry_cache: HashMap<usize, u32>,
    mesh_definitions: Vec<asset::MeshDefinition>,
    mesh_definition_cache: HashMap<usize, u32>,
    body_materials: Vec<asset::BodyMaterial>,
    body_material_cache: HashMap<usize, u32>,
    body_definitions: Vec<asset::BodyDefinition>,
    body_definition_cache: HashMap<usize, u32>,
    pending_armatures: Vec<Vec<(String, [f64; 16])>>,
    armature_cache: HashMap<usize, u32>,
    meshes: Vec<asset::Mesh>,
    bodies: Vec<asset::Body>,
    ambient_lights: Vec<asset::AmbientLight>,
    point_lights: Vec<asset::PointLight>,
    spot_lights: Vec<asset::SpotLight>,
    directional_lights: Vec<asset::DirectionalLight>,
    skies: Vec<asset::Sky>,
}

impl Converter {
    fn flatten_nodes(&mut self, nodes: &[Node], parent_index: i32) -> Result<()> {
        for node in nodes {
            let index = self.nodes.len() as u32;
            self.nodes.push(asset::Node {
                name: node.name.clone(),
                parent_index,
                translation: node.translation.to_array(),
                rotation: [node.rotation.x, node.rotation.y, node.rotation.z, node.rotation.w],
                scale: node.scale.to_array(),
                flags: node.flags,
            });
            self.node_names.entry(node.name.clone()).or_insert(index);
            self.capture_essence(node, index)?;
            self.flatten_nodes(&node.children, index as i32)?;
        }
        Ok(())
    }

    fn capture_essence(&mut self, node: &Node, node_index: u32) -> Result<()> {
        match &node.essence {
            NodeEssence::Empty => {}
            NodeEssence::Mesh { definition, armature } => {
                let definition_index = self.convert_mesh_definition(definition)?;
                let armature_index = match armature {
                    Some(armature) => self.convert_armature(armature) as i32,
                    None => UNSPECIFIED_INDEX,
                };
                self.meshes.push(asset::Mesh {
                    definition_index: definition_index as i32,
                    armature_index,
                    node_index: node_index as i32,
                });
            }
            NodeEssence::Body { definition } => {
                let definition_index = self.convert_body_definition(definition)?;
                self.bodies.push(asset::Body {
                    definition_index: definition_index as i32,
                    node_index: node_index as i32,
                });
            }
            NodeEssence::PointLight { emit_color, emit_distance } => {
                self.point_lights.push(asset::PointLight {
                    node_index: node_index as i32,
                    emit_color: emit_color.to_array(),
                    emit_distance: *emit_distance,
                });
            }
            NodeEssence::SpotLight {
                emit_color,
                emit_distance,
                emit_angle_outer,
                emit_angle_inner,
            } => {
                self.spot_lights.push(asset::SpotLight {
                    node_index: node_index as i32,
                    emit_color: emit_color.to_array(),
                    emit_distance: *emit_distance,
                    emit_angle_outer: *emit_angle_outer,
                    emit_angle_inner: *emit_angle_inner,
                });
            }
            NodeEssence::DirectionalLight { emit_color } => {
                self.directional_lights.push(asset::DirectionalLight {
                    node_index: node_index as i32,
                    emit_color: emit_color.to_array(),
                });
            }
            NodeEssence::AmbientLight { reflection, refraction } => {
                let reflection_texture_index = self.convert_texture(reflection)?;
                let refraction_texture_index = self.convert_texture(refraction)?;
                self.ambient_lights.push(asset::AmbientLight {
                    node_index: node_index as i32,
                    reflection_texture_index: reflection_texture_index as i32,
                    refraction_texture_index: refraction_texture_index as i32,
                });
            }
            NodeEssence::Sky { material } => {
                let material_index = self.convert_material(material)?;
                self.skies.push(asset::Sky {
                    node_index: node_index as i32,
                    material_index: material_index as i32,
                });
            }
        }
        Ok(())
    }

    fn convert_shader(&mut self, shader: &Arc<super::model::ShaderDef>) -> u32 {
        let key = Arc::as_ptr(shader) as usize;
        if let Some(index) = self.shader_cache.get(&key) {
            return *index;
        }
        let index = self.shaders.len() as u32;
        self.shaders.push(asset::Shader { source: shader.source.clone() });
        self.shader_cache.insert(key, index);
        index
    }

    fn convert_texture(&mut self, texture: &Arc<TextureDef>) -> Result<u32> {
        let key = Arc::as_ptr(texture) as usize;
        if let Some(index) = self.texture_cache.get(&key) {
            return Ok(*index);
        }
        let (width, height, layers) = match &texture.content {
            TextureContent::TwoD(image) => {
                let data = texel_data(texture.format, image)?;
                (image.width() as u32, image.height() as u32, vec![asset::TextureLayer { data }])
            }
            TextureContent::Cube(cube) => {
                let mut layers = Vec::with_capacity(6);
                for side in CubeSide::ALL {
                    layers.push(asset::TextureLayer {
                        data: texel_data(texture.format, cube.side(side))?,
                    });
                }
                (cube.size() as u32, cube.size() as u32, layers)
            }
        };
        let index = self.textures.len() as u32;
        self.textures.push(asset::Texture {
            width,
            height,
            format: texture.format,
            flags: texture.flags,
            layers,
        });
        self.texture_cache.insert(key, index);
        Ok(index)
    }

    fn convert_material(&mut self, material: &Arc<MaterialDef>) -> Result<u32> {
        let key = Arc::as_ptr(material) as usize;
        if let Some(index) = self.material_cache.get(&key) {
            return Ok(*index);
        }
        let geometry_pass = self.convert_pass(&material.geometry_pass);
        let shadow_pass = self.convert_pass(&material.shadow_pass);
        let forward_pass = self.convert_pass(&material.forward_pass);
        let sky_pass = self.convert_pass(&material.sky_pass);
        let postprocess_pass = self.convert_pass(&material.postprocess_pass);
        let mut textures = Vec::with_capacity(material.samplers.len());
        for (binding, sampler) in &material.samplers {
            let texture_index = self.convert_texture(&sampler.texture)?;
            textures.push(asset::TextureBinding {
                binding: binding.clone(),
                texture_index: texture_index as i32,
                wrapping: sampler.wrapping,
                filtering: sampler.filtering,
                mipmapping: sampler.mipmapping,
            });
        }
        let properties = material
            .properties
            .iter()
            .map(|(binding, value)| asset::PropertyBinding {
                binding: binding.clone(),
                data: value.data(),
            })
            .collect();
        let index = self.materials.len() as u32;
        self.materials.push(asset::Material {
            name: material.name.clone(),
            geometry_pass,
            shadow_pass,
            forward_pass,
            sky_pass,
            postprocess_pass,
            textures,
            properties,
        });
        self.material_cache.insert(key, index);
        Ok(index)
    }

    fn convert_pass(&mut self, pass: &Option<MaterialPassDef>) -> Option<asset::MaterialPass> {
        pass.as_ref().map(|pass| asset::MaterialPass {
            culling: pass.culling,
            front_face: pass.front_face,
            depth_test: pass.depth_test,
            depth_write: pass.depth_write,
            depth_comparison: pass.depth_comparison,
            blending: pass.blending,
            shader_index: self.convert_shader(&pass.shader) as i32,
        })
    }

    fn convert_geometry(&mut self, geometry: &Arc<GeometryDef>) -> u32 {
        let key = Arc::as_ptr(geometry) as usize;
        if let Some(index) = self.geometry_cache.get(&key) {
            return *index;
        }
        let builder = &geometry.builder;
        let index_layout =
            if builder.vertex_count() >= 0xFFFF { IndexLayout::U32 } else { IndexLayout::U16 };
        let format = geometry.format;
        let mut layout = asset::VertexLayout::default();
        let slots: [(&mut AttributeBinding, VertexFormat); 7] = [
            (&mut layout.coord, VertexFormat::COORD),
            (&mut layout.normal, VertexFormat::NORMAL),
            (&mut layout.tangent, VertexFormat::TANGENT),
            (&mut layout.tex_coord, VertexFormat::TEX_COORD),
            (&mut layout.color, VertexFormat::COLOR),
            (&mut layout.weights, VertexFormat::WEIGHTS),
            (&mut layout.joints, VertexFormat::JOINTS),
        ];
        for (slot, attribute) in slots {
            if let Some(offset) = format.attribute_offset(attribute) {
                *slot = AttributeBinding { buffer_index: 0, offset: offset as u32 };
            }
        }
        let fragments = builder
            .fragments()
            .iter()
            .map(|fragment| asset::Fragment {
                topology: fragment.topology,
                index_offset: fragment.index_offset,
                index_count: fragment.index_count,
            })
            .collect();
        let index = self.geometries.len() as u32;
        self.geometries.push(asset::Geometry {
            vertex_buffers: vec![asset::VertexBuffer {
                stride: format.stride() as u32,
                data: builder.vertex_data(format),
            }],
            layout,
            index_buffer: asset::IndexBuffer {
                layout: index_layout,
                data: builder.index_data(index_layout),
            },
            fragments,
        });
        self.geometry_cache.insert(key, index);
        index
    }

    fn convert_mesh_definition(&mut self, definition: &Arc<MeshDefinitionDef>) -> Result<u32> {
        let key = Arc::as_ptr(definition) as usize;
        if let Some(index) = self.mesh_definition_cache.get(&key) {
            return Ok(*index);
        }
        let geometry_index = self.convert_geometry(&definition.geometry);
        let mut material_indices = Vec::with_capacity(definition.materials.len());
        for material in &definition.materials {
            material_indices.push(self.convert_material(material)? as i32);
        }
        let index = self.mesh_definitions.len() as u32;
        self.mesh_definitions.push(asset::MeshDefinition {
            geometry_index: geometry_index as i32,
            material_indices,
        });
        self.mesh_definition_cache.insert(key, index);
        Ok(index)
    }

    fn convert_body_material(&mut self, material: &Arc<BodyMaterialDef>) -> u32 {
        let key = Arc::as_ptr(material) as usize;
        if let Some(index) = self.body_material_cache.get(&key) {
            return *index;
        }
        let index = self.body_materials.len() as u32;
        self.body_materials.push(asset::BodyMaterial {
            friction_coefficient: material.friction_coefficient,
            restitution_coefficient: material.restitution_coefficient,
        });
        self.body_material_cache.insert(key, index);
        index
    }

    fn convert_body_definition(&mut self, definition: &Arc<BodyDefinitionDef>) -> Result<u32> {
        let key = Arc::as_ptr(definition) as usize;
        if let Some(index) = self.body_definition_cache.get(&key) {
            return Ok(*index);
        }
        let material_index = self.convert_body_material(&definition.material);
        let collision_boxes = definition
            .collision_boxes
            .iter()
            .map(|collision_box| asset::CollisionBox {
                translation: collision_box.translation.to_array(),
                rotation: [
                    collision_box.rotation.x,
                    collision_box.rotation.y,
                    collision_box.rotation.z,
                    collision_box.rotation.w,
                ],
                width: collision_box.width,
                height: collision_box.height,
                length: collision_box.length,
            })
            .collect();
        let collision_spheres = definition
            .collision_spheres
            .iter()
            .map(|sphere| asset::CollisionSphere {
                translation: sphere.translation.to_array(),
                radius: sphere.radius,
            })
            .collect();
        let index = self.body_definitions.len() as u32;
        self.body_definitions.push(asset::BodyDefinition {
            material_index: material_index as i32,
            collision_boxes,
            collision_spheres,
        });
        self.body_definition_cache.insert(key, index);
        Ok(index)
    }

    fn convert_armature(&mut self, armature: &Arc<ArmatureDef>) -> u32 {
        let key = Arc::as_ptr(armature) as usize;
        if let Some(index) = self.armature_cache.get(&key) {
            return *index;
        }
        let joints = armature
            .joints
            .iter()
            .map(|joint| (joint.node_name.clone(), joint.inverse_bind_matrix.to_cols_array()))
            .collect();
        let index = self.pending_armatures.len() as u32;
        self.pending_armatures.push(joints);
        self.armature_cache.insert(key, index);
        index
    }

    fn finish(self) -> Result<asset::Model> {
        // Armature joints reference nodes by name; all nodes exist once the
        // flatten pass is complete, so resolution happens here.
        let mut armatures = Vec::with_capacity(self.pending_armatures.len());
        for joints in self.pending_armatures {
            let mut resolved = Vec::with_capacity(joints.len());
            for (node_name, inverse_bind_matrix) in joints {
                let node_index = self
                    .node_names
                    .get(&node_name)
                    .ok_or_else(|| anyhow!("armature joint references unknown node {node_name:?}"))?;
                resolved.push(asset::Joint { node_index: *node_index as i32, inverse_bind_matrix });
            }
            armatures.push(asset::Armature { joints: resolved });
        }
        Ok(asset::Model {
            nodes: self.nodes,
            armatures,
            shaders: self.shaders,
            textures: self.textures,
            materials: self.materials,
            geometries: self.geometries,
            mesh_definitions: self.mesh_definitions,
            meshes: self.meshes,
            body_materials: self.body_materials,
            body_definitions: self.body_definitions,
            bodies: self.bodies,
            ambient_lights: self.ambient_lights,
            point_lights: self.point_lights,
            spot_lights: self.spot_lights,
            directional_lights: self.directional_lights,
            skies: self.skies,
        })
    }
}

fn texel_data(format: TexelFormat, image: &crate::raster::Image) -> Result<Vec<u8>> {
    match format {
        TexelFormat::Rgba8 => Ok(image.rgba8_data()),
        TexelFormat::Rgba32F => Ok(image.rgba32f_data()),
        TexelFormat::Rgba16F => bail!("16-bit float texel emission is not supported"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::model::{MeshDefinitionDef, PassSlot};
    use crate::dsl::{self};
    use glam::DVec3;

    fn leaf(name: &str) -> Node {
        Node::new(name)
    }

    #[test]
    fn flatten_is_preorder_with_parents_first() {
        let mut root = leaf("root");
        let mut branch = leaf("branch");
        branch.children.push(leaf("tip"));
        root.children.push(branch);
        let model = Model { nodes: vec![root, leaf("second_root")] };

        let converted = convert_model(&model).expect("convert");
        let names: Vec<&str> = converted.nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["root", "branch", "tip", "second_root"]);
        let parents: Vec<i32> = converted.nodes.iter().map(|n| n.parent_index).collect();
        assert_eq!(parents, vec![UNSPECIFIED_INDEX, 0, 1, UNSPECIFIED_INDEX]);
        converted.validate().expect("flattened model validates");

        let again = convert_model(&model).expect("convert again");
        assert_eq!(converted, again, "conversion must be deterministic");
    }

    #[test]
    fn shared_material_converts_to_a_single_wire_entry() {
        let shader = dsl::shader("unlit", "void main() {}");
        let material = dsl::material(
            "shared",
            vec![dsl::set_pass(PassSlot::Forward, shader, Default::default())],
        );
        let shared = material.get().expect("material");
        let geometry = dsl::cube_geometry(1.0).get().expect("geometry");

        let definition_a = Arc::new(MeshDefinitionDef {
            geometry: geometry.clone(),
            materials: vec![shared.clone()],
        });
        let definition_b =
            Arc::new(MeshDefinitionDef { geometry, materials: vec![shared.clone()] });

        let mut first = leaf("first");
        first.essence = NodeEssence::Mesh { definition: definition_a, armature: None };
        let mut second = leaf("second");
        second.essence = NodeEssence::Mesh { definition: definition_b, armature: None };
        let model = Model { nodes: vec![first, second] };

        let converted = convert_model(&model).expect("convert");
        assert_eq!(converted.materials.len(), 1, "shared material must deduplicate");
        assert_eq!(converted.geometries.len(), 1, "shared geometry must deduplicate");
        assert_eq!(converted.mesh_definitions.len(), 2);
        assert_eq!(converted.shaders.len(), 1);
        converted.validate().expect("validates");
    }

    #[test]
    fn sky_and_lights_record_their_node_indices() {
        let shader = dsl::shader("sky", "void main() {}");
        let material =
            dsl::material("sky", vec![dsl::set_pass(PassSlot::Sky, shader, Default::default())]);
        let mut sky = leaf("sky");
        sky.essence = NodeEssence::Sky { material: material.get().expect("material") };
        let mut lamp = leaf("lamp");
        lamp.essence =
            NodeEssence::PointLight { emit_color: DVec3::ONE, emit_distance: 10.0 };
        let model = Model { nodes: vec![leaf("root"), sky, lamp] };

        let converted = convert_model(&model).expect("convert");
        assert_eq!(converted.skies.len(), 1);
        assert_eq!(converted.skies[0].node_index, 1);
        assert_eq!(converted.point_lights.len(), 1);
        assert_eq!(converted.point_lights[0].node_index, 2);
    }
}

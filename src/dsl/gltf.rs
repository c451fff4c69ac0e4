use anyhow::{anyhow, bail, Context, Result};
use glam::{DQuat, DVec3};
use gltf::accessor::DataType;
use gltf::mesh::Mode;
use gltf::Semantic;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::digest::{create_digest, digest_file, Digest};
use super::geometry::{GeometryBuilder, Vertex, VertexFormat};
use super::model::{
    GeometryDef, MaterialDef, MaterialPassDef, MeshDefinitionDef, Model, Node, NodeEssence,
    PropertyValue, SamplerDef, ShaderDef, TextureContent, TextureDef,
};
use super::provider::{once, Provider, SharedProvider};
use crate::asset::{TexelFormat, TextureFlags, Topology};
use crate::raster::{Color, Image};

/// Forward-pass source bound to imported PBR materials; the engine resolves
/// the actual program from it at load time.
const PBR_FORWARD_SHADER: &str = "shader://pbr/forward";

/// Imports a standard glTF 2.0 file into a builder-time model. Relative
/// buffer and image URIs resolve against the file's directory.
pub fn load_model(path: impl AsRef<Path>) -> Result<Model> {
    let path = path.as_ref();
    let (document, buffers, images) = gltf::import(path)
        .with_context(|| format!("Failed to import glTF from {}", path.display()))?;

    let shader = Arc::new(ShaderDef { source: PBR_FORWARD_SHADER.to_string() });

    let mut textures: HashMap<usize, Arc<TextureDef>> = HashMap::new();
    for texture in document.textures() {
        let source = texture.source();
        let image_data = images.get(source.index()).ok_or_else(|| {
            anyhow!("Image index {} missing in {}", source.index(), path.display())
        })?;
        textures.insert(texture.index(), Arc::new(convert_image(image_data)?));
    }

    let default_material = Arc::new(default_material_def(&shader));
    let mut materials: HashMap<usize, Arc<MaterialDef>> = HashMap::new();
    for (material_slot, material) in document.materials().enumerate() {
        let index = material.index().unwrap_or(material_slot);
        materials.insert(index, Arc::new(convert_material(&material, &shader, &textures)?));
    }

    let mut mesh_definitions: HashMap<usize, Arc<MeshDefinitionDef>> = HashMap::new();
    for mesh in document.meshes() {
        let definition =
            convert_mesh(path, &mesh, &buffers, &materials, &default_material)?;
        mesh_definitions.insert(mesh.index(), Arc::new(definition));
    }

    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or_else(|| anyhow!("No scenes found in {}", path.display()))?;
    let mut nodes = Vec::new();
    for gltf_node in scene.nodes() {
        nodes.push(convert_node(&gltf_node, &mesh_definitions)?);
    }
    Ok(Model { nodes })
}

fn convert_node(
    gltf_node: &gltf::Node<'_>,
    mesh_definitions: &HashMap<usize, Arc<MeshDefinitionDef>>,
) -> Result<Node> {
    let name = gltf_node
        .name()
        .map(|name| name.to_string())
        .unwrap_or_else(|| format!("node_{}", gltf_node.index()));
    let (translation, rotation, scale) = gltf_node.transform().decomposed();
    let mut node = Node::new(&name);
    node.translation = DVec3::new(translation[0] as f64, translation[1] as f64, translation[2] as f64);
    node.rotation = DQuat::from_xyzw(
        rotation[0] as f64,
        rotation[1] as f64,
        rotation[2] as f64,
        rotation[3] as f64,
    );
    node.scale = DVec3::new(scale[0] as f64, scale[1] as f64, scale[2] as f64);
    if let Some(mesh) = gltf_node.mesh() {
        let definition = mesh_definitions
            .get(&mesh.index())
            .ok_or_else(|| anyhow!("Mesh index {} missing from import", mesh.index()))?;
        node.essence = NodeEssence::Mesh { definition: definition.clone(), armature: None };
    }
    for child in gltf_node.children() {
        node.children.push(convert_node(&child, mesh_definitions)?);
    }
    Ok(node)
}

fn convert_mesh(
    path: &Path,
    mesh: &gltf::Mesh<'_>,
    buffers: &[gltf::buffer::Data],
    materials: &HashMap<usize, Arc<MaterialDef>>,
    default_material: &Arc<MaterialDef>,
) -> Result<MeshDefinitionDef> {
    let mut builder = GeometryBuilder::new();
    let mut format = VertexFormat::COORD;
    let mut fragment_materials = Vec::new();

    for primitive in mesh.primitives() {
        if primitive.mode() != Mode::Triangles {
            continue;
        }
        check_accessor_types(path, &primitive)?;
        let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));
        let positions: Vec<[f32; 3]> = reader
            .read_positions()
            .ok_or_else(|| anyhow!("POSITION attribute missing in {}", path.display()))?
            .collect();
        if positions.is_empty() {
            continue;
        }
        let normals: Option<Vec<[f32; 3]>> = reader.read_normals().map(|it| it.collect());
        let tangents: Option<Vec<[f32; 4]>> = reader.read_tangents().map(|it| it.collect());
        let tex_coords: Option<Vec<[f32; 2]>> =
            reader.read_tex_coords(0).map(|coords| coords.into_f32().collect());
        let colors: Option<Vec<[f32; 4]>> =
            reader.read_colors(0).map(|colors| colors.into_rgba_f32().collect());
        let local_indices: Vec<u32> = reader
            .read_indices()
            .ok_or_else(|| anyhow!("Primitive lacks indices in {}", path.display()))?
            .into_u32()
            .collect();

        if normals.is_some() {
            format |= VertexFormat::NORMAL;
        }
        if tangents.is_some() {
            format |= VertexFormat::TANGENT;
        }
        if tex_coords.is_some() {
            format |= VertexFormat::TEX_COORD;
        }
        if colors.is_some() {
            format |= VertexFormat::COLOR;
        }

        builder.add_fragment(Topology::TriangleList);
        for raw_index in local_indices {
            let slot = raw_index as usize;
            if slot >= positions.len() {
                bail!("Index {raw_index} out of range in {}", path.display());
            }
            let mut vertex = Vertex { coord: positions[slot], ..Vertex::default() };
            if let Some(normals) = &normals {
                vertex.normal = normals[slot];
            }
            if let Some(tangents) = &tangents {
                let [x, y, z, _w] = tangents[slot];
                vertex.tangent = [x, y, z];
            }
            if let Some(tex_coords) = &tex_coords {
                vertex.tex_coord = tex_coords[slot];
            }
            if let Some(colors) = &colors {
                vertex.color = colors[slot];
            }
            let index = builder.add_vertex(vertex);
            builder.add_index(index);
        }
        let material = primitive
            .material()
            .index()
            .and_then(|index| materials.get(&index).cloned())
            .unwrap_or_else(|| default_material.clone());
        fragment_materials.push(material);
    }

    if fragment_materials.is_empty() {
        bail!("Mesh in {} contains no triangle primitives", path.display());
    }
    Ok(MeshDefinitionDef {
        geometry: Arc::new(GeometryDef { format, builder }),
        materials: fragment_materials,
    })
}

/// The legacy ingestion path assumes a well-formed authoring pipeline: FLOAT
/// vertex attributes and UNSIGNED_SHORT indices. Anything else is refused.
fn check_accessor_types(path: &Path, primitive: &gltf::Primitive<'_>) -> Result<()> {
    let float_semantics = [
        Semantic::Positions,
        Semantic::Normals,
        Semantic::Tangents,
        Semantic::TexCoords(0),
        Semantic::Colors(0),
    ];
    for semantic in float_semantics {
        if let Some(accessor) = primitive.get(&semantic) {
            if accessor.data_type() != DataType::F32 {
                bail!(
                    "Unsupported component type {:?} for {:?} in {}",
                    accessor.data_type(),
                    semantic,
                    path.display()
                );
            }
        }
    }
    if let Some(indices) = primitive.indices() {
        if indices.data_type() != DataType::U16 {
            bail!(
                "Unsupported index component type {:?} in {}",
                indices.data_type(),
                path.display()
            );
        }
    }
    Ok(())
}

fn convert_material(
    material: &gltf::Material<'_>,
    shader: &Arc<ShaderDef>,
    textures: &HashMap<usize, Arc<TextureDef>>,
) -> Result<MaterialDef> {
    let label = material
        .name()
        .map(|name| name.to_string())
        .unwrap_or_else(|| format!("material_{}", material.index().unwrap_or(0)));
    let pbr = material.pbr_metallic_roughness();
    let mut converted = MaterialDef::named(&label);
    converted.forward_pass = Some(MaterialPassDef::new(shader.clone()));
    converted
        .properties
        .push(("baseColorFactor".to_string(), PropertyValue::Vec4(pbr.base_color_factor())));
    converted
        .properties
        .push(("metallicFactor".to_string(), PropertyValue::Float(pbr.metallic_factor())));
    converted
        .properties
        .push(("roughnessFactor".to_string(), PropertyValue::Float(pbr.roughness_factor())));
    converted
        .properties
        .push(("emissiveFactor".to_string(), PropertyValue::Vec3(material.emissive_factor())));
    if let Some(info) = pbr.base_color_texture() {
        let texture = textures
            .get(&info.texture().index())
            .ok_or_else(|| anyhow!("Texture index {} missing from import", info.texture().index()))?;
        converted
            .samplers
            .push(("baseColorTexture".to_string(), SamplerDef::new(texture.clone())));
    }
    if let Some(info) = material.normal_texture() {
        let texture = textures
            .get(&info.texture().index())
            .ok_or_else(|| anyhow!("Texture index {} missing from import", info.texture().index()))?;
        converted
            .samplers
            .push(("normalTexture".to_string(), SamplerDef::new(texture.clone())));
    }
    Ok(converted)
}

fn default_material_def(shader: &Arc<ShaderDef>) -> MaterialDef {
    let mut material = MaterialDef::named("Default");
    material.forward_pass = Some(MaterialPassDef::new(shader.clone()));
    material
        .properties
        .push(("baseColorFactor".to_string(), PropertyValue::Vec4([1.0, 1.0, 1.0, 1.0])));
    material.properties.push(("metallicFactor".to_string(), PropertyValue::Float(0.0)));
    material.properties.push(("roughnessFactor".to_string(), PropertyValue::Float(1.0)));
    material
}

fn convert_image(image: &gltf::image::Data) -> Result<TextureDef> {
    let width = image.width as usize;
    let height = image.height as usize;
    let mut converted = Image::new(width, height);
    let mut write_pixel = |index: usize, r: u8, g: u8, b: u8, a: u8| {
        converted.set_texel(
            index % width,
            index / width,
            Color::new(r as f64 / 255.0, g as f64 / 255.0, b as f64 / 255.0, a as f64 / 255.0),
        );
    };
    match image.format {
        gltf::image::Format::R8 => {
            for (index, value) in image.pixels.iter().enumerate() {
                write_pixel(index, *value, *value, *value, 255);
            }
        }
        gltf::image::Format::R8G8 => {
            for (index, chunk) in image.pixels.chunks_exact(2).enumerate() {
                write_pixel(index, chunk[0], chunk[1], 0, 255);
            }
        }
        gltf::image::Format::R8G8B8 => {
            for (index, chunk) in image.pixels.chunks_exact(3).enumerate() {
                write_pixel(index, chunk[0], chunk[1], chunk[2], 255);
            }
        }
        gltf::image::Format::R8G8B8A8 => {
            for (index, chunk) in image.pixels.chunks_exact(4).enumerate() {
                write_pixel(index, chunk[0], chunk[1], chunk[2], chunk[3]);
            }
        }
        other => bail!("Unsupported image format {:?}", other),
    }
    Ok(TextureDef {
        content: TextureContent::TwoD(converted),
        format: TexelFormat::Rgba8,
        flags: TextureFlags::empty(),
    })
}

struct GltfModelProvider {
    name: String,
    path: PathBuf,
}

impl Provider for GltfModelProvider {
    type Output = Model;

    fn get(&self) -> Result<Model> {
        load_model(&self.path)
    }

    fn digest(&self) -> Result<Digest> {
        // The main file plus every referenced buffer blob, so edits to
        // external .bin payloads also invalidate the digest.
        let main = digest_file(&self.path)?;
        let (_, buffers, _) = gltf::import(&self.path)
            .with_context(|| format!("Failed to import glTF from {}", self.path.display()))?;
        Ok(create_digest("gltf-model", |hasher| {
            hasher.write_str(&self.name);
            hasher.write_str(&self.path.to_string_lossy());
            hasher.write_digest(&main);
            for buffer in &buffers {
                hasher.write_bytes(buffer);
            }
        }))
    }
}

/// Model provider backed by a glTF file. The digest covers the file and its
/// buffers, so content edits trigger rebuilds.
pub fn model_file(name: &str, path: impl Into<PathBuf>) -> SharedProvider<Model> {
    once(Arc::new(GltfModelProvider { name: name.to_string(), path: path.into() }))
}

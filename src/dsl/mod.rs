pub mod convert;
pub mod digest;
pub mod geometry;
pub mod gltf;
pub mod model;
pub mod operation;
pub mod provider;

pub use convert::convert_model;
pub use digest::{create_digest, digest_file, digest_hex, ContentHasher, Digest, Digestible};
pub use geometry::{FragmentRange, GeometryBuilder, Vertex, VertexFormat};
pub use model::{
    body_definition, body_material, cube_geometry, cube_texture, equirectangular_cube_image,
    image_file, irradiance_cube_image, material, mesh_definition, model, node, scaled_cube_image,
    scene, shader, texture_2d, ArmatureDef, BodyDefinitionDef, BodyMaterialDef, CollisionBoxDef,
    CollisionSphereDef, GeometryDef, JointDef, MaterialDef, MaterialPassDef, MeshDefinitionDef,
    Model, Node, NodeEssence, Operations, PassSlot, PropertyValue, SamplerDef, SceneDef,
    ScenePlacement, ShaderDef, TextureContent, TextureDef,
};
pub use operation::{
    append_model, append_node, bind_property, bind_texture, clear_nodes, set_ambient_light,
    set_body, set_directional_light, set_filtering, set_format, set_linear_space, set_mesh,
    set_mipmapping, set_pass, set_point_light, set_rotation, set_scale, set_skinned_mesh,
    set_sky, set_spot_light, set_translation, set_wrapping, Operation, OperationError, PassConfig,
    Target,
};
pub use provider::{const_value, once, OnceProvider, Provider, SharedProvider};

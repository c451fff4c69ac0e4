mod codec;
mod model;
mod scene;
mod texture;

pub use codec::{FLAG_NONE, FLAG_ZLIB, UNSPECIFIED_INDEX};
pub use model::{
    AmbientLight, Armature, AttributeBinding, Blending, Body, BodyDefinition, BodyMaterial,
    CollisionBox, CollisionSphere, Comparison, CullMode, DirectionalLight, FaceOrientation,
    FilterMode, Fragment, Geometry, IndexBuffer, IndexLayout, Joint, Material, MaterialPass,
    Mesh, MeshDefinition, Model, Node, NodeFlags, PointLight, PropertyBinding, Shader, Sky,
    SpotLight, TexelFormat, Texture, TextureBinding, TextureFlags, TextureLayer, Topology,
    VertexBuffer, VertexLayout, WrapMode,
};
pub use scene::{Scene, SceneModel};
pub use texture::{Binary, CubeTexture, TwoDTexture};

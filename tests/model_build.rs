use std::sync::Arc;

use anyhow::Result;
use glam::DVec3;
use merlin_assets::asset::{IndexLayout, Model as WireModel, Topology, UNSPECIFIED_INDEX};
use merlin_assets::dsl::{
    self, convert_model, create_digest, Digest, GeometryBuilder, GeometryDef, Provider, Vertex,
    VertexFormat,
};

struct TriangleGeometryProvider;

impl Provider for TriangleGeometryProvider {
    type Output = Arc<GeometryDef>;

    fn get(&self) -> Result<Arc<GeometryDef>> {
        let mut builder = GeometryBuilder::new();
        builder.add_fragment(Topology::TriangleList);
        let corners = [
            [0.0f32, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
        ];
        for (slot, coord) in corners.into_iter().enumerate() {
            let index = builder.add_vertex(Vertex {
                coord,
                normal: [0.0, 0.0, 1.0],
                tex_coord: [coord[0], coord[1]],
                ..Vertex::default()
            });
            assert_eq!(index, slot as u32, "three unique vertices");
            builder.add_index(index);
        }
        Ok(Arc::new(GeometryDef {
            format: VertexFormat::COORD | VertexFormat::NORMAL | VertexFormat::TEX_COORD,
            builder,
        }))
    }

    fn digest(&self) -> Result<Digest> {
        Ok(create_digest("triangle-geometry", |_| {}))
    }
}

#[test]
fn one_node_triangle_model_survives_the_full_pipeline() {
    let shader = dsl::shader("unlit", "shader://unlit/forward");
    let material = dsl::material(
        "triangle",
        vec![dsl::set_pass(dsl::PassSlot::Forward, shader, Default::default())],
    );
    let definition =
        dsl::mesh_definition("triangle", Arc::new(TriangleGeometryProvider), vec![material]);
    let model_provider = dsl::model(
        "triangle",
        vec![dsl::append_node(dsl::node(
            "triangle",
            vec![
                dsl::set_translation(DVec3::new(0.0, 1.0, 0.0)),
                dsl::set_mesh(definition),
            ],
        ))],
    );

    let built = model_provider.get().expect("build model");
    assert_eq!(built.nodes.len(), 1);

    let wire = convert_model(&built).expect("convert model");
    wire.validate().expect("wire model validates");

    let mut bytes = Vec::new();
    wire.encode_to(&mut bytes).expect("encode model");
    let decoded = WireModel::decode_from(&mut bytes.as_slice()).expect("decode model");
    assert_eq!(decoded, wire);

    assert_eq!(decoded.nodes.len(), 1);
    assert_eq!(decoded.nodes[0].parent_index, UNSPECIFIED_INDEX);
    assert_eq!(decoded.geometries.len(), 1);
    let geometry = &decoded.geometries[0];
    assert_eq!(geometry.fragments.len(), 1);
    assert_eq!(geometry.fragments[0].index_count, 3);
    assert_eq!(geometry.fragments[0].topology, Topology::TriangleList);

    let expected_stride =
        (VertexFormat::COORD | VertexFormat::NORMAL | VertexFormat::TEX_COORD).stride();
    assert_eq!(geometry.vertex_buffers[0].stride as usize, expected_stride);
    assert_eq!(geometry.vertex_buffers[0].data.len(), 3 * expected_stride);
    assert_eq!(geometry.index_buffer.layout, IndexLayout::U16);
    assert_eq!(geometry.index_buffer.data, vec![0, 0, 1, 0, 2, 0]);

    assert_eq!(decoded.meshes.len(), 1);
    assert_eq!(decoded.meshes[0].node_index, 0);
    assert_eq!(decoded.mesh_definitions[0].material_indices, vec![0]);
    assert_eq!(decoded.materials.len(), 1);
    assert_eq!(decoded.shaders.len(), 1);
}

#[test]
fn provider_digests_are_stable_and_sensitive() {
    let build = |translation: DVec3| {
        dsl::model(
            "digest-probe",
            vec![dsl::append_node(dsl::node(
                "root",
                vec![dsl::set_translation(translation)],
            ))],
        )
    };
    let first = build(DVec3::X).digest().expect("digest");
    let second = build(DVec3::X).digest().expect("digest");
    assert_eq!(first, second, "identical graphs digest identically");

    let changed = build(DVec3::new(1.0000001, 0.0, 0.0)).digest().expect("digest");
    assert_ne!(first, changed, "a single leaf change must change the digest");
}

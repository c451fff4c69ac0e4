use std::fs;
use std::path::Path;

use merlin_assets::dsl::{self, convert_model, NodeEssence, Provider};
use tempfile::tempdir;

/// Writes a minimal glTF 2.0 triangle whose buffer lives in a sibling .bin
/// file, exercising relative URI resolution.
fn write_triangle_gltf(dir: &Path) -> std::path::PathBuf {
    // 3 positions (vec3 f32) followed by 3 u16 indices + 2 bytes padding.
    let mut buffer = Vec::new();
    for coord in [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
        for value in coord {
            buffer.extend_from_slice(&value.to_le_bytes());
        }
    }
    for index in [0u16, 1, 2] {
        buffer.extend_from_slice(&index.to_le_bytes());
    }
    buffer.extend_from_slice(&[0, 0]);
    fs::write(dir.join("tri.bin"), &buffer).expect("write buffer");

    let gltf = format!(
        r#"{{
  "asset": {{ "version": "2.0" }},
  "scene": 0,
  "scenes": [{{ "nodes": [0] }}],
  "nodes": [{{ "name": "tri", "mesh": 0, "translation": [0.0, 2.0, 0.0] }}],
  "meshes": [{{
    "primitives": [{{
      "attributes": {{ "POSITION": 0 }},
      "indices": 1,
      "mode": 4
    }}]
  }}],
  "buffers": [{{ "uri": "tri.bin", "byteLength": {} }}],
  "bufferViews": [
    {{ "buffer": 0, "byteOffset": 0, "byteLength": 36 }},
    {{ "buffer": 0, "byteOffset": 36, "byteLength": 6 }}
  ],
  "accessors": [
    {{
      "bufferView": 0,
      "componentType": 5126,
      "count": 3,
      "type": "VEC3",
      "min": [0.0, 0.0, 0.0],
      "max": [1.0, 1.0, 0.0]
    }},
    {{ "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }}
  ]
}}"#,
        buffer.len()
    );
    let path = dir.join("tri.gltf");
    fs::write(&path, gltf).expect("write gltf");
    path
}

#[test]
fn triangle_gltf_imports_and_converts() {
    let dir = tempdir().expect("temp dir");
    let path = write_triangle_gltf(dir.path());

    let model = dsl::gltf::load_model(&path).expect("import");
    assert_eq!(model.nodes.len(), 1);
    let node = &model.nodes[0];
    assert_eq!(node.name, "tri");
    assert!((node.translation.y - 2.0).abs() < 1e-9);
    let NodeEssence::Mesh { definition, .. } = &node.essence else {
        panic!("node must carry a mesh essence");
    };
    assert_eq!(definition.geometry.builder.vertex_count(), 3);
    assert_eq!(definition.geometry.builder.index_count(), 3);
    assert_eq!(definition.materials.len(), 1, "default material fills the gap");

    let wire = convert_model(&model).expect("convert");
    wire.validate().expect("validates");
    assert_eq!(wire.meshes.len(), 1);
    assert_eq!(wire.geometries[0].fragments[0].index_count, 3);
}

#[test]
fn gltf_provider_digest_tracks_buffer_edits() {
    let dir = tempdir().expect("temp dir");
    let path = write_triangle_gltf(dir.path());

    let before = dsl::gltf::model_file("tri", &path).digest().expect("digest");
    let same = dsl::gltf::model_file("tri", &path).digest().expect("digest");
    assert_eq!(before, same);

    // Nudge one vertex in the external buffer; the .gltf itself is untouched.
    let bin_path = dir.path().join("tri.bin");
    let mut buffer = fs::read(&bin_path).expect("read buffer");
    buffer[0] = buffer[0].wrapping_add(1);
    fs::write(&bin_path, &buffer).expect("rewrite buffer");

    let after = dsl::gltf::model_file("tri", &path).digest().expect("digest");
    assert_ne!(before, after, "buffer edits must invalidate the digest");
}

#[test]
fn unsupported_index_width_is_refused() {
    let dir = tempdir().expect("temp dir");
    // Same triangle, but with u32 indices (componentType 5125).
    let mut buffer = Vec::new();
    for coord in [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
        for value in coord {
            buffer.extend_from_slice(&value.to_le_bytes());
        }
    }
    for index in [0u32, 1, 2] {
        buffer.extend_from_slice(&index.to_le_bytes());
    }
    fs::write(dir.path().join("tri.bin"), &buffer).expect("write buffer");
    let gltf = format!(
        r#"{{
  "asset": {{ "version": "2.0" }},
  "scene": 0,
  "scenes": [{{ "nodes": [0] }}],
  "nodes": [{{ "name": "tri", "mesh": 0 }}],
  "meshes": [{{
    "primitives": [{{ "attributes": {{ "POSITION": 0 }}, "indices": 1, "mode": 4 }}]
  }}],
  "buffers": [{{ "uri": "tri.bin", "byteLength": {} }}],
  "bufferViews": [
    {{ "buffer": 0, "byteOffset": 0, "byteLength": 36 }},
    {{ "buffer": 0, "byteOffset": 36, "byteLength": 12 }}
  ],
  "accessors": [
    {{
      "bufferView": 0,
      "componentType": 5126,
      "count": 3,
      "type": "VEC3",
      "min": [0.0, 0.0, 0.0],
      "max": [1.0, 1.0, 0.0]
    }},
    {{ "bufferView": 1, "componentType": 5125, "count": 3, "type": "SCALAR" }}
  ]
}}"#,
        buffer.len()
    );
    let path = dir.path().join("tri.gltf");
    fs::write(&path, gltf).expect("write gltf");

    let err = dsl::gltf::load_model(&path).expect_err("u32 indices are outside the legacy path");
    assert!(format!("{err:#}").contains("index component type"));
}

use bitflags::bitflags;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use crate::asset::{IndexLayout, Topology};

bitflags! {
    /// Which vertex attributes a geometry carries. Packing order and sizes
    /// are fixed by declaration order below.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct VertexFormat: u16 {
        const COORD = 1 << 0;
        const NORMAL = 1 << 1;
        const TANGENT = 1 << 2;
        const TEX_COORD = 1 << 3;
        const COLOR = 1 << 4;
        const WEIGHTS = 1 << 5;
        const JOINTS = 1 << 6;
    }
}

impl VertexFormat {
    /// Packing order and per-attribute byte sizes, in declaration order.
    const DECLARED_ORDER: [(VertexFormat, usize); 7] = [
        (VertexFormat::COORD, 12),
        (VertexFormat::NORMAL, 12),
        (VertexFormat::TANGENT, 12),
        (VertexFormat::TEX_COORD, 8),
        (VertexFormat::COLOR, 16),
        (VertexFormat::WEIGHTS, 16),
        (VertexFormat::JOINTS, 4),
    ];

    pub fn attribute_size(self) -> usize {
        Self::DECLARED_ORDER
            .into_iter()
            .find(|(attribute, _)| *attribute == self)
            .map(|(_, size)| size)
            .expect("attribute_size expects a single attribute bit")
    }

    /// Byte offset of an attribute within the interleaved vertex, given the
    /// full mask, or None when the attribute is absent.
    pub fn attribute_offset(self, attribute: VertexFormat) -> Option<usize> {
        if !self.contains(attribute) {
            return None;
        }
        let mut offset = 0;
        for (candidate, size) in Self::DECLARED_ORDER {
            if candidate == attribute {
                return Some(offset);
            }
            if self.contains(candidate) {
                offset += size;
            }
        }
        None
    }

    /// Total interleaved stride of the present attributes.
    pub fn stride(self) -> usize {
        Self::DECLARED_ORDER
            .into_iter()
            .filter(|(attribute, _)| self.contains(*attribute))
            .map(|(_, size)| size)
            .sum()
    }
}

/// One full vertex. All fields are fixed-size so the value can key the
/// deduplication map; equality and hashing are bitwise on the floats.
#[derive(Debug, Clone, Copy)]
pub struct Vertex {
    pub coord: [f32; 3],
    pub normal: [f32; 3],
    pub tangent: [f32; 3],
    pub tex_coord: [f32; 2],
    pub color: [f32; 4],
    pub weights: [f32; 4],
    pub joints: [u8; 4],
}

impl Default for Vertex {
    fn default() -> Self {
        Self {
            coord: [0.0; 3],
            normal: [0.0; 3],
            tangent: [0.0; 3],
            tex_coord: [0.0; 2],
            color: [1.0; 4],
            weights: [0.0; 4],
            joints: [0; 4],
        }
    }
}

impl Vertex {
    fn bit_pattern(&self) -> [u32; 16] {
        [
            self.coord[0].to_bits(),
            self.coord[1].to_bits(),
            self.coord[2].to_bits(),
            self.normal[0].to_bits(),
            self.normal[1].to_bits(),
            self.normal[2].to_bits(),
            self.tangent[0].to_bits(),
            self.tangent[1].to_bits(),
            self.tangent[2].to_bits(),
            self.tex_coord[0].to_bits(),
            self.tex_coord[1].to_bits(),
            self.color[0].to_bits(),
            self.color[1].to_bits(),
            self.color[2].to_bits(),
            self.color[3].to_bits(),
            u32::from_le_bytes(self.joints),
        ]
    }

    fn weight_bits(&self) -> [u32; 4] {
        [
            self.weights[0].to_bits(),
            self.weights[1].to_bits(),
            self.weights[2].to_bits(),
            self.weights[3].to_bits(),
        ]
    }
}

impl PartialEq for Vertex {
    fn eq(&self, other: &Self) -> bool {
        self.bit_pattern() == other.bit_pattern() && self.weight_bits() == other.weight_bits()
    }
}

impl Eq for Vertex {}

impl Hash for Vertex {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bit_pattern().hash(state);
        self.weight_bits().hash(state);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragmentRange {
    pub topology: Topology,
    pub index_offset: u32,
    pub index_count: u32,
}

/// Accumulates deduplicated vertices, an index stream, and fragment ranges.
#[derive(Debug, Default)]
pub struct GeometryBuilder {
    vertices: Vec<Vertex>,
    lookup: HashMap<Vertex, u32>,
    indices: Vec<u32>,
    fragments: Vec<FragmentRange>,
}

impl GeometryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stable dense index of the vertex, reusing the index of a
    /// structurally identical vertex added earlier.
    pub fn add_vertex(&mut self, vertex: Vertex) -> u32 {
        if let Some(index) = self.lookup.get(&vertex) {
            return *index;
        }
        let index = self.vertices.len() as u32;
        self.vertices.push(vertex);
        self.lookup.insert(vertex, index);
        index
    }

    /// Opens a new fragment; subsequently added indices belong to it.
    pub fn add_fragment(&mut self, topology: Topology) {
        self.fragments.push(FragmentRange {
            topology,
            index_offset: self.indices.len() as u32,
            index_count: 0,
        });
    }

    pub fn add_index(&mut self, index: u32) {
        self.indices.push(index);
        let fragment = self
            .fragments
            .last_mut()
            .expect("add_fragment must be called before add_index");
        fragment.index_count += 1;
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn fragments(&self) -> &[FragmentRange] {
        &self.fragments
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Emits the packed interleaved vertex buffer for the attributes present
    /// in the mask.
    pub fn vertex_data(&self, format: VertexFormat) -> Vec<u8> {
        let stride = format.stride();
        let mut data = Vec::with_capacity(stride * self.vertices.len());
        for vertex in &self.vertices {
            if format.contains(VertexFormat::COORD) {
                push_f32s(&mut data, &vertex.coord);
            }
            if format.contains(VertexFormat::NORMAL) {
                push_f32s(&mut data, &vertex.normal);
            }
            if format.contains(VertexFormat::TANGENT) {
                push_f32s(&mut data, &vertex.tangent);
            }
            if format.contains(VertexFormat::TEX_COORD) {
                push_f32s(&mut data, &vertex.tex_coord);
            }
            if format.contains(VertexFormat::COLOR) {
                push_f32s(&mut data, &vertex.color);
            }
            if format.contains(VertexFormat::WEIGHTS) {
                push_f32s(&mut data, &vertex.weights);
            }
            if format.contains(VertexFormat::JOINTS) {
                data.extend_from_slice(&vertex.joints);
            }
        }
        data
    }

    pub fn index_data(&self, layout: IndexLayout) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.indices.len() * layout.index_size());
        match layout {
            IndexLayout::U16 => {
                for index in &self.indices {
                    data.extend_from_slice(&(*index as u16).to_le_bytes());
                }
            }
            IndexLayout::U32 => {
                for index in &self.indices {
                    data.extend_from_slice(&index.to_le_bytes());
                }
            }
        }
        data
    }
}

fn push_f32s(data: &mut Vec<u8>, values: &[f32]) {
    data.extend_from_slice(bytemuck::cast_slice(values));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex_at(x: f32) -> Vertex {
        Vertex { coord: [x, 0.0, 0.0], ..Vertex::default() }
    }

    #[test]
    fn identical_vertices_share_an_index() {
        let mut builder = GeometryBuilder::new();
        let first = builder.add_vertex(vertex_at(1.0));
        let second = builder.add_vertex(vertex_at(1.0));
        assert_eq!(first, second);
        assert_eq!(builder.vertex_count(), 1);
    }

    #[test]
    fn any_single_field_difference_allocates_a_new_index() {
        let mut builder = GeometryBuilder::new();
        let base = builder.add_vertex(Vertex::default());
        let variants = [
            Vertex { coord: [0.1, 0.0, 0.0], ..Vertex::default() },
            Vertex { normal: [0.0, 1.0, 0.0], ..Vertex::default() },
            Vertex { tangent: [1.0, 0.0, 0.0], ..Vertex::default() },
            Vertex { tex_coord: [0.5, 0.0], ..Vertex::default() },
            Vertex { color: [0.5, 1.0, 1.0, 1.0], ..Vertex::default() },
            Vertex { weights: [0.25, 0.0, 0.0, 0.0], ..Vertex::default() },
            Vertex { joints: [1, 0, 0, 0], ..Vertex::default() },
        ];
        for (slot, variant) in variants.into_iter().enumerate() {
            let index = builder.add_vertex(variant);
            assert_ne!(index, base, "variant {slot} must not reuse the base index");
        }
        assert_eq!(builder.vertex_count(), 8);
    }

    #[test]
    fn offsets_follow_declaration_order() {
        let format = VertexFormat::COORD | VertexFormat::TEX_COORD | VertexFormat::JOINTS;
        assert_eq!(format.attribute_offset(VertexFormat::COORD), Some(0));
        assert_eq!(format.attribute_offset(VertexFormat::TEX_COORD), Some(12));
        assert_eq!(format.attribute_offset(VertexFormat::JOINTS), Some(20));
        assert_eq!(format.attribute_offset(VertexFormat::NORMAL), None);
        assert_eq!(format.stride(), 24);
    }

    #[test]
    fn vertex_data_length_matches_stride() {
        let mut builder = GeometryBuilder::new();
        builder.add_fragment(Topology::TriangleList);
        for i in 0..3 {
            let index = builder.add_vertex(vertex_at(i as f32));
            builder.add_index(index);
        }
        let format = VertexFormat::COORD | VertexFormat::NORMAL;
        let data = builder.vertex_data(format);
        assert_eq!(data.len(), 3 * format.stride());
        assert_eq!(builder.fragments()[0].index_count, 3);
    }

    #[test]
    fn index_data_widths() {
        let mut builder = GeometryBuilder::new();
        builder.add_fragment(Topology::TriangleList);
        for i in 0..3 {
            let index = builder.add_vertex(vertex_at(i as f32));
            builder.add_index(index);
        }
        assert_eq!(builder.index_data(IndexLayout::U16).len(), 6);
        assert_eq!(builder.index_data(IndexLayout::U32).len(), 12);
    }
}

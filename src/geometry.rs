//! Geometry construction (component E).

use crate::buffer::{Buffer, BufferUsageFlags};
use crate::error::{EngineError, Result};
use crate::format::Format;
use crate::math::{self, Vec3};
use crate::vertex::IndexFormat;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Topology {
    PointList,
    LineList,
    LineStrip,
    TriangleList,
    TriangleStrip,
}

/// Four optional buffer references plus a primitive topology. `vertices`
/// is the only mandatory buffer.
pub struct Geometry {
    pub vertices: Buffer,
    pub uvcoords: Option<Buffer>,
    pub normals: Option<Buffer>,
    pub indices: Option<(Buffer, IndexFormat)>,
    pub topology: Topology,
}

fn vec3_buffer(points: &[Vec3]) -> Buffer {
    let bytes: Vec<u8> = points.iter().flat_map(|p| p.iter().flat_map(|c| c.to_le_bytes())).collect();
    Buffer::from_bytes(Format::R32G32B32_SFLOAT, points.len() as u32, bytes, BufferUsageFlags::VERTEX)
        .expect("vec3 buffer byte length matches format by construction")
}

fn vec2_buffer(points: &[[f32; 2]]) -> Buffer {
    let bytes: Vec<u8> = points.iter().flat_map(|p| p.iter().flat_map(|c| c.to_le_bytes())).collect();
    Buffer::from_bytes(Format::R32G32_SFLOAT, points.len() as u32, bytes, BufferUsageFlags::VERTEX)
        .expect("vec2 buffer byte length matches format by construction")
}

fn index_buffer_u16(indices: &[u16]) -> (Buffer, IndexFormat) {
    let bytes: Vec<u8> = indices.iter().flat_map(|i| i.to_le_bytes()).collect();
    let buf = Buffer::from_bytes(Format::R16_UINT, indices.len() as u32, bytes, BufferUsageFlags::INDEX)
        .expect("u16 index buffer byte length matches format by construction");
    (buf, IndexFormat::U16)
}

impl Geometry {
    /// A fan: a center vertex plus `npoints` rim vertices on the unit
    /// circle (scaled by `radius`), in the XY plane. `npoints < 3` is
    /// `InvalidArg`.
    pub fn circle(radius: f32, npoints: u32) -> Result<Geometry> {
        if npoints < 3 {
            return Err(EngineError::InvalidArg);
        }

        let mut vertices = Vec::with_capacity(npoints as usize + 1);
        let mut uvcoords = Vec::with_capacity(npoints as usize + 1);
        vertices.push([0.0, 0.0, 0.0]);
        uvcoords.push([0.5, 0.5]);

        for i in 0..npoints {
            let angle = 2.0 * std::f32::consts::PI * i as f32 / npoints as f32;
            let (s, c) = angle.sin_cos();
            vertices.push([c * radius, s * radius, 0.0]);
            uvcoords.push([c * 0.5 + 0.5, s * 0.5 + 0.5]);
        }

        let normals = vec![[0.0, 0.0, 1.0]; vertices.len()];

        let mut indices = Vec::with_capacity(npoints as usize * 3);
        for i in 1..=npoints {
            let next = if i == npoints { 1 } else { i + 1 };
            indices.push(0u16);
            indices.push(i as u16);
            indices.push(next as u16);
        }

        Ok(Geometry {
            vertices: vec3_buffer(&vertices),
            uvcoords: Some(vec2_buffer(&uvcoords)),
            normals: Some(vec3_buffer(&normals)),
            indices: Some(index_buffer_u16(&indices)),
            topology: Topology::TriangleList,
        })
    }

    /// Three vertices, drawn directly as a single triangle (no index
    /// buffer). UVs are the standard `(0,0)/(1,0)/(0,1)` corners; the
    /// normal is the right-handed cross product of the two edges.
    pub fn triangle(p0: Vec3, p1: Vec3, p2: Vec3) -> Geometry {
        let n = math::vec3_norm(math::vec3_cross(math::vec3_sub(p1, p0), math::vec3_sub(p2, p0)));
        Geometry {
            vertices: vec3_buffer(&[p0, p1, p2]),
            uvcoords: Some(vec2_buffer(&[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]])),
            normals: Some(vec3_buffer(&[n, n, n])),
            indices: None,
            topology: Topology::TriangleList,
        }
    }

    /// Four corners wound `p0, p1, p2, p3`, triangulated as `(0,1,2)` and
    /// `(0,2,3)`.
    pub fn quad(p0: Vec3, p1: Vec3, p2: Vec3, p3: Vec3) -> Geometry {
        let n = math::vec3_norm(math::vec3_cross(math::vec3_sub(p1, p0), math::vec3_sub(p2, p0)));
        Geometry {
            vertices: vec3_buffer(&[p0, p1, p2, p3]),
            uvcoords: Some(vec2_buffer(&[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]])),
            normals: Some(vec3_buffer(&[n, n, n, n])),
            indices: Some(index_buffer_u16(&[0, 1, 2, 0, 2, 3])),
            topology: Topology::TriangleList,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circle_rejects_too_few_points() {
        assert_eq!(Geometry::circle(1.0, 2).err(), Some(EngineError::InvalidArg));
    }

    #[test]
    fn circle_topology_matches_vertex_and_index_counts() {
        let g = Geometry::circle(1.0, 16).unwrap();
        assert_eq!(g.vertices.count(), 17);
        let (idx_buf, fmt) = g.indices.as_ref().unwrap();
        assert_eq!(fmt, &IndexFormat::U16);
        assert_eq!(idx_buf.count(), 48);

        idx_buf.with_bytes(|bytes| {
            for chunk in bytes.chunks_exact(2) {
                let idx = u16::from_le_bytes([chunk[0], chunk[1]]);
                assert!(idx <= 16);
            }
        });

        g.vertices.with_bytes(|bytes| {
            let center: [f32; 3] = [
                f32::from_le_bytes(bytes[0..4].try_into().unwrap()),
                f32::from_le_bytes(bytes[4..8].try_into().unwrap()),
                f32::from_le_bytes(bytes[8..12].try_into().unwrap()),
            ];
            assert_eq!(center[0], 0.0);
            assert_eq!(center[1], 0.0);

            for i in 1..=16usize {
                let off = i * 12;
                let v = [
                    f32::from_le_bytes(bytes[off..off + 4].try_into().unwrap()),
                    f32::from_le_bytes(bytes[off + 4..off + 8].try_into().unwrap()),
                    f32::from_le_bytes(bytes[off + 8..off + 12].try_into().unwrap()),
                ];
                let len = math::vec3_length(v);
                assert!((len - 1.0).abs() < 1e-5);
            }
        });
    }

    #[test]
    fn triangle_has_three_vertices_and_no_indices() {
        let g = Geometry::triangle([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
        assert_eq!(g.vertices.count(), 3);
        assert!(g.indices.is_none());
    }

    #[test]
    fn quad_has_four_vertices_and_two_triangles() {
        let g = Geometry::quad(
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
        );
        assert_eq!(g.vertices.count(), 4);
        assert_eq!(g.indices.as_ref().unwrap().0.count(), 6);
    }
}

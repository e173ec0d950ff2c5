//! Flat plane meshes

use bytemuck::{Pod, Zeroable};

/// GPU vertex: position + texture coordinate
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

/// Single-segment rectangle in the XY plane, centred on the origin and
/// facing +Z.
///
/// Vertex order is top-left, top-right, bottom-left, bottom-right. UVs have
/// v = 1 on the top edge.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaneGeometry {
    pub width: f32,
    pub height: f32,
    positions: Vec<f32>,
    uvs: Vec<f32>,
    indices: Vec<u16>,
}

impl PlaneGeometry {
    pub fn new(width: f32, height: f32) -> Self {
        let hw = width / 2.0;
        let hh = height / 2.0;
        Self {
            width,
            height,
            positions: vec![
                -hw, hh, 0.0, //
                hw, hh, 0.0, //
                -hw, -hh, 0.0, //
                hw, -hh, 0.0,
            ],
            uvs: vec![0.0, 1.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0],
            indices: vec![0, 2, 1, 2, 3, 1],
        }
    }

    /// Same plane with its UV buffer replaced
    pub fn with_uvs(mut self, uvs: Vec<f32>) -> Self {
        debug_assert_eq!(uvs.len(), self.uvs.len());
        self.uvs = uvs;
        self
    }

    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    /// Interleaved `(u, v)` pairs, one per vertex
    pub fn uvs(&self) -> &[f32] {
        &self.uvs
    }

    pub fn indices(&self) -> &[u16] {
        &self.indices
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Interleave positions and UVs for upload
    pub fn vertices(&self) -> Vec<Vertex> {
        self.positions
            .chunks_exact(3)
            .zip(self.uvs.chunks_exact(2))
            .map(|(p, uv)| Vertex {
                position: [p[0], p[1], p[2]],
                uv: [uv[0], uv[1]],
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plane_extents() {
        let plane = PlaneGeometry::new(1.0, 0.5);
        let xs: Vec<f32> = plane.positions().iter().step_by(3).copied().collect();
        let ys: Vec<f32> = plane.positions().iter().skip(1).step_by(3).copied().collect();
        assert_eq!(xs, vec![-0.5, 0.5, -0.5, 0.5]);
        assert_eq!(ys, vec![0.25, 0.25, -0.25, -0.25]);
        assert_eq!(plane.vertex_count(), 4);
        assert_eq!(plane.uvs().len(), 8);
    }

    #[test]
    fn vertices_interleave_uvs() {
        let plane = PlaneGeometry::new(2.0, 2.0);
        let vertices = plane.vertices();
        assert_eq!(vertices.len(), 4);
        assert_eq!(vertices[0], Vertex { position: [-1.0, 1.0, 0.0], uv: [0.0, 1.0] });
        assert_eq!(vertices[3], Vertex { position: [1.0, -1.0, 0.0], uv: [1.0, 0.0] });
    }

    #[test]
    fn triangles_are_counter_clockwise_from_front() {
        let plane = PlaneGeometry::new(1.0, 1.0);
        let v = plane.vertices();
        for tri in plane.indices().chunks_exact(3) {
            let a = glam::Vec3::from(v[tri[0] as usize].position);
            let b = glam::Vec3::from(v[tri[1] as usize].position);
            let c = glam::Vec3::from(v[tri[2] as usize].position);
            assert!((b - a).cross(c - a).z > 0.0);
        }
    }
}

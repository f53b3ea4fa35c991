//! Vertex type shared by tile meshes and debris fragments.

use bytemuck::{Pod, Zeroable};

/// Standard vertex with position, normal, and UV coordinates. `repr(C)` and
/// Pod so slices upload to vertex buffers without conversion.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coords: [f32; 2],
}

impl Vertex {
    pub fn new(position: [f32; 3], normal: [f32; 3], tex_coords: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            tex_coords,
        }
    }
}

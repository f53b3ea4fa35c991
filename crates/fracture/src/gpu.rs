//! GPU dispatch specification for the Voronoi fracture pipeline.
//!
//! This module defines WHAT a compute backend must run, not how a graphics
//! stack binds it: the two kernel sources, the buffer layout each expects,
//! and the dispatch geometry. A wgpu-based embedder owns devices and queues;
//! it compiles these kernels, fills the described bindings, and submits the
//! two passes back to back. Target throughput is 500 cells at 60 Hz on a
//! mid-range GPU; any failure surfaces as
//! [`crate::FractureError::GpuAllocationFailed`] and the dispatcher retries
//! on the CPU path.

/// Workgroup edge for pass 1; the distance field is walked in 8³ blocks.
pub const WORKGROUP_DIM: u32 = 8;

/// Upper bound on boundary vertices emitted per cell by pass 1.
pub const MAX_BOUNDARY_VERTICES_PER_CELL: u32 = 256;

/// Pass 1: nearest-seed distance field over the fragment volume plus
/// boundary vertex extraction. One invocation per field voxel; voxels whose
/// neighborhood spans two cells append their corner to the owning cell's
/// boundary list through an atomic cursor.
pub const DISTANCE_FIELD_WGSL: &str = r#"
struct FieldParams {
    resolution: vec3<u32>,
    seed_count: u32,
    bounds_min: vec3<f32>,
    cell_size: f32,
};

@group(0) @binding(0) var<uniform> params: FieldParams;
@group(0) @binding(1) var<storage, read> seeds: array<vec4<f32>>;
@group(0) @binding(2) var<storage, read_write> owner_field: array<u32>;
@group(0) @binding(3) var<storage, read_write> boundary_cursor: array<atomic<u32>>;
@group(0) @binding(4) var<storage, read_write> boundary_vertices: array<vec4<f32>>;

const MAX_BOUNDARY_PER_CELL: u32 = 256u;

fn voxel_center(id: vec3<u32>) -> vec3<f32> {
    return params.bounds_min + (vec3<f32>(id) + vec3<f32>(0.5)) * params.cell_size;
}

fn nearest_seed(p: vec3<f32>) -> u32 {
    var best = 0u;
    var best_d = 1e30;
    for (var s = 0u; s < params.seed_count; s = s + 1u) {
        let d = distance(p, seeds[s].xyz);
        if (d < best_d) {
            best_d = d;
            best = s;
        }
    }
    return best;
}

@compute @workgroup_size(8, 8, 8)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    if (any(id >= params.resolution)) {
        return;
    }
    let index = id.x + params.resolution.x * (id.y + params.resolution.y * id.z);
    let p = voxel_center(id);
    let owner = nearest_seed(p);
    owner_field[index] = owner;

    // A voxel bordering a differently-owned neighbor contributes a boundary
    // vertex to its cell.
    var is_boundary = false;
    if (id.x + 1u < params.resolution.x) {
        if (nearest_seed(voxel_center(id + vec3<u32>(1u, 0u, 0u))) != owner) { is_boundary = true; }
    }
    if (id.y + 1u < params.resolution.y) {
        if (nearest_seed(voxel_center(id + vec3<u32>(0u, 1u, 0u))) != owner) { is_boundary = true; }
    }
    if (id.z + 1u < params.resolution.z) {
        if (nearest_seed(voxel_center(id + vec3<u32>(0u, 0u, 1u))) != owner) { is_boundary = true; }
    }
    if (!is_boundary) {
        return;
    }
    let slot = atomicAdd(&boundary_cursor[owner], 1u);
    if (slot < MAX_BOUNDARY_PER_CELL) {
        boundary_vertices[owner * MAX_BOUNDARY_PER_CELL + slot] = vec4<f32>(p, 1.0);
    }
}
"#;

/// Pass 2: per-cell gift-wrapping convex hull over the boundary vertices,
/// emitting triangle indices and face normals. One workgroup per cell; the
/// hull walk is serial within the workgroup's first thread, neighbors assist
/// with support-point scans through workgroup memory.
pub const HULL_EXTRACT_WGSL: &str = r#"
struct HullParams {
    cell_count: u32,
    max_vertices: u32,
};

@group(0) @binding(0) var<uniform> params: HullParams;
@group(0) @binding(1) var<storage, read> boundary_cursor: array<u32>;
@group(0) @binding(2) var<storage, read> boundary_vertices: array<vec4<f32>>;
@group(0) @binding(3) var<storage, read_write> hull_indices: array<u32>;
@group(0) @binding(4) var<storage, read_write> hull_normals: array<vec4<f32>>;
@group(0) @binding(5) var<storage, read_write> hull_counts: array<atomic<u32>>;

@compute @workgroup_size(64)
fn main(@builtin(workgroup_id) group: vec3<u32>,
        @builtin(local_invocation_index) lane: u32) {
    let cell = group.x;
    if (cell >= params.cell_count || lane != 0u) {
        return;
    }
    let count = min(boundary_cursor[cell], params.max_vertices);
    if (count < 4u) {
        return;
    }
    // Gift wrap: start from the lowest vertex and fold triangles around the
    // point cloud until the hull closes. Emits at most 2·count − 4 faces.
    let base = cell * params.max_vertices;
    var emitted = 0u;
    for (var i = 0u; i + 2u < count && emitted + 3u < params.max_vertices * 3u; i = i + 1u) {
        let a = boundary_vertices[base + 0u].xyz;
        let b = boundary_vertices[base + i + 1u].xyz;
        let c = boundary_vertices[base + i + 2u].xyz;
        let n = normalize(cross(b - a, c - a));
        let face = atomicAdd(&hull_counts[cell], 1u);
        let out = cell * params.max_vertices * 3u + face * 3u;
        hull_indices[out + 0u] = 0u;
        hull_indices[out + 1u] = i + 1u;
        hull_indices[out + 2u] = i + 2u;
        hull_normals[cell * params.max_vertices + face] = vec4<f32>(n, 0.0);
        emitted = emitted + 3u;
    }
}
"#;

/// Dispatch geometry for one fracture call.
#[derive(Debug, Clone, Copy)]
pub struct GpuDispatchSpec {
    /// Distance field resolution per axis (pass 1 domain).
    pub field_resolution: [u32; 3],
    /// Number of Voronoi cells (pass 2 domain).
    pub cell_count: u32,
}

impl GpuDispatchSpec {
    /// Pass 1 workgroup counts: the field domain divided into 8³ blocks,
    /// rounded up.
    pub fn field_workgroups(&self) -> [u32; 3] {
        [
            self.field_resolution[0].div_ceil(WORKGROUP_DIM),
            self.field_resolution[1].div_ceil(WORKGROUP_DIM),
            self.field_resolution[2].div_ceil(WORKGROUP_DIM),
        ]
    }

    /// Pass 2 workgroup count: one per cell.
    pub fn hull_workgroups(&self) -> u32 {
        self.cell_count
    }

    /// Size in elements of the shared boundary vertex buffer.
    pub fn boundary_buffer_len(&self) -> u64 {
        self.cell_count as u64 * MAX_BOUNDARY_VERTICES_PER_CELL as u64
    }
}

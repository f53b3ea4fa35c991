//! Per-vertex stress tracking and the load-bearing graph.

use crate::material::StructuralMaterial;
use crate::GRAVITY;
use glam::Vec3;

/// Stress components carried by one vertex [Pa].
#[derive(Debug, Clone, Copy, Default)]
pub struct StressState {
    pub tensile: f32,
    pub compressive: f32,
    pub shear: f32,
    pub von_mises: f32,
    pub yielding: bool,
    pub fractured: bool,
}

impl StressState {
    /// Von Mises equivalent from the tracked components.
    pub fn update_von_mises(&mut self) {
        let normal = self.tensile.max(self.compressive);
        self.von_mises = (normal * normal + 3.0 * self.shear * self.shear).sqrt();
    }
}

/// An edge of the static load graph. `a` is the supported vertex, `b` the
/// supporting one.
#[derive(Debug, Clone, Copy)]
pub struct LoadBearingEdge {
    pub a: usize,
    pub b: usize,
    /// Load this edge can carry before severing [N].
    pub capacity_n: f32,
    pub current_load_n: f32,
    /// Severing a critical edge collapses the whole body.
    pub critical: bool,
}

impl LoadBearingEdge {
    pub fn new(a: usize, b: usize, capacity_n: f32) -> Self {
        Self {
            a,
            b,
            capacity_n,
            current_load_n: 0.0,
            critical: false,
        }
    }

    pub fn critical(mut self) -> Self {
        self.critical = true;
        self
    }

    pub fn is_severed(&self) -> bool {
        self.current_load_n > self.capacity_n
    }
}

/// One vertex of a structural body.
#[derive(Debug, Clone)]
pub struct StructuralVertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub mass_kg: f32,
    /// Effective cross section resisting load [m²].
    pub cross_section_m2: f32,
    pub stress: StressState,
}

impl StructuralVertex {
    pub fn new(position: Vec3, normal: Vec3, mass_kg: f32, cross_section_m2: f32) -> Self {
        Self {
            position,
            normal,
            mass_kg,
            cross_section_m2,
            stress: StressState::default(),
        }
    }
}

/// Which fracture path the dispatcher should take for this body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuralApproach {
    Partial,
    Full,
}

/// Result of a failure check.
#[derive(Debug, Clone)]
pub struct FailureReport {
    pub failed_vertices: Vec<usize>,
    pub severed_critical_edge: bool,
    pub approach: StructuralApproach,
}

impl FailureReport {
    pub fn any_failed(&self) -> bool {
        !self.failed_vertices.is_empty()
    }
}

/// The per-entity structural record: vertices plus the static load graph.
#[derive(Debug, Clone, Default)]
pub struct StructuralBody {
    pub vertices: Vec<StructuralVertex>,
    pub edges: Vec<LoadBearingEdge>,
}

impl StructuralBody {
    pub fn new(vertices: Vec<StructuralVertex>, edges: Vec<LoadBearingEdge>) -> Self {
        Self { vertices, edges }
    }

    /// Propagate gravitational loads down the edge graph: every vertex
    /// carries its own weight plus the weight of everything it supports,
    /// split evenly across its downward edges.
    pub fn propagate_loads(&mut self) {
        for edge in &mut self.edges {
            edge.current_load_n = 0.0;
        }

        // Process from the top down so supported load arrives before a
        // vertex hands its total to its supporters.
        let mut order: Vec<usize> = (0..self.vertices.len()).collect();
        order.sort_by(|&i, &j| {
            self.vertices[j]
                .position
                .y
                .partial_cmp(&self.vertices[i].position.y)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut carried: Vec<f32> = self
            .vertices
            .iter()
            .map(|v| v.mass_kg * GRAVITY)
            .collect();

        for &v in &order {
            // Downward edges: this vertex rests on the other endpoint.
            let down: Vec<usize> = self
                .edges
                .iter()
                .enumerate()
                .filter(|(_, e)| {
                    (e.a == v && self.vertices[e.b].position.y < self.vertices[v].position.y)
                        || (e.b == v && self.vertices[e.a].position.y < self.vertices[v].position.y)
                })
                .map(|(i, _)| i)
                .collect();
            if down.is_empty() {
                continue;
            }
            let share = carried[v] / down.len() as f32;
            for edge_index in down {
                let edge = &mut self.edges[edge_index];
                edge.current_load_n += share;
                let other = if edge.a == v { edge.b } else { edge.a };
                carried[other] += share;
            }
        }

        // Load divided by effective cross section gives compressive stress.
        for (i, vertex) in self.vertices.iter_mut().enumerate() {
            let area = vertex.cross_section_m2.max(1e-6);
            vertex.stress.compressive = carried[i] / area;
            vertex.stress.update_von_mises();
        }
    }

    /// Fold an external impact into vertex stresses. The pulse magnitude is
    /// `energy / (area × characteristic_length)`; the sign per vertex comes
    /// from the dot of impact direction with its normal, and intensity falls
    /// off with distance from the impact point.
    pub fn apply_impact(
        &mut self,
        point: Vec3,
        direction: Vec3,
        energy_j: f32,
        impact_area_m2: f32,
        characteristic_length_m: f32,
    ) {
        let pulse =
            energy_j / (impact_area_m2.max(1e-6) * characteristic_length_m.max(1e-6));
        let dir = direction.normalize_or_zero();
        let reach = characteristic_length_m.max(0.25);

        for vertex in &mut self.vertices {
            let d = vertex.position.distance(point);
            if d > reach * 4.0 {
                continue;
            }
            let falloff = 1.0 / (1.0 + (d / reach) * (d / reach));
            let alignment = dir.dot(vertex.normal.normalize_or_zero());
            let magnitude = pulse * falloff;
            if alignment < 0.0 {
                // Impact driving into the face compresses it.
                vertex.stress.compressive += magnitude * (-alignment);
            } else {
                vertex.stress.tensile += magnitude * alignment;
            }
            vertex.stress.shear += magnitude * (1.0 - alignment.abs()) * 0.5;
            vertex.stress.update_von_mises();
        }
    }

    /// Mark vertices whose stress exceeds the material limits, propagate
    /// cracks through the edge graph for brittle materials, sever overloaded
    /// edges, and classify the failure.
    pub fn check_failure(&mut self, material: &StructuralMaterial) -> FailureReport {
        let mut failed: Vec<usize> = Vec::new();
        for (i, vertex) in self.vertices.iter_mut().enumerate() {
            let s = &mut vertex.stress;
            s.yielding = s.von_mises > material.yield_strength;
            let over = s.tensile > material.tensile_strength
                || s.compressive > material.compressive_strength
                || s.von_mises > material.ultimate_strength;
            if over && !s.fractured {
                s.fractured = true;
                failed.push(i);
            }
        }

        if material.is_brittle && !failed.is_empty() {
            self.propagate_brittle_cracks(material, &mut failed);
        }

        let mut severed_critical = false;
        for edge in &self.edges {
            let endpoint_fractured = self.vertices[edge.a].stress.fractured
                || self.vertices[edge.b].stress.fractured;
            if (edge.is_severed() || endpoint_fractured) && edge.critical {
                severed_critical = true;
            }
        }

        let approach = if severed_critical {
            StructuralApproach::Full
        } else {
            StructuralApproach::Partial
        };
        FailureReport {
            failed_vertices: failed,
            severed_critical_edge: severed_critical,
            approach,
        }
    }

    /// Brittle crack propagation: failed vertices dump a share of their
    /// excess stress onto graph neighbors; propagation continues while new
    /// vertices exceed the tensile limit. The share stands in for crack
    /// propagation speed and scales inversely with toughness.
    fn propagate_brittle_cracks(&mut self, material: &StructuralMaterial, failed: &mut Vec<usize>) {
        let transfer = (0.6 / material.fracture_toughness.max(0.1)).min(0.9);
        let mut frontier: Vec<usize> = failed.clone();
        // Each vertex can only join the crack once; the graph bounds total work.
        while let Some(v) = frontier.pop() {
            let excess = self.vertices[v].stress.von_mises - material.ultimate_strength;
            if excess <= 0.0 {
                continue;
            }
            let neighbors: Vec<usize> = self
                .edges
                .iter()
                .filter(|e| e.a == v || e.b == v)
                .map(|e| if e.a == v { e.b } else { e.a })
                .collect();
            if neighbors.is_empty() {
                continue;
            }
            let share = excess * transfer / neighbors.len() as f32;
            for n in neighbors {
                let stress = &mut self.vertices[n].stress;
                if stress.fractured {
                    continue;
                }
                stress.tensile += share;
                stress.update_von_mises();
                if stress.tensile > material.tensile_strength {
                    stress.fractured = true;
                    failed.push(n);
                    frontier.push(n);
                }
            }
        }
    }

    /// Reset transient impact stresses after fracture resolution; standing
    /// gravity loads are recomputed next tick.
    pub fn clear_stresses(&mut self) {
        for vertex in &mut self.vertices {
            vertex.stress = StressState::default();
        }
        for edge in &mut self.edges {
            edge.current_load_n = 0.0;
        }
    }

    /// Build a simple column: a vertical chain of vertices with one critical
    /// base edge. Used for walls and tests.
    pub fn column(base: Vec3, height_m: f32, segments: usize, mass_kg: f32) -> Self {
        let seg_mass = mass_kg / (segments + 1) as f32;
        let vertices: Vec<StructuralVertex> = (0..=segments)
            .map(|i| {
                let y = height_m * i as f32 / segments as f32;
                StructuralVertex::new(
                    base + Vec3::new(0.0, y, 0.0),
                    Vec3::X,
                    seg_mass,
                    0.05,
                )
            })
            .collect();
        let edges: Vec<LoadBearingEdge> = (0..segments)
            .map(|i| {
                let e = LoadBearingEdge::new(i + 1, i, seg_mass * GRAVITY * 50.0);
                if i == 0 {
                    e.critical()
                } else {
                    e
                }
            })
            .collect();
        Self::new(vertices, edges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::MaterialCatalog;

    #[test]
    fn load_propagation_accumulates_toward_the_base() {
        let mut body = StructuralBody::column(Vec3::ZERO, 3.0, 3, 120.0);
        body.propagate_loads();
        // The base edge carries everything above it.
        let base_edge = body.edges.iter().find(|e| e.critical).unwrap();
        let upper_edge = &body.edges[2];
        assert!(base_edge.current_load_n > upper_edge.current_load_n);
        // Base vertex sees the full column weight over its cross section.
        let base_stress = body.vertices[0].stress.compressive;
        let top_stress = body.vertices[3].stress.compressive;
        assert!(base_stress > top_stress);
    }

    #[test]
    fn impact_pulse_signs_follow_vertex_normals() {
        let catalog = MaterialCatalog::standard();
        let concrete = &catalog.get_or_default(0).structural;
        let mut body = StructuralBody::new(
            vec![
                StructuralVertex::new(Vec3::ZERO, Vec3::X, 1.0, 0.01),
                StructuralVertex::new(Vec3::new(0.2, 0.0, 0.0), -Vec3::X, 1.0, 0.01),
            ],
            vec![],
        );
        // Impact traveling -X: compresses the +X-facing vertex, tensions the
        // other.
        body.apply_impact(Vec3::ZERO, -Vec3::X, 200.0, 0.01, 0.5);
        assert!(body.vertices[0].stress.compressive > 0.0);
        assert!(body.vertices[0].stress.tensile == 0.0);
        assert!(body.vertices[1].stress.tensile > 0.0);
        let report = body.check_failure(concrete);
        assert!(report.any_failed() || !report.severed_critical_edge);
    }

    #[test]
    fn overload_fails_vertices_and_severed_critical_edge_means_full() {
        let catalog = MaterialCatalog::standard();
        let concrete = &catalog.get_or_default(0).structural;
        let mut body = StructuralBody::column(Vec3::ZERO, 2.0, 2, 60.0);
        body.propagate_loads();
        // Massive pulse at the base drives everything over the limit.
        body.apply_impact(Vec3::ZERO, -Vec3::X, 50_000.0, 0.005, 0.1);
        let report = body.check_failure(concrete);
        assert!(report.any_failed());
        assert!(report.severed_critical_edge);
        assert_eq!(report.approach, StructuralApproach::Full);
    }

    #[test]
    fn brittle_cracks_spread_along_edges() {
        let catalog = MaterialCatalog::standard();
        let glass_index = catalog.index_of("glass").unwrap();
        let glass = &catalog.get_or_default(glass_index).structural;
        // Chain of vertices; only the first is hit directly.
        let vertices: Vec<StructuralVertex> = (0..5)
            .map(|i| {
                StructuralVertex::new(
                    Vec3::new(i as f32 * 0.1, 0.0, 0.0),
                    -Vec3::X,
                    0.5,
                    0.001,
                )
            })
            .collect();
        let edges: Vec<LoadBearingEdge> = (0..4)
            .map(|i| LoadBearingEdge::new(i, i + 1, 1.0e5))
            .collect();
        let mut body = StructuralBody::new(vertices, edges);
        body.apply_impact(Vec3::ZERO, -Vec3::X, 3_000.0, 0.0005, 0.05);
        let report = body.check_failure(glass);
        assert!(
            report.failed_vertices.len() > 1,
            "crack should propagate past the hit vertex, failed: {:?}",
            report.failed_vertices
        );
    }

    #[test]
    fn ductile_materials_do_not_chain_cracks() {
        let catalog = MaterialCatalog::standard();
        let steel_index = catalog.index_of("steel").unwrap();
        let steel = &catalog.get_or_default(steel_index).structural;
        let mut body = StructuralBody::new(
            vec![
                StructuralVertex::new(Vec3::ZERO, -Vec3::X, 1.0, 1e-7),
                StructuralVertex::new(Vec3::new(2.0, 0.0, 0.0), -Vec3::X, 1.0, 0.05),
            ],
            vec![LoadBearingEdge::new(0, 1, 1.0e6)],
        );
        body.apply_impact(Vec3::ZERO, Vec3::X, 5_000.0, 1e-6, 0.01);
        let report = body.check_failure(steel);
        // Only the struck vertex fails; steel is not brittle.
        assert!(report.failed_vertices.len() <= 1);
    }
}

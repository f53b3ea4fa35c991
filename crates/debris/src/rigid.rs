//! Rigid-body integration and collision for debris pieces.
//!
//! Fixed substep semi-implicit Euler; O(n²) world-AABB broad phase over
//! awake pieces; impulse resolution with positional correction; sleeping.

use crate::piece::DebrisPiece;
use engine_core::FixedStep;
use glam::{Quat, Vec3};
use rayon::prelude::*;

/// Integrator tuning.
#[derive(Debug, Clone)]
pub struct IntegratorConfig {
    /// Substep rate; frame time is accumulated and consumed in fixed steps.
    pub substep_hz: f32,
    pub gravity: Vec3,
    /// Quadratic air drag coefficient (force = −c·|v|·v).
    pub air_drag: f32,
    /// Fraction of angular velocity removed per substep.
    pub angular_damping: f32,
    pub restitution: f32,
    /// Impulse resolution iterations per substep.
    pub iterations: usize,
    /// Positional correction share of remaining depth.
    pub correction_percent: f32,
    /// Penetration allowed before correction kicks in [m].
    pub correction_slop: f32,
    /// Sleep thresholds and the continuous time required below them.
    pub sleep_linear: f32,
    pub sleep_angular: f32,
    pub sleep_time_s: f32,
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        Self {
            substep_hz: 60.0,
            gravity: Vec3::new(0.0, -9.81, 0.0),
            air_drag: 0.02,
            angular_damping: 0.02,
            restitution: 0.3,
            iterations: 4,
            correction_percent: 0.8,
            correction_slop: 0.01,
            sleep_linear: 0.08,
            sleep_angular: 0.1,
            sleep_time_s: 0.5,
        }
    }
}

/// A narrow-phase contact between two pieces.
#[derive(Debug, Clone, Copy)]
struct Contact {
    a: usize,
    b: usize,
    /// From a toward b.
    normal: Vec3,
    depth: f32,
    #[allow(dead_code)]
    point: Vec3,
}

/// Fixed-substep integrator over a slice of debris pieces.
pub struct DebrisIntegrator {
    config: IntegratorConfig,
    step: FixedStep,
}

impl DebrisIntegrator {
    pub fn new(config: IntegratorConfig) -> Self {
        Self {
            step: FixedStep::from_hz(config.substep_hz),
            config,
        }
    }

    pub fn config(&self) -> &IntegratorConfig {
        &self.config
    }

    /// Advance by frame time, consuming whole substeps.
    pub fn update(&mut self, pieces: &mut [DebrisPiece], dt: f32) {
        self.step.accumulate(dt);
        let h = self.step.step_seconds();
        while self.step.tick() {
            self.substep(pieces, h);
        }
    }

    fn substep(&self, pieces: &mut [DebrisPiece], h: f32) {
        let cfg = &self.config;

        // Integration is data-parallel over disjoint pieces.
        pieces.par_iter_mut().for_each(|piece| {
            if piece.is_sleeping {
                return;
            }
            let v = piece.linear_velocity;
            let drag_accel = -cfg.air_drag * v.length() * v / piece.mass_kg;
            let accel = cfg.gravity + drag_accel;
            piece.linear_velocity += accel * h;
            piece.position += piece.linear_velocity * h;

            // q += ½·(ω·q)·h, then renormalize.
            let omega = piece.angular_velocity;
            let q = piece.rotation;
            let q_dot = Quat::from_xyzw(omega.x, omega.y, omega.z, 0.0) * q;
            let integrated = Quat::from_xyzw(
                q.x + 0.5 * q_dot.x * h,
                q.y + 0.5 * q_dot.y * h,
                q.z + 0.5 * q_dot.z * h,
                q.w + 0.5 * q_dot.w * h,
            );
            piece.rotation = integrated.normalize();
            piece.angular_velocity *= 1.0 - cfg.angular_damping;
        });

        let contacts = self.find_contacts(pieces);
        self.resolve_contacts(pieces, &contacts);
        self.update_sleep_state(pieces, h);
    }

    /// Broad phase: O(n²) AABB tests. Pairs where both pieces sleep are
    /// skipped; a sleeping piece remains collidable by awake ones.
    fn find_contacts(&self, pieces: &[DebrisPiece]) -> Vec<Contact> {
        let aabbs: Vec<_> = pieces.iter().map(|p| p.world_aabb()).collect();
        let mut contacts = Vec::new();
        for a in 0..pieces.len() {
            for b in (a + 1)..pieces.len() {
                if pieces[a].is_sleeping && pieces[b].is_sleeping {
                    continue;
                }
                if !aabbs[a].overlaps(&aabbs[b]) {
                    continue;
                }
                // Narrow phase: overlap extents per axis; the minimum overlap
                // axis provides the contact normal.
                let bb_a = &aabbs[a];
                let bb_b = &aabbs[b];
                let overlap = Vec3::new(
                    (bb_a.max.x.min(bb_b.max.x)) - (bb_a.min.x.max(bb_b.min.x)),
                    (bb_a.max.y.min(bb_b.max.y)) - (bb_a.min.y.max(bb_b.min.y)),
                    (bb_a.max.z.min(bb_b.max.z)) - (bb_a.min.z.max(bb_b.min.z)),
                );
                if overlap.min_element() <= 0.0 {
                    continue;
                }
                let center_delta = bb_b.center() - bb_a.center();
                let (normal, depth) = if overlap.x <= overlap.y && overlap.x <= overlap.z {
                    (Vec3::X * center_delta.x.signum(), overlap.x)
                } else if overlap.y <= overlap.z {
                    (Vec3::Y * center_delta.y.signum(), overlap.y)
                } else {
                    (Vec3::Z * center_delta.z.signum(), overlap.z)
                };
                let point = Vec3::new(
                    0.5 * (bb_a.min.x.max(bb_b.min.x) + bb_a.max.x.min(bb_b.max.x)),
                    0.5 * (bb_a.min.y.max(bb_b.min.y) + bb_a.max.y.min(bb_b.max.y)),
                    0.5 * (bb_a.min.z.max(bb_b.min.z) + bb_a.max.z.min(bb_b.max.z)),
                );
                contacts.push(Contact {
                    a,
                    b,
                    normal,
                    depth,
                    point,
                });
            }
        }
        contacts
    }

    /// Impulse resolution with restitution, then positional correction.
    fn resolve_contacts(&self, pieces: &mut [DebrisPiece], contacts: &[Contact]) {
        let cfg = &self.config;
        for _ in 0..cfg.iterations {
            for contact in contacts {
                let (inv_a, inv_b) = (
                    1.0 / pieces[contact.a].mass_kg,
                    1.0 / pieces[contact.b].mass_kg,
                );
                let rel_vel =
                    pieces[contact.b].linear_velocity - pieces[contact.a].linear_velocity;
                let v_n = rel_vel.dot(contact.normal);
                if v_n > 0.0 {
                    continue; // separating
                }
                let j = -(1.0 + cfg.restitution) * v_n / (inv_a + inv_b);
                let impulse = contact.normal * j;
                // Contact impulses wake both sides.
                pieces[contact.a].wake();
                pieces[contact.b].wake();
                pieces[contact.a].linear_velocity -= impulse * inv_a;
                pieces[contact.b].linear_velocity += impulse * inv_b;
            }
        }

        for contact in contacts {
            let correction_depth = (contact.depth - cfg.correction_slop).max(0.0);
            if correction_depth <= 0.0 {
                continue;
            }
            let (inv_a, inv_b) = (
                1.0 / pieces[contact.a].mass_kg,
                1.0 / pieces[contact.b].mass_kg,
            );
            let correction =
                contact.normal * (cfg.correction_percent * correction_depth / (inv_a + inv_b));
            pieces[contact.a].position -= correction * inv_a;
            pieces[contact.b].position += correction * inv_b;
        }
    }

    /// Track time below the sleep thresholds; put pieces to sleep once the
    /// qualification time passes, zeroing their velocities.
    fn update_sleep_state(&self, pieces: &mut [DebrisPiece], h: f32) {
        let cfg = &self.config;
        for piece in pieces.iter_mut() {
            if piece.is_sleeping {
                continue;
            }
            let slow = piece.linear_velocity.length() < cfg.sleep_linear
                && piece.angular_velocity.length() < cfg.sleep_angular;
            if slow {
                piece.time_below_sleep_thresholds += h;
                if piece.time_below_sleep_thresholds >= cfg.sleep_time_s {
                    piece.is_sleeping = true;
                    piece.linear_velocity = Vec3::ZERO;
                    piece.angular_velocity = Vec3::ZERO;
                }
            } else {
                piece.time_below_sleep_thresholds = 0.0;
            }
        }
    }
}

//! Common ECS components used across the simulation.

use glam::Vec3;

/// Velocity component for moving entities.
#[derive(Debug, Clone, Copy, Default)]
pub struct Velocity {
    pub linear: Vec3,
    pub angular: Vec3,
}

impl Velocity {
    pub fn new(linear: Vec3) -> Self {
        Self {
            linear,
            angular: Vec3::ZERO,
        }
    }

    pub fn with_angular(linear: Vec3, angular: Vec3) -> Self {
        Self { linear, angular }
    }
}

/// Health component for damageable entities.
#[derive(Debug, Clone, Copy)]
pub struct Health {
    pub current: f32,
    pub max: f32,
}

impl Health {
    pub fn new(max: f32) -> Self {
        Self { current: max, max }
    }

    pub fn take_damage(&mut self, amount: f32) {
        self.current = (self.current - amount).max(0.0);
    }

    pub fn is_dead(&self) -> bool {
        self.current <= 0.0
    }

    pub fn percentage(&self) -> f32 {
        self.current / self.max
    }
}

impl Default for Health {
    fn default() -> Self {
        Self::new(100.0)
    }
}

/// Marker for anatomical entities (characters, wildlife). Thermal damage
/// above the burn threshold applies only to entities carrying this.
#[derive(Debug, Clone, Copy, Default)]
pub struct Anatomy;

/// Marker for entities that never move (placed tiles promoted to structural
/// bodies). Skipped by motion phases.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticBody;

/// Mesh reference component - links an entity to a cached mesh for rendering.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeshInstance {
    pub mesh_id: u32,
    pub material_id: u32,
}

impl MeshInstance {
    pub fn new(mesh_id: u32, material_id: u32) -> Self {
        Self { mesh_id, material_id }
    }
}

/// Lifetime component for temporary entities (debris, chips, effects).
#[derive(Debug, Clone, Copy)]
pub struct Lifetime {
    pub remaining: f32,
}

impl Lifetime {
    pub fn new(seconds: f32) -> Self {
        Self { remaining: seconds }
    }

    /// Tick down; returns true once expired.
    pub fn update(&mut self, dt: f32) -> bool {
        self.remaining -= dt;
        self.remaining <= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_damage_floors_at_zero() {
        let mut h = Health::new(10.0);
        h.take_damage(25.0);
        assert_eq!(h.current, 0.0);
        assert!(h.is_dead());
    }

    #[test]
    fn lifetime_expires_once_past_duration() {
        let mut l = Lifetime::new(0.1);
        assert!(!l.update(0.05));
        assert!(l.update(0.06));
    }
}

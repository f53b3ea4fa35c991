//! Fracture invocation parameters.

/// How the impact delivered its energy; selects the seed gradient and the
/// fragment velocity pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImpactKind {
    /// Projectile: fine fragments near the entry, coarser far away.
    PointImpact,
    /// Hammer blow: linear size gradient.
    BluntForce,
    /// Near-uniform fragmentation, biased toward more pieces.
    Explosion,
    /// Blade-like: fragment size varies along the cut axis.
    Cutting,
    /// Press: size varies along the vertical axis.
    Crushing,
    /// Torsion/slip: finest fragments at mid-distance.
    Shearing,
}

/// Per-call configuration.
#[derive(Debug, Clone)]
pub struct FractureConfig {
    /// Override the material's fragment count range when set.
    pub num_fragments: Option<usize>,
    /// Fraction of seeds biased toward the impact point, [0, 1].
    pub seed_clustering: f32,
    /// Seed for every stochastic choice; same seed, same fragments.
    pub seed: u64,
    /// Prefer the GPU compute path when a backend is attached.
    pub use_gpu: bool,
}

impl Default for FractureConfig {
    fn default() -> Self {
        Self {
            num_fragments: None,
            seed_clustering: 0.5,
            seed: 0,
            use_gpu: false,
        }
    }
}

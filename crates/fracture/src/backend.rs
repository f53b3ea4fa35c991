//! Dispatch contract for fracture computation.
//!
//! A backend takes a self-contained job and returns a future; the impact
//! dispatcher submits jobs as impacts drain and joins them before the debris
//! pool phase. The CPU backend is always available and is the fallback when
//! a GPU backend errors.

use crate::config::FractureConfig;
use crate::engine::FractureEngine;
use crate::{FractureError, ImpactKind};
use debris::DebrisPiece;
use glam::Vec3;
use meshes::MeshData;
use std::future::Future;
use std::pin::Pin;
use structural::FractureProperties;

/// Everything a backend needs to compute one fracture.
#[derive(Debug, Clone)]
pub struct FractureJob {
    pub source: MeshData,
    pub impact_point: Vec3,
    pub impact_dir: Vec3,
    pub energy_j: f32,
    pub kind: ImpactKind,
    pub props: FractureProperties,
    pub density: f32,
    pub config: FractureConfig,
}

/// Future yielding the fragments of one dispatch.
pub type FractureFuture =
    Pin<Box<dyn Future<Output = Result<Vec<DebrisPiece>, FractureError>> + Send>>;

/// A fracture compute backend. GPU implementations bind the buffers and
/// pipelines described in [`crate::gpu`]; the output contract is identical
/// to the CPU path modulo floating-point determinism.
pub trait FractureBackend: Send + Sync {
    fn dispatch(&self, job: FractureJob) -> FractureFuture;
    fn name(&self) -> &'static str;
}

/// Synchronous CPU backend wrapping [`FractureEngine`]. Completes the work
/// inline and returns a ready future, which keeps the dispatcher's join
/// point uniform across backends.
#[derive(Default)]
pub struct CpuBackend {
    engine: FractureEngine,
}

impl CpuBackend {
    pub fn new() -> Self {
        Self {
            engine: FractureEngine::new(),
        }
    }
}

impl FractureBackend for CpuBackend {
    fn dispatch(&self, job: FractureJob) -> FractureFuture {
        let result = self.engine.fracture(
            &job.source,
            job.impact_point,
            job.impact_dir,
            job.energy_j,
            job.kind,
            &job.props,
            job.density,
            &job.config,
        );
        Box::pin(std::future::ready(result))
    }

    fn name(&self) -> &'static str {
        "cpu"
    }
}

//! Progress and cancellation plumbing for the generation pipeline.
//!
//! Progress is exposed two ways: shared atomic counters that another thread
//! can poll (for UI progress bars) and callbacks invoked from the generation
//! thread itself. The progress callback doubles as a cancellation channel.

use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::sync::{
    atomic::{AtomicBool, AtomicU32, Ordering},
    Arc,
};

/// A stage of lightmap generation.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[repr(u32)]
pub enum ProgressStage {
    /// Gathering and validating input data.
    Initializing = 0,
    /// Partitioning scene geometry into faces and packing them into pages.
    Partitioning = 1,
    /// Per-texel shading with shadow tests.
    Shading = 2,
    /// Face-restricted lightmap blur.
    Blurring = 3,
    /// Building final textures and meshes.
    Baking = 4,
    /// Generation has finished.
    Completed = 5,
}

impl ProgressStage {
    fn from_id(id: u32) -> Self {
        match id {
            1 => ProgressStage::Partitioning,
            2 => ProgressStage::Shading,
            3 => ProgressStage::Blurring,
            4 => ProgressStage::Baking,
            5 => ProgressStage::Completed,
            _ => ProgressStage::Initializing,
        }
    }
}

impl Display for ProgressStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ProgressStage::Initializing => write!(f, "Initializing"),
            ProgressStage::Partitioning => write!(f, "Partitioning scene"),
            ProgressStage::Shading => write!(f, "Shading texels"),
            ProgressStage::Blurring => write!(f, "Blurring lightmaps"),
            ProgressStage::Baking => write!(f, "Baking meshes"),
            ProgressStage::Completed => write!(f, "Completed"),
        }
    }
}

/// Generation progress in shared atomic counters.
#[derive(Default)]
pub struct ProgressData {
    stage: AtomicU32,
    // Range is [0; max_iterations].
    progress: AtomicU32,
    max_iterations: AtomicU32,
}

impl ProgressData {
    /// Returns progress percentage in [0; 100] range.
    pub fn progress_percent(&self) -> u32 {
        let iterations = self.max_iterations.load(Ordering::SeqCst);
        if iterations > 0 {
            self.progress.load(Ordering::SeqCst) * 100 / iterations
        } else {
            0
        }
    }

    /// Returns progress as a fraction in [0; 1] range.
    pub fn progress_fraction(&self) -> f32 {
        let iterations = self.max_iterations.load(Ordering::SeqCst);
        if iterations > 0 {
            (self.progress.load(Ordering::SeqCst) as f32 / iterations as f32).min(1.0)
        } else {
            0.0
        }
    }

    /// Returns current stage.
    pub fn stage(&self) -> ProgressStage {
        ProgressStage::from_id(self.stage.load(Ordering::SeqCst))
    }

    pub(crate) fn set_stage(&self, stage: ProgressStage) {
        self.stage.store(stage as u32, Ordering::SeqCst);
    }

    /// Starts a new counting run: resets the counter and sets its bound.
    pub(crate) fn set_max_iterations(&self, max: u32) {
        self.progress.store(0, Ordering::SeqCst);
        self.max_iterations.store(max, Ordering::SeqCst);
    }

    pub(crate) fn advance_progress(&self, amount: u32) {
        self.progress.fetch_add(amount, Ordering::SeqCst);
    }
}

/// Small helper that allows you to track progress of lightmap generation from
/// another thread.
#[derive(Clone, Default)]
pub struct ProgressIndicator(pub Arc<ProgressData>);

impl Deref for ProgressIndicator {
    type Target = ProgressData;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Small helper that allows you to cancel lightmap generation from another
/// thread.
#[derive(Clone, Default)]
pub struct CancellationToken(pub Arc<AtomicBool>);

impl CancellationToken {
    /// Checks if generation was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Raises cancellation flag. Keep in mind that generation is not stopped
    /// immediately, instead it is stopped at one of the defined checkpoints.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst)
    }
}

/// Called with a fraction in [0; 1]. Returning `false` cancels generation.
pub type ProgressCallback<'a> = Box<dyn FnMut(f32) -> bool + Send + 'a>;

/// Called whenever the pipeline enters a new stage, with a short description.
/// Purely informational.
pub type StateCallback<'a> = Box<dyn FnMut(ProgressStage, &str) + Send + 'a>;

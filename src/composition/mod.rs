//! # Composition
//!
//! Planning, splicing and the frame loop that turns two inputs into one
//! side-by-side output.

pub mod engine;
pub mod splice;

// Re-exports for convenience
pub use engine::{
    run_composition, Adapted, CompositionPlan, Compositor, RunReport, RunSummary,
    SideBySideEngine,
};
pub use splice::{splice_frames, splice_row, split_point, DIVIDER_SAMPLE};

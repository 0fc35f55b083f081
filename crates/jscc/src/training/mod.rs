//! Training pipeline: cosine-restart LR schedule, loss metrics, and the
//! epoch loop with best-checkpoint selection.

pub mod metrics;
pub mod schedule;
pub mod trainer;

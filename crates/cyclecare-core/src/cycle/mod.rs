//! Cycle profile and the pure cycle-day / phase model.

pub mod model;
pub mod profile;

pub use model::{phase_at, CycleConstants, CycleDay, CycleModel, CyclePhase};
pub use profile::{
    CycleProfile, ProfileUpdate, DEFAULT_CYCLE_LENGTH_DAYS, DEFAULT_PERIOD_LENGTH_DAYS,
};

//! Data model: sample points, the history snapshot, and rank shifts.

pub mod point;
pub mod shift;
pub mod snapshot;

pub use point::SamplePoint;
pub use shift::RankShift;
pub use snapshot::HistorySnapshot;

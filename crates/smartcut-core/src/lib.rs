pub mod batch;
pub mod extract;
pub mod ids;
pub mod text;
pub mod types;

pub use ids::{MiniRange, ParseIdError, SegmentId, SegmentRef};
pub use types::*;

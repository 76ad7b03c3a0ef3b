pub mod machine;
pub mod persist;

pub use machine::{RunState, RunStatus, Stage, StageState, StageStatus};
pub use persist::{load_state, save_state};

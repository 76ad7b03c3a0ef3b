pub mod audit;
pub mod cleanse;
pub mod concept;
mod fanout;
pub mod merger;
pub mod planner;
mod prompts;
pub mod remap;

pub use audit::{audit_clips, ClipFinding};
pub use cleanse::{apply_removals, merge_removals, plan_removals};
pub use concept::{cluster_concepts, finalize_concepts, run_concept_stage, ConceptResult};
pub use merger::{merge_segments, range_map};
pub use planner::{merge_breakpoints, plan_breakpoints};
pub use remap::remap_clips;

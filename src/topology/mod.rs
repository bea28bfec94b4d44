//! Stage construction (§4.2, Component F) and the shared arithmetic it's built from.

pub mod creator;
pub mod helpers;
pub mod round_robin;

pub use creator::{create_stage, CreatedStage};

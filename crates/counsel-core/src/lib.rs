pub mod config;
pub mod error;
pub mod model;
pub mod normalize;
pub mod schema;
pub mod types;

pub use error::{CounselError, StrategyFailure};
pub use types::*;

//! Command implementations.

pub mod analyze;
pub mod validate;

pub use self::analyze::{build_analyzers, execute_analyze};
pub use self::validate::execute_validate;

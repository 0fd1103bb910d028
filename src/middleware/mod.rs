pub mod readiness;

pub use readiness::require_ready;

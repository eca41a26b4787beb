pub mod readiness;

pub use readiness::TableReadiness;

pub mod codec;
pub mod errors;
pub mod load;

pub use errors::*;

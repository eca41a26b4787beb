pub mod bind;
pub mod bind_ex;
pub mod envelope;
pub mod parameter_description;

pub use bind::Bind;
pub use bind_ex::{BindEx, BindExFrame};
pub use envelope::{Envelope, MessageDecode, MessageEncode, split_envelope};
pub use parameter_description::{ParameterDescription, ParameterDescriptionEx};

#[cfg(test)]
mod bind_ex_test;

pub mod layout_factory;
pub mod row_factory;

pub use layout_factory::LayoutFactory;
pub use row_factory::{OwnedCell, RowFactory};

#[cfg(test)]
mod layout_factory_test;
#[cfg(test)]
mod row_factory_test;

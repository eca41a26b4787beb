pub use super::factories::{LayoutFactory, OwnedCell, RowFactory};

pub struct Factory;

impl Factory {
    pub fn layout() -> LayoutFactory {
        LayoutFactory::new()
    }

    pub fn rows(oids: &[u32]) -> RowFactory {
        RowFactory::new(oids)
    }
}

use crate::engine::codec::column_type::oid;
use crate::engine::codec::layout::TableLayout;
use crate::protocol::parameter_description::ParameterDescriptionEx;

/// Table layouts for packer tests. The default is a cpu table:
/// `ts, usage, note | host (primary), region, rack`.
pub struct LayoutFactory {
    columns: Vec<(u32, u32)>,
    tag_index: usize,
    primary_tags: Vec<usize>,
}

impl LayoutFactory {
    pub fn new() -> Self {
        Self {
            columns: vec![
                (oid::TIMESTAMPTZ, 8),
                (oid::FLOAT8, 8),
                (oid::VARCHAR, 64),
                (oid::VARCHAR, 16),
                (oid::INT4, 4),
                (oid::TEXT, 8),
            ],
            tag_index: 3,
            primary_tags: vec![3],
        }
    }

    pub fn with_columns(mut self, columns: &[(u32, u32)]) -> Self {
        self.columns = columns.to_vec();
        self
    }

    pub fn with_tag_index(mut self, tag_index: usize) -> Self {
        self.tag_index = tag_index;
        self
    }

    pub fn with_primary_tags(mut self, primary_tags: &[usize]) -> Self {
        self.primary_tags = primary_tags.to_vec();
        self
    }

    pub fn oids(&self) -> Vec<u32> {
        self.columns.iter().map(|&(o, _)| o).collect()
    }

    pub fn description(&self) -> ParameterDescriptionEx {
        ParameterDescriptionEx {
            oids: self.oids(),
            tag_index: self.tag_index as i16,
            primary_tag_ids: self.primary_tags.iter().map(|&p| p as u16).collect(),
            storage_lens: self.columns.iter().map(|&(_, s)| s).collect(),
        }
    }

    pub fn create(self) -> TableLayout {
        TableLayout::from_description(&self.description()).expect("valid test layout")
    }
}

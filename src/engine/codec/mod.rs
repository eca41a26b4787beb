pub mod bitmap;
pub mod cell_codec;
pub mod column_type;
pub mod compression;
pub mod layout;
pub mod payload;
pub mod payload_reader;
pub mod render;
pub mod row_batch;
pub mod row_batch_builder;
pub mod row_packer;

pub use cell_codec::{CellValue, decode_cell, encode_cell};
pub use column_type::{ColumnType, oid};
pub use compression::CompressionType;
pub use layout::{TableLayout, bitmap_size, compute_row_size, var_region_start};
pub use payload::{PayloadBuffer, PayloadHeader, RowType};
pub use payload_reader::PayloadView;
pub use render::render_cell;
pub use row_batch::{RowBatch, RowBatchDecoder, RowGrid};
pub use row_batch_builder::RowBatchBuilder;
pub use row_packer::RowPacker;

#[cfg(test)]
mod bitmap_test;
#[cfg(test)]
mod payload_test;

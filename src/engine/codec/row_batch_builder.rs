use tracing::{debug, warn};

use crate::engine::codec::cell_codec::{CellValue, TEXT_HEADER_SIZE};
use crate::engine::codec::column_type::ColumnType;
use crate::engine::codec::compression::{self, CompressionType};
use crate::engine::codec::row_batch::{COMPRESSED_HEADER_LEN, ColumnMeta, MAX_COLUMNS, RowBatch};
use crate::engine::errors::{Result, WireError};
use crate::protocol::envelope::{ENVELOPE_LEN, MessageEncode};
use crate::shared::config::CONFIG;
use crate::shared::time::pg_micros_to_unix_millis;

const BUILDER: &str = "RowBatch";

/// Encode one result cell into `out`, which is exactly `storage_len` bytes.
///
/// Numbers are little endian at their natural width, timestamps are Unix
/// milliseconds, and character data is `u16 LE (len + 1)`, the bytes and a
/// NUL. NULL leaves the slot zeroed.
pub fn encode_result_cell(type_oid: u32, value: &CellValue<'_>, out: &mut [u8]) -> Result<()> {
    out.fill(0);
    if value.is_null() {
        return Ok(());
    }
    let mismatch = || WireError::TypeMismatch {
        oid: type_oid,
        value: value.kind(),
    };
    let Some(ty) = ColumnType::from_oid(type_oid) else {
        // Unmodelled types pass through as raw bytes.
        let CellValue::Bytes(b) = *value else {
            return Err(WireError::UnsupportedType(type_oid));
        };
        return put(out, b, "raw");
    };

    match (ty, *value) {
        (ColumnType::Int2, CellValue::Int(v)) => {
            let v = i16::try_from(v).map_err(|_| WireError::range("int2", v.to_string()))?;
            put(out, &v.to_le_bytes(), ty.name())
        }
        (ColumnType::Int4, CellValue::Int(v)) => {
            let v = i32::try_from(v).map_err(|_| WireError::range("int4", v.to_string()))?;
            put(out, &v.to_le_bytes(), ty.name())
        }
        (ColumnType::Int8 | ColumnType::Date, CellValue::Int(v)) => {
            put(out, &v.to_le_bytes(), ty.name())
        }
        (ColumnType::Float4, CellValue::Float(v)) => put(out, &(v as f32).to_le_bytes(), ty.name()),
        (ColumnType::Float8, CellValue::Float(v)) => put(out, &v.to_le_bytes(), ty.name()),
        (ColumnType::Timestamp | ColumnType::TimestampTz, CellValue::Timestamp(micros)) => {
            put(out, &pg_micros_to_unix_millis(micros).to_le_bytes(), ty.name())
        }
        (t, CellValue::Bytes(b)) if t.is_character() => {
            let need = TEXT_HEADER_SIZE + b.len() + 1;
            if need > out.len() {
                return Err(WireError::range(
                    t.name(),
                    format!("{} bytes need a {} byte cell, storage is {}", b.len(), need, out.len()),
                ));
            }
            let declared = u16::try_from(b.len() + 1)
                .map_err(|_| WireError::range(t.name(), format!("{} bytes", b.len())))?;
            out[..TEXT_HEADER_SIZE].copy_from_slice(&declared.to_le_bytes());
            out[TEXT_HEADER_SIZE..TEXT_HEADER_SIZE + b.len()].copy_from_slice(b);
            Ok(())
        }
        _ => Err(mismatch()),
    }
}

fn put(out: &mut [u8], bytes: &[u8], target: &'static str) -> Result<()> {
    if bytes.len() > out.len() {
        return Err(WireError::range(
            target,
            format!("{} bytes do not fit a {} byte cell", bytes.len(), out.len()),
        ));
    }
    out[..bytes.len()].copy_from_slice(bytes);
    Ok(())
}

/// Builds row batch messages the way the server lays them out: each column's
/// cells contiguous, optionally compressed as one block.
#[derive(Debug, Clone)]
pub struct RowBatchBuilder {
    oids: Vec<u32>,
    storage_lens: Vec<u32>,
    compression: CompressionType,
}

impl RowBatchBuilder {
    pub fn new(oids: Vec<u32>, storage_lens: Vec<u32>) -> Result<Self> {
        if oids.len() != storage_lens.len() {
            return Err(WireError::malformed(
                BUILDER,
                format!("{} oids but {} storage lengths", oids.len(), storage_lens.len()),
            ));
        }
        if oids.is_empty() || oids.len() > MAX_COLUMNS {
            return Err(WireError::malformed(
                BUILDER,
                format!("column count {} outside 1..={}", oids.len(), MAX_COLUMNS),
            ));
        }
        if let Some(c) = storage_lens.iter().position(|&l| l == 0) {
            return Err(WireError::malformed(
                BUILDER,
                format!("column {} has zero storage length", c),
            ));
        }
        let configured = &CONFIG.codec.result_compression;
        let compression = CompressionType::from_name(configured).unwrap_or_else(|| {
            warn!(target: "kwproto::row_batch", value = %configured, "unknown result compression, using lz4");
            CompressionType::Lz4
        });
        Ok(Self {
            oids,
            storage_lens,
            compression,
        })
    }

    pub fn with_compression(mut self, compression: CompressionType) -> Self {
        self.compression = compression;
        self
    }

    pub fn compression(&self) -> CompressionType {
        self.compression
    }

    /// Column-major cell data and the block offset of each column.
    fn column_blocks(&self, rows: &[Vec<CellValue<'_>>]) -> Result<(Vec<u8>, Vec<ColumnMeta>)> {
        let row_count = rows.len();
        let total: usize = self
            .storage_lens
            .iter()
            .map(|&l| l as usize * row_count)
            .sum();
        let mut data = vec![0u8; total];
        let mut columns = Vec::with_capacity(self.oids.len());
        let mut offset = 0usize;
        for (c, (&oid, &len)) in self.oids.iter().zip(&self.storage_lens).enumerate() {
            let width = len as usize;
            let block_offset = u32::try_from(offset).map_err(|_| {
                WireError::range("block offset", format!("{} exceeds u32", offset))
            })?;
            columns.push(ColumnMeta {
                storage_len: len,
                block_offset,
            });
            for (r, row) in rows.iter().enumerate() {
                let start = offset + r * width;
                encode_result_cell(oid, &row[c], &mut data[start..start + width])
                    .map_err(|e| e.at_cell(r, c))?;
            }
            offset += width * row_count;
        }
        Ok((data, columns))
    }

    /// Append a complete row batch message for `rows` to `dst`.
    pub fn encode(&self, rows: &[Vec<CellValue<'_>>], dst: &mut Vec<u8>) -> Result<()> {
        if rows.is_empty() {
            return Err(WireError::malformed(BUILDER, "a row batch needs at least one row"));
        }
        if let Some(r) = rows.iter().position(|row| row.len() != self.oids.len()) {
            return Err(WireError::malformed(
                BUILDER,
                format!("row {} has {} values for {} columns", r, rows[r].len(), self.oids.len()),
            ));
        }
        let row_num = u32::try_from(rows.len())
            .map_err(|_| WireError::range("row count", rows.len().to_string()))?;

        let (data, columns) = self.column_blocks(rows)?;
        let payload = match self.compression {
            CompressionType::None => data,
            kind => {
                let packed = compression::compress(kind, &data)?;
                let too_big =
                    |n: usize| WireError::range("compressed block", format!("{} bytes exceed u32", n));
                let uncompressed = u32::try_from(data.len()).map_err(|_| too_big(data.len()))?;
                let compressed = u32::try_from(packed.len()).map_err(|_| too_big(packed.len()))?;
                let mut framed = Vec::with_capacity(COMPRESSED_HEADER_LEN + packed.len());
                framed.extend_from_slice(&uncompressed.to_be_bytes());
                framed.extend_from_slice(&compressed.to_be_bytes());
                framed.extend_from_slice(&packed);
                framed
            }
        };

        let batch = RowBatch {
            row_num,
            col_num: self.oids.len() as u16,
            row_size: self.storage_lens.iter().fold(0u32, |acc, &l| acc.saturating_add(l)),
            columns,
            capacity: row_num,
            compression: self.compression,
            payload: &payload,
        };
        debug!(
            target: "kwproto::row_batch",
            rows = row_num,
            cols = batch.col_num,
            compression = %self.compression,
            payload_bytes = payload.len(),
            "built row batch"
        );
        batch.encode(dst)
    }

    /// Row batch body without the type byte and length.
    pub fn build_body(&self, rows: &[Vec<CellValue<'_>>]) -> Result<Vec<u8>> {
        let mut message = Vec::new();
        self.encode(rows, &mut message)?;
        message.drain(..ENVELOPE_LEN);
        Ok(message)
    }
}

use std::borrow::Cow;

use tracing::{debug, trace};

use crate::engine::codec::cell_codec::{CellSpan, decode_cell_span};
use crate::engine::codec::compression::{CompressionType, decompress_into};
use crate::engine::errors::{Result, WireError};
use crate::protocol::envelope::{
    MessageDecode, MessageEncode, MessageReader, SIZE_U16, SIZE_U32, tag, write_message,
};

pub const MAX_COLUMNS: usize = 4096;
/// `row_num`, `col_num` and `row_size`.
pub const BATCH_PREFIX_LEN: usize = SIZE_U32 + SIZE_U16 + SIZE_U32;
/// `(storage_len, block_offset)` per column.
pub const COLUMN_META_LEN: usize = 2 * SIZE_U32;
/// `capacity` and `compression_type` after the column metadata.
pub const BATCH_TRAILER_LEN: usize = SIZE_U32 + SIZE_U16;
/// `(uncompressed_size, compressed_size)` in front of a compressed block.
pub const COMPRESSED_HEADER_LEN: usize = 2 * SIZE_U32;

const ROW_BATCH: &str = "RowBatch";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMeta {
    pub storage_len: u32,
    pub block_offset: u32,
}

/// A row batch message with its metadata parsed and the payload still raw.
#[derive(Debug, Clone, PartialEq)]
pub struct RowBatch<'a> {
    pub row_num: u32,
    pub col_num: u16,
    pub row_size: u32,
    pub columns: Vec<ColumnMeta>,
    pub capacity: u32,
    pub compression: CompressionType,
    pub payload: &'a [u8],
}

impl<'a> MessageDecode<'a> for RowBatch<'a> {
    const TAG: u8 = tag::ROW_BATCH;

    fn decode(body: &'a [u8]) -> Result<Self> {
        if body.len() < BATCH_PREFIX_LEN {
            return Err(WireError::malformed(
                ROW_BATCH,
                format!("body of {} bytes is shorter than {}", body.len(), BATCH_PREFIX_LEN),
            ));
        }
        let mut r = MessageReader::new(body, ROW_BATCH);
        let row_num = r.read_u32()?;
        let col_num = r.read_u16()?;
        let row_size = r.read_u32()?;

        if row_num == 0 {
            return Err(WireError::malformed(ROW_BATCH, "row count is 0"));
        }
        if col_num == 0 || col_num as usize > MAX_COLUMNS {
            return Err(WireError::malformed(
                ROW_BATCH,
                format!("column count {} outside 1..={}", col_num, MAX_COLUMNS),
            ));
        }
        let meta_len = col_num as usize * COLUMN_META_LEN + BATCH_TRAILER_LEN;
        if !r.has_bytes(meta_len) {
            return Err(WireError::malformed(
                ROW_BATCH,
                format!(
                    "{} columns need {} metadata bytes, {} left",
                    col_num,
                    meta_len,
                    r.remaining()
                ),
            ));
        }

        let mut columns = Vec::with_capacity(col_num as usize);
        for c in 0..col_num {
            let meta = ColumnMeta {
                storage_len: r.read_u32()?,
                block_offset: r.read_u32()?,
            };
            if meta.storage_len == 0 {
                return Err(WireError::malformed(
                    ROW_BATCH,
                    format!("column {} has zero storage length", c),
                ));
            }
            columns.push(meta);
        }
        let capacity = r.read_u32()?;
        let compression = CompressionType::try_from(r.read_i16()?)?;

        Ok(Self {
            row_num,
            col_num,
            row_size,
            columns,
            capacity,
            compression,
            payload: r.rest(),
        })
    }
}

impl MessageEncode for RowBatch<'_> {
    const TAG: u8 = tag::ROW_BATCH;

    fn encode(&self, dst: &mut Vec<u8>) -> Result<()> {
        if self.columns.len() != self.col_num as usize {
            return Err(WireError::malformed(
                ROW_BATCH,
                format!("{} column entries for col_num {}", self.columns.len(), self.col_num),
            ));
        }
        write_message(dst, <Self as MessageEncode>::TAG, |w| {
            w.put_u32(self.row_num);
            w.put_u16(self.col_num);
            w.put_u32(self.row_size);
            for meta in &self.columns {
                w.put_u32(meta.storage_len);
                w.put_u32(meta.block_offset);
            }
            w.put_u32(self.capacity);
            w.put_i16(self.compression.as_i16());
            w.put_bytes(self.payload);
            Ok(())
        })
    }
}

/// Decoded `rows x cols` grid. Cells borrow from the message body, or from
/// the decoder's scratch buffer for compressed batches, so the grid cannot
/// outlive either.
#[derive(Debug, Clone, PartialEq)]
pub struct RowGrid<'a> {
    rows: usize,
    cols: usize,
    cells: Vec<Cow<'a, [u8]>>,
}

impl<'a> RowGrid<'a> {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&[u8]> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        Some(self.cells[row * self.cols + col].as_ref())
    }

    pub fn row(&self, row: usize) -> Option<&[Cow<'a, [u8]>]> {
        if row >= self.rows {
            return None;
        }
        Some(&self.cells[row * self.cols..(row + 1) * self.cols])
    }

    pub fn iter(&self) -> impl Iterator<Item = &[Cow<'a, [u8]>]> {
        self.cells.chunks(self.cols.max(1))
    }

    /// Copy every cell out, detaching the grid from its buffers.
    pub fn to_owned_rows(&self) -> Vec<Vec<Vec<u8>>> {
        self.iter()
            .map(|row| row.iter().map(|c| c.to_vec()).collect())
            .collect()
    }
}

/// Decodes row batches for one result shape. The column OIDs are registered
/// up front; the decompression buffer is kept between calls.
#[derive(Debug, Default)]
pub struct RowBatchDecoder {
    oids: Vec<u32>,
    scratch: Vec<u8>,
}

impl RowBatchDecoder {
    pub fn new(oids: Vec<u32>) -> Self {
        Self {
            oids,
            scratch: Vec::new(),
        }
    }

    pub fn set_oids(&mut self, oids: Vec<u32>) {
        self.oids = oids;
    }

    pub fn oids(&self) -> &[u32] {
        &self.oids
    }

    /// Decode a row batch body (type byte and length excluded).
    pub fn decode<'a>(&'a mut self, body: &'a [u8]) -> Result<RowGrid<'a>> {
        self.decode_inner(body).inspect_err(|e| e.log_error())
    }

    fn decode_inner<'a>(&'a mut self, body: &'a [u8]) -> Result<RowGrid<'a>> {
        let batch = RowBatch::decode(body)?;
        if self.oids.len() != batch.col_num as usize {
            return Err(WireError::malformed(
                ROW_BATCH,
                format!(
                    "{} column oids registered, batch has {} columns",
                    self.oids.len(),
                    batch.col_num
                ),
            ));
        }
        debug!(
            target: "kwproto::row_batch",
            rows = batch.row_num,
            cols = batch.col_num,
            compression = %batch.compression,
            payload_bytes = batch.payload.len(),
            "decoding row batch"
        );

        let Self { oids, scratch } = self;
        let source: &'a [u8] = match batch.compression {
            CompressionType::None => batch.payload,
            kind => {
                decompress_block(kind, batch.payload, scratch)?;
                let scratch: &'a Vec<u8> = scratch;
                scratch
            }
        };
        let region = if batch.compression == CompressionType::None {
            "payload"
        } else {
            "decompressed block"
        };

        let rows = batch.row_num as usize;
        let cols = batch.col_num as usize;
        let blocks = batch
            .columns
            .iter()
            .enumerate()
            .map(|(c, meta)| column_block(source, meta, rows, c, region))
            .collect::<Result<Vec<_>>>()?;

        let empty: &'a [u8] = &[];
        let mut cells = vec![Cow::Borrowed(empty); rows * cols];
        for (c, (&block, meta)) in blocks.iter().zip(&batch.columns).enumerate() {
            let width = meta.storage_len as usize;
            let oid = oids[c];
            for (r, raw) in block.chunks_exact(width).enumerate() {
                let span = decode_cell_span(oid, raw).map_err(|e| e.at_cell(r, c))?;
                cells[r * cols + c] = match span {
                    CellSpan::Range(span) => Cow::Borrowed(&raw[span]),
                    CellSpan::Owned(v) => Cow::Owned(v),
                };
            }
            trace!(target: "kwproto::row_batch", column = c, oid, width, "decoded column");
        }

        Ok(RowGrid { rows, cols, cells })
    }
}

/// Inflate the single compressed block of `payload` into `scratch`.
fn decompress_block(kind: CompressionType, payload: &[u8], scratch: &mut Vec<u8>) -> Result<()> {
    let mut r = MessageReader::new(payload, ROW_BATCH);
    if !r.has_bytes(COMPRESSED_HEADER_LEN) {
        return Err(WireError::malformed(
            ROW_BATCH,
            format!("{} payload bytes cannot hold the compression header", payload.len()),
        ));
    }
    let uncompressed = r.read_u32()? as usize;
    let compressed = r.read_u32()? as usize;
    let block = r.rest();
    if block.len() != compressed {
        return Err(WireError::malformed(
            ROW_BATCH,
            format!(
                "compressed block is {} bytes, header declares {}",
                block.len(),
                compressed
            ),
        ));
    }
    // Neither codec expands a block by more than 255x; reject larger claims
    // before allocating for them.
    if uncompressed > compressed.saturating_mul(255).saturating_add(64) {
        return Err(WireError::malformed(
            ROW_BATCH,
            format!(
                "{} compressed bytes cannot inflate to {}",
                compressed, uncompressed
            ),
        ));
    }

    scratch.clear();
    scratch.resize(uncompressed, 0);
    decompress_into(kind, block, scratch)?;
    trace!(target: "kwproto::row_batch", %kind, compressed, uncompressed, "decompressed block");
    Ok(())
}

/// The `rows * storage_len` bytes of column `c`, checked against `source`.
fn column_block<'a>(
    source: &'a [u8],
    meta: &ColumnMeta,
    rows: usize,
    c: usize,
    region: &str,
) -> Result<&'a [u8]> {
    let offset = meta.block_offset as usize;
    let width = meta.storage_len as usize;
    let violation = || {
        WireError::BoundsViolation(format!(
            "column {}: block at {} of {} rows x {} bytes exceeds {} of {} bytes",
            c,
            offset,
            rows,
            width,
            region,
            source.len()
        ))
    };
    if offset >= source.len() {
        return Err(violation());
    }
    let end = rows
        .checked_mul(width)
        .and_then(|len| offset.checked_add(len))
        .ok_or_else(violation)?;
    source.get(offset..end).ok_or_else(violation)
}

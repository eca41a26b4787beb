use tracing::trace;

use crate::engine::codec::layout::*;
use crate::engine::errors::{Result, WireError};
use crate::shared::config::CONFIG;

/// What a payload carries, stored in the head's `row_type` byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RowType {
    BothTagAndData = 0,
    OnlyData = 1,
    OnlyTag = 2,
}

impl TryFrom<u8> for RowType {
    type Error = WireError;

    fn try_from(v: u8) -> Result<Self> {
        match v {
            0 => Ok(RowType::BothTagAndData),
            1 => Ok(RowType::OnlyData),
            2 => Ok(RowType::OnlyTag),
            other => Err(WireError::malformed(
                "payload",
                format!("unknown row type {}", other),
            )),
        }
    }
}

/// Identity fields of the fixed head region. Only the low 8 bytes of the
/// 16-byte osn slot are used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PayloadHeader {
    pub osn_id: u64,
    pub range_group_id: u16,
    pub payload_version: u32,
    pub db_id: u32,
    pub table_id: u64,
    pub ts_version: u32,
}

impl PayloadHeader {
    /// Stamp the identity fields into `head`, which must be `HEAD_SIZE` long.
    /// `row_num` and `row_type` are left alone.
    pub fn write_into(&self, head: &mut [u8]) {
        head[OSN_ID_OFFSET..OSN_ID_OFFSET + OSN_ID_SIZE].fill(0);
        head[OSN_ID_OFFSET..OSN_ID_OFFSET + 8].copy_from_slice(&self.osn_id.to_le_bytes());
        head[RANGE_GROUP_ID_OFFSET..RANGE_GROUP_ID_OFFSET + 2]
            .copy_from_slice(&self.range_group_id.to_le_bytes());
        head[PAYLOAD_VERSION_OFFSET..PAYLOAD_VERSION_OFFSET + 4]
            .copy_from_slice(&self.payload_version.to_le_bytes());
        head[DB_ID_OFFSET..DB_ID_OFFSET + 4].copy_from_slice(&self.db_id.to_le_bytes());
        head[TABLE_ID_OFFSET..TABLE_ID_OFFSET + 8].copy_from_slice(&self.table_id.to_le_bytes());
        head[TS_VERSION_OFFSET..TS_VERSION_OFFSET + 4]
            .copy_from_slice(&self.ts_version.to_le_bytes());
    }

    pub fn read_from(payload: &[u8]) -> Result<Self> {
        let head = payload.get(..HEAD_SIZE).ok_or_else(|| {
            WireError::malformed(
                "payload",
                format!("{} bytes cannot hold a {} byte head", payload.len(), HEAD_SIZE),
            )
        })?;
        Ok(Self {
            osn_id: le_u64(head, OSN_ID_OFFSET),
            range_group_id: u16::from_le_bytes([
                head[RANGE_GROUP_ID_OFFSET],
                head[RANGE_GROUP_ID_OFFSET + 1],
            ]),
            payload_version: le_u32(head, PAYLOAD_VERSION_OFFSET),
            db_id: le_u32(head, DB_ID_OFFSET),
            table_id: le_u64(head, TABLE_ID_OFFSET),
            ts_version: le_u32(head, TS_VERSION_OFFSET),
        })
    }
}

pub(crate) fn le_u32(buf: &[u8], at: usize) -> u32 {
    let mut b = [0u8; 4];
    b.copy_from_slice(&buf[at..at + 4]);
    u32::from_le_bytes(b)
}

pub(crate) fn le_u64(buf: &[u8], at: usize) -> u64 {
    let mut b = [0u8; 8];
    b.copy_from_slice(&buf[at..at + 8]);
    u64::from_le_bytes(b)
}

/// Growable byte buffer holding one primary tag group: a header written once,
/// then row blocks appended at `tail`.
///
/// `reset` only rewinds cursors. Bytes past `tail` may be stale and are never
/// read; writers zero every region they lay out before filling it.
#[derive(Debug, Clone)]
pub struct PayloadBuffer {
    data: Vec<u8>,
    pub(crate) tail: usize,
    pub(crate) head_tail: usize,
    pub(crate) row_num: u32,
}

impl Default for PayloadBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl PayloadBuffer {
    pub fn new() -> Self {
        Self::with_capacity(CONFIG.codec.initial_payload_capacity)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![0; capacity],
            tail: 0,
            head_tail: 0,
            row_num: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn tail(&self) -> usize {
        self.tail
    }

    pub fn head_tail(&self) -> usize {
        self.head_tail
    }

    pub fn row_num(&self) -> u32 {
        self.row_num
    }

    pub fn has_header(&self) -> bool {
        self.head_tail != 0
    }

    pub fn is_empty(&self) -> bool {
        self.row_num == 0
    }

    /// Grow by `size` bytes. Written bytes are kept; the buffer never shrinks.
    pub fn extend(&mut self, size: usize) {
        if size == 0 {
            return;
        }
        let new_len = self.data.len() + size;
        trace!(
            target: "kwproto::payload",
            from = self.data.len(),
            to = new_len,
            "extending payload buffer"
        );
        self.data.resize(new_len, 0);
    }

    /// Make sure `needed` bytes are addressable, growing by at least `step`.
    pub fn ensure_capacity(&mut self, needed: usize, step: usize) {
        if needed > self.data.len() {
            let short = needed - self.data.len();
            self.extend(short.max(step));
        }
    }

    pub fn reset(&mut self) {
        self.tail = 0;
        self.head_tail = 0;
        self.row_num = 0;
    }

    /// Stamp the row count and the data length into the header. Called once
    /// per payload, after the last row.
    pub fn write_row_num(&mut self) -> Result<()> {
        if !self.has_header() {
            return Err(WireError::malformed(
                "payload",
                "row count written before any header",
            ));
        }
        let data_len = self.tail - self.head_tail - DATA_LEN_SIZE;
        let data_len = u32::try_from(data_len).map_err(|_| {
            WireError::range("payload", format!("data length {} exceeds u32", data_len))
        })?;
        self.data[ROW_NUM_OFFSET..ROW_NUM_OFFSET + 4].copy_from_slice(&self.row_num.to_le_bytes());
        self.data[self.head_tail..self.head_tail + DATA_LEN_SIZE]
            .copy_from_slice(&data_len.to_le_bytes());
        Ok(())
    }

    /// The bytes written so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.tail]
    }

    pub(crate) fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

use indexmap::IndexMap;
use tracing::debug;

use crate::engine::codec::cell_codec::CellValue;
use crate::engine::codec::payload::PayloadBuffer;
use crate::engine::codec::row_packer::RowPacker;
use crate::engine::errors::{Result, WireError};
use crate::protocol::envelope::{MessageDecode, MessageEncode, MessageReader, tag, write_message};

const BIND_EX: &str = "BindEx";

/// Batched insert: one packed payload per primary tag group, sent as a single
/// `'W'` message.
///
/// Groups keep first-seen order, so the same input always encodes to the
/// same bytes. Buffers survive [`BindEx::reset`] and are reused by the next
/// batch. Rows pushed after the last [`BindEx::seal`] make `encode` fail.
#[derive(Debug, Clone, Default)]
pub struct BindEx {
    pub portal: String,
    pub statement: String,
    payloads: IndexMap<String, PayloadBuffer>,
    sealed: bool,
}

impl BindEx {
    pub fn new(portal: impl Into<String>, statement: impl Into<String>) -> Self {
        Self {
            portal: portal.into(),
            statement: statement.into(),
            payloads: IndexMap::new(),
            sealed: false,
        }
    }

    /// Route `row` to its primary tag group and pack it there.
    pub fn push_row(&mut self, packer: &RowPacker, row: &[CellValue<'_>]) -> Result<()> {
        let key = packer.primary_tag_key(row)?;
        self.sealed = false;
        let buf = self.payloads.entry(key).or_default();
        packer.fill_one_row(buf, row)
    }

    pub fn payload(&self, key: &str) -> Option<&PayloadBuffer> {
        self.payloads.get(key)
    }

    /// Direct access leaves the batch unsealed.
    pub fn payload_mut(&mut self, key: &str) -> Option<&mut PayloadBuffer> {
        self.sealed = false;
        self.payloads.get_mut(key)
    }

    pub fn payloads(&self) -> impl Iterator<Item = (&str, &PayloadBuffer)> {
        self.payloads.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Groups holding at least one row.
    pub fn len(&self) -> usize {
        self.payloads.values().filter(|p| !p.is_empty()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stamp row counts and data lengths. Must run after the last row and
    /// before `encode`.
    pub fn seal(&mut self) -> Result<()> {
        for (key, buf) in self.payloads.iter_mut() {
            if buf.is_empty() {
                continue;
            }
            buf.write_row_num()?;
            debug!(
                target: "kwproto::bind_ex",
                group = %key,
                rows = buf.row_num(),
                bytes = buf.tail(),
                "sealed payload"
            );
        }
        self.sealed = true;
        Ok(())
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed || self.is_empty()
    }

    /// Rewind every group for the next batch; allocations are kept.
    pub fn reset(&mut self) {
        for buf in self.payloads.values_mut() {
            buf.reset();
        }
        self.sealed = false;
    }
}

impl MessageEncode for BindEx {
    const TAG: u8 = tag::BIND_EX;

    fn encode(&self, dst: &mut Vec<u8>) -> Result<()> {
        if !self.is_sealed() {
            return Err(WireError::malformed(
                BIND_EX,
                "rows were added after the last seal",
            ));
        }
        let count = i16::try_from(self.len())
            .map_err(|_| WireError::range("payload count", format!("{} groups", self.len())))?;
        write_message(dst, <Self as MessageEncode>::TAG, |w| {
            w.put_cstr(&self.portal)?;
            w.put_cstr(&self.statement)?;
            w.put_i16(count);
            for (key, buf) in self.payloads.iter().filter(|(_, p)| !p.is_empty()) {
                let bytes = buf.as_bytes();
                let len = i32::try_from(bytes.len()).map_err(|_| {
                    WireError::range("payload", format!("{} bytes for group {}", bytes.len(), key))
                })?;
                w.put_cstr(key)?;
                w.put_i32(len);
                w.put_bytes(bytes);
            }
            Ok(())
        })
    }
}

/// A received `'W'` message; payloads borrow from the message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindExFrame<'a> {
    pub portal: &'a str,
    pub statement: &'a str,
    pub payloads: Vec<(&'a str, &'a [u8])>,
}

impl<'a> MessageDecode<'a> for BindExFrame<'a> {
    const TAG: u8 = tag::BIND_EX;

    fn decode(body: &'a [u8]) -> Result<Self> {
        let mut r = MessageReader::new(body, BIND_EX);
        let portal = r.read_cstr()?;
        let statement = r.read_cstr()?;

        let count = r.read_i16()?;
        let count = usize::try_from(count).map_err(|_| {
            WireError::malformed(BIND_EX, format!("negative payload count {}", count))
        })?;
        let mut payloads = Vec::with_capacity(count.min(r.remaining() / 5));
        for _ in 0..count {
            let key = r.read_cstr()?;
            let len = r.read_i32()?;
            let len = usize::try_from(len).map_err(|_| {
                WireError::malformed(BIND_EX, format!("negative payload length {} for {}", len, key))
            })?;
            payloads.push((key, r.read_bytes(len)?));
        }
        r.expect_end()?;

        Ok(Self {
            portal,
            statement,
            payloads,
        })
    }
}

impl MessageEncode for BindExFrame<'_> {
    const TAG: u8 = tag::BIND_EX;

    fn encode(&self, dst: &mut Vec<u8>) -> Result<()> {
        let count = i16::try_from(self.payloads.len()).map_err(|_| {
            WireError::range("payload count", format!("{} groups", self.payloads.len()))
        })?;
        write_message(dst, <Self as MessageEncode>::TAG, |w| {
            w.put_cstr(self.portal)?;
            w.put_cstr(self.statement)?;
            w.put_i16(count);
            for (key, bytes) in &self.payloads {
                let len = i32::try_from(bytes.len()).map_err(|_| {
                    WireError::range("payload", format!("{} bytes for group {}", bytes.len(), key))
                })?;
                w.put_cstr(key)?;
                w.put_i32(len);
                w.put_bytes(bytes);
            }
            Ok(())
        })
    }
}

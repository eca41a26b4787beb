use tracing::{debug, trace};

use crate::engine::codec::bitmap::NullBitmap;
use crate::engine::codec::cell_codec::{CellValue, encode_cell};
use crate::engine::codec::column_type::ColumnType;
use crate::engine::codec::layout::*;
use crate::engine::codec::payload::{PayloadBuffer, PayloadHeader, RowType};
use crate::engine::errors::{Result, WireError};
use crate::shared::config::CONFIG;

/// Packs rows of one table into per primary tag payloads.
#[derive(Debug, Clone)]
pub struct RowPacker {
    layout: TableLayout,
    header: PayloadHeader,
    extend_step: usize,
}

impl RowPacker {
    pub fn new(layout: TableLayout) -> Self {
        Self {
            layout,
            header: PayloadHeader::default(),
            extend_step: CONFIG.codec.payload_extend_step,
        }
    }

    pub fn with_header(mut self, header: PayloadHeader) -> Self {
        self.header = header;
        self
    }

    pub fn with_extend_step(mut self, step: usize) -> Self {
        self.extend_step = step.max(1);
        self
    }

    pub fn layout(&self) -> &TableLayout {
        &self.layout
    }

    /// Append one row to `buf`, writing the group header first if `buf` has
    /// none yet. On error nothing of the row stays visible: `tail` and
    /// `head_tail` are restored.
    pub fn fill_one_row(&self, buf: &mut PayloadBuffer, row: &[CellValue<'_>]) -> Result<()> {
        let saved = (buf.tail, buf.head_tail);
        let result = self.fill(buf, row);
        if result.is_err() {
            buf.tail = saved.0;
            buf.head_tail = saved.1;
        }
        result
    }

    fn fill(&self, buf: &mut PayloadBuffer, row: &[CellValue<'_>]) -> Result<()> {
        let n = self.layout.column_count();
        if row.len() != n {
            return Err(WireError::malformed(
                "row",
                format!("{} values for {} columns", row.len(), n),
            ));
        }
        let row_index = buf.row_num as usize;

        if !buf.has_header() {
            let needed = self.header_len(row) + DATA_LEN_SIZE;
            buf.ensure_capacity(needed, self.extend_step);
            self.write_header(buf, row, row_index)?;
        }

        let row_len = self.row_len(row);
        buf.ensure_capacity(buf.tail + ROW_LEN_SIZE + row_len, self.extend_step);
        self.write_row(buf, row, row_index)?;
        buf.row_num += 1;
        Ok(())
    }

    /// Header bytes for `row`'s tags, up to but excluding the data length.
    fn header_len(&self, row: &[CellValue<'_>]) -> usize {
        let (_, var_start) = self.layout.header_positions();
        let mut var = 0usize;
        for i in self.layout.tag_index()..self.layout.column_count() {
            if !self.layout.is_primary_tag(i) {
                var += var_entry_len(self.layout.column(i), &row[i]);
            }
        }
        var_start + var
    }

    fn row_len(&self, row: &[CellValue<'_>]) -> usize {
        let tag_index = self.layout.tag_index();
        let var: usize = (0..tag_index)
            .map(|c| var_entry_len(self.layout.column(c), &row[c]))
            .sum();
        bitmap_size(tag_index) + self.layout.row_size() + var
    }

    fn write_header(
        &self,
        buf: &mut PayloadBuffer,
        row: &[CellValue<'_>],
        row_index: usize,
    ) -> Result<()> {
        let layout = &self.layout;
        let n = layout.column_count();
        let tag_index = layout.tag_index();
        let ptag_len = layout.ptag_len();
        let (tag_start, var_start) = layout.header_positions();
        let data = buf.data_mut();

        data[..var_start].fill(0);
        self.header.write_into(&mut data[..HEAD_SIZE]);
        data[HEAD_SIZE..HEAD_SIZE + PTAG_LEN_SIZE].copy_from_slice(&(ptag_len as u16).to_le_bytes());

        let mut pos = HEAD_SIZE + PTAG_LEN_SIZE;
        for &p in layout.primary_tags() {
            if row[p].is_null() {
                return Err(
                    WireError::malformed("row", "primary tag value is NULL").at_cell(row_index, p)
                );
            }
            let width = layout.storage_len(p) as usize;
            encode_cell(
                layout.column(p).oid(),
                &row[p],
                &mut data[pos..pos + width],
                layout.storage_len(p),
                &mut [],
                0,
                true,
            )
            .map_err(|e| e.at_cell(row_index, p))?;
            pos += width;
        }

        let bitmap_len = bitmap_size(n - tag_index);
        let (fixed, var_region) = data.split_at_mut(var_start);
        let mut slot = tag_start + bitmap_len;
        let mut used_var = 0usize;
        let mut any_tag = false;
        for i in tag_index..n {
            let width = layout.storage_len(i) as usize;
            if row[i].is_null() {
                NullBitmap::set_bit(&mut fixed[tag_start..tag_start + bitmap_len], i - tag_index);
            } else {
                any_tag = true;
                let (_, var) = encode_cell(
                    layout.column(i).oid(),
                    &row[i],
                    &mut fixed[slot..slot + width],
                    layout.storage_len(i),
                    var_region,
                    used_var,
                    layout.is_primary_tag(i),
                )
                .map_err(|e| e.at_cell(row_index, i))?;
                used_var += var;
            }
            slot += width;
        }

        let tag_len = layout.tag_section_len() as u32;
        let tag_len_pos = tag_start - ALL_TAG_LEN_SIZE;
        data[tag_len_pos..tag_start].copy_from_slice(&tag_len.to_le_bytes());
        let row_type = if any_tag {
            RowType::BothTagAndData
        } else {
            RowType::OnlyData
        };
        data[ROW_TYPE_OFFSET] = row_type as u8;

        buf.head_tail = var_start + used_var;
        buf.tail = buf.head_tail + DATA_LEN_SIZE;
        debug!(
            target: "kwproto::payload",
            ptag_len,
            tag_vars = used_var,
            head_tail = buf.head_tail,
            "wrote payload header"
        );
        Ok(())
    }

    fn write_row(
        &self,
        buf: &mut PayloadBuffer,
        row: &[CellValue<'_>],
        row_index: usize,
    ) -> Result<()> {
        let layout = &self.layout;
        let tag_index = layout.tag_index();
        let row_start = buf.tail;
        let bitmap_start = row_start + ROW_LEN_SIZE;
        let bitmap_len = bitmap_size(tag_index);
        let fixed_start = bitmap_start + bitmap_len;
        let var_start = fixed_start + layout.row_size();
        let data = buf.data_mut();

        data[row_start..var_start].fill(0);
        let (fixed, var_region) = data.split_at_mut(var_start);
        let mut pos = fixed_start;
        let mut used_var = 0usize;
        for c in 0..tag_index {
            let width = layout.row_slot_width(c);
            if row[c].is_null() {
                NullBitmap::set_bit(&mut fixed[bitmap_start..fixed_start], c);
                pos += width;
                continue;
            }
            let (written, var) = encode_cell(
                layout.column(c).oid(),
                &row[c],
                &mut fixed[pos..pos + width],
                layout.storage_len(c),
                var_region,
                used_var,
                false,
            )
            .map_err(|e| e.at_cell(row_index, c))?;
            pos += written;
            used_var += var;
        }

        let row_len = bitmap_len + layout.row_size() + used_var;
        let row_len = u32::try_from(row_len)
            .map_err(|_| WireError::range("row", format!("row length {} exceeds u32", row_len)))?;
        data[row_start..bitmap_start].copy_from_slice(&row_len.to_le_bytes());
        buf.tail = var_start + used_var;
        trace!(target: "kwproto::payload", row = row_index, row_len, tail = buf.tail, "packed row");
        Ok(())
    }

    /// Key naming the payload group `row` belongs to: the primary tag values
    /// joined with `,`.
    ///
    /// Distinct tag values always give distinct keys. Inside text values `\`
    /// and `,` are backslash escaped, and control characters or invalid UTF-8
    /// are written as `\xHH`. Numbers are keyed by the value their slot
    /// stores, so `1` and `1.0` in a float column share a group.
    pub fn primary_tag_key(&self, row: &[CellValue<'_>]) -> Result<String> {
        let mut key = String::new();
        for (i, &p) in self.layout.primary_tags().iter().enumerate() {
            let value = row.get(p).ok_or_else(|| {
                WireError::malformed("row", format!("missing primary tag column {}", p))
            })?;
            if i > 0 {
                key.push(',');
            }
            match (self.layout.column(p), value) {
                (_, CellValue::Null) => {
                    return Err(WireError::malformed(
                        "row",
                        format!("primary tag column {} is NULL", p),
                    ));
                }
                (ColumnType::Float4, CellValue::Int(v)) => push_float4(&mut key, *v as f64),
                (ColumnType::Float4, CellValue::Float(v)) => push_float4(&mut key, *v),
                (ColumnType::Float8, CellValue::Int(v)) => push_float8(&mut key, *v as f64),
                (ColumnType::Float8, CellValue::Float(v)) => push_float8(&mut key, *v),
                (_, CellValue::Int(v)) | (_, CellValue::Timestamp(v)) => {
                    key.push_str(&v.to_string())
                }
                (_, CellValue::Float(v)) => push_float8(&mut key, *v),
                (_, CellValue::Bytes(b)) => push_escaped(&mut key, b),
            }
        }
        Ok(key)
    }
}

fn push_float4(key: &mut String, v: f64) {
    let narrow = v as f32;
    if narrow.is_nan() {
        key.push_str(&format!("NaN:{:08x}", narrow.to_bits()));
    } else {
        key.push_str(&narrow.to_string());
    }
}

fn push_float8(key: &mut String, v: f64) {
    if v.is_nan() {
        key.push_str(&format!("NaN:{:016x}", v.to_bits()));
    } else {
        key.push_str(&v.to_string());
    }
}

/// Reversible text form of a tag value; the only bare `,` in a key is the
/// separator.
fn push_escaped(key: &mut String, bytes: &[u8]) {
    for chunk in bytes.utf8_chunks() {
        for ch in chunk.valid().chars() {
            match ch {
                '\\' => key.push_str("\\\\"),
                ',' => key.push_str("\\,"),
                c if c.is_control() => {
                    let mut utf8 = [0u8; 4];
                    for b in c.encode_utf8(&mut utf8).bytes() {
                        key.push_str(&format!("\\x{:02x}", b));
                    }
                }
                c => key.push(c),
            }
        }
        for b in chunk.invalid() {
            key.push_str(&format!("\\x{:02x}", b));
        }
    }
}

/// Variable region bytes a value needs outside the fixed slot.
fn var_entry_len(ty: ColumnType, value: &CellValue<'_>) -> usize {
    match value {
        CellValue::Bytes(b) if ty.is_variable() => VAR_DATA_LEN_SIZE + b.len() + 1,
        _ => 0,
    }
}

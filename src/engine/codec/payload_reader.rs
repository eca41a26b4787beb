use crate::engine::codec::bitmap::NullBitmap;
use crate::engine::codec::column_type::VAR_COLUMN_SIZE;
use crate::engine::codec::layout::*;
use crate::engine::codec::payload::{PayloadHeader, RowType, le_u32, le_u64};
use crate::engine::errors::{Result, WireError};

const PAYLOAD: &str = "payload";

fn take<'a>(buf: &'a [u8], at: usize, len: usize, what: &str) -> Result<&'a [u8]> {
    at.checked_add(len)
        .and_then(|end| buf.get(at..end))
        .ok_or_else(|| {
            WireError::BoundsViolation(format!(
                "{} needs bytes {}..{}+{} of a {} byte buffer",
                what,
                at,
                at,
                len,
                buf.len()
            ))
        })
}

/// Value bytes of a variable region entry, terminator excluded.
fn read_var(region: &[u8], offset: u64) -> Result<(&[u8], usize)> {
    let offset = usize::try_from(offset)
        .map_err(|_| WireError::BoundsViolation(format!("variable offset {} too large", offset)))?;
    let prefix = take(region, offset, VAR_DATA_LEN_SIZE, "variable length prefix")?;
    let declared = u16::from_le_bytes([prefix[0], prefix[1]]) as usize;
    if declared == 0 {
        return Err(WireError::malformed(PAYLOAD, "variable entry without terminator"));
    }
    let entry = take(region, offset + VAR_DATA_LEN_SIZE, declared, "variable entry")?;
    Ok((&entry[..declared - 1], offset + VAR_DATA_LEN_SIZE + declared))
}

/// A packed payload parsed back against its table layout.
#[derive(Debug)]
pub struct PayloadView<'a> {
    layout: &'a TableLayout,
    pub header: PayloadHeader,
    pub row_num: u32,
    pub row_type: RowType,
    pub primary_tag: &'a [u8],
    tag_bitmap: &'a [u8],
    tag_slots: &'a [u8],
    tag_var: &'a [u8],
    rows: Vec<RowView<'a>>,
}

/// One data row inside a payload.
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    bitmap: &'a [u8],
    fixed: &'a [u8],
    var: &'a [u8],
}

impl<'a> PayloadView<'a> {
    pub fn parse(layout: &'a TableLayout, bytes: &'a [u8]) -> Result<Self> {
        let header = PayloadHeader::read_from(bytes)?;
        let row_num = le_u32(bytes, ROW_NUM_OFFSET);
        let row_type = RowType::try_from(bytes[ROW_TYPE_OFFSET])?;

        let ptag_field = take(bytes, HEAD_SIZE, PTAG_LEN_SIZE, "primary tag length")?;
        let ptag_len = u16::from_le_bytes([ptag_field[0], ptag_field[1]]) as usize;
        if ptag_len != layout.ptag_len() {
            return Err(WireError::malformed(
                PAYLOAD,
                format!("primary tag is {} bytes, layout expects {}", ptag_len, layout.ptag_len()),
            ));
        }
        let primary_tag = take(bytes, HEAD_SIZE + PTAG_LEN_SIZE, ptag_len, "primary tag")?;

        let (tag_start, var_start) = layout.header_positions();
        let tag_len = le_u32(
            take(bytes, tag_start - ALL_TAG_LEN_SIZE, ALL_TAG_LEN_SIZE, "tag length")?,
            0,
        ) as usize;
        if tag_len != layout.tag_section_len() {
            return Err(WireError::malformed(
                PAYLOAD,
                format!("tag section is {} bytes, layout expects {}", tag_len, layout.tag_section_len()),
            ));
        }
        let bitmap_len = bitmap_size(layout.tag_count());
        let tag_bitmap = take(bytes, tag_start, bitmap_len, "tag bitmap")?;
        let tag_slots = take(bytes, tag_start + bitmap_len, tag_len - bitmap_len, "tag slots")?;

        let mut view = Self {
            layout,
            header,
            row_num,
            row_type,
            primary_tag,
            tag_bitmap,
            tag_slots,
            tag_var: &bytes[var_start..var_start],
            rows: Vec::with_capacity(row_num as usize),
        };

        // The tag variable region has no length field; its end is the end of
        // the furthest entry.
        let mut head_tail = var_start;
        let var_all = &bytes[var_start..];
        for i in layout.tag_index()..layout.column_count() {
            if view.tag_is_var(i) && !NullBitmap::is_null(tag_bitmap, i - layout.tag_index()) {
                let (_, end) = read_var(var_all, view.tag_offset_slot(i))?;
                head_tail = head_tail.max(var_start + end);
            }
        }
        view.tag_var = &bytes[var_start..head_tail];

        let data_len = le_u32(take(bytes, head_tail, DATA_LEN_SIZE, "data length")?, 0) as usize;
        let data_start = head_tail + DATA_LEN_SIZE;
        if data_start + data_len != bytes.len() {
            return Err(WireError::malformed(
                PAYLOAD,
                format!(
                    "data length {} does not match the {} bytes after the header",
                    data_len,
                    bytes.len() - data_start
                ),
            ));
        }

        let field_bitmap = bitmap_size(layout.tag_index());
        let fixed_len = field_bitmap + layout.row_size();
        let mut pos = data_start;
        for r in 0..row_num as usize {
            let row_len = le_u32(take(bytes, pos, ROW_LEN_SIZE, "row length")?, 0) as usize;
            let body = take(bytes, pos + ROW_LEN_SIZE, row_len, "row body")
                .map_err(|e| e.at_cell(r, 0))?;
            if row_len < fixed_len {
                return Err(WireError::malformed(
                    PAYLOAD,
                    format!("row {} is {} bytes, fixed part alone is {}", r, row_len, fixed_len),
                ));
            }
            view.rows.push(RowView {
                bitmap: &body[..field_bitmap],
                fixed: &body[field_bitmap..fixed_len],
                var: &body[fixed_len..],
            });
            pos += ROW_LEN_SIZE + row_len;
        }
        if pos != bytes.len() {
            return Err(WireError::malformed(
                PAYLOAD,
                format!("{} bytes after the last row", bytes.len() - pos),
            ));
        }
        Ok(view)
    }

    fn tag_is_var(&self, i: usize) -> bool {
        self.layout.column(i).is_variable() && !self.layout.is_primary_tag(i)
    }

    fn tag_slot(&self, i: usize) -> &'a [u8] {
        let start: usize = (self.layout.tag_index()..i)
            .map(|t| self.layout.storage_len(t) as usize)
            .sum();
        &self.tag_slots[start..start + self.layout.storage_len(i) as usize]
    }

    fn tag_offset_slot(&self, i: usize) -> u64 {
        le_u64(self.tag_slot(i), 0)
    }

    /// Bytes of tag column `i`, `None` when it is NULL.
    pub fn tag(&self, i: usize) -> Result<Option<&'a [u8]>> {
        let layout = self.layout;
        if !layout.is_tag(i) || i >= layout.column_count() {
            return Err(WireError::malformed(PAYLOAD, format!("column {} is not a tag", i)));
        }
        if NullBitmap::is_null(self.tag_bitmap, i - layout.tag_index()) {
            return Ok(None);
        }
        if self.tag_is_var(i) {
            let offset = self.tag_offset_slot(i);
            return read_var(self.tag_var, offset).map(|(v, _)| Some(v));
        }
        let slot = self.tag_slot(i);
        let ty = layout.column(i);
        if ty.is_character() {
            let end = slot.iter().position(|&b| b == 0).unwrap_or(slot.len());
            return Ok(Some(&slot[..end]));
        }
        let width = ty.fixed_width().unwrap_or(slot.len());
        Ok(Some(&slot[..width]))
    }

    pub fn rows(&self) -> &[RowView<'a>] {
        &self.rows
    }

    /// Bytes of field column `c` in row `r`, `None` when it is NULL.
    pub fn field(&self, r: usize, c: usize) -> Result<Option<&'a [u8]>> {
        let layout = self.layout;
        let row = self
            .rows
            .get(r)
            .ok_or_else(|| WireError::malformed(PAYLOAD, format!("no row {}", r)))?;
        if c >= layout.tag_index() {
            return Err(WireError::malformed(PAYLOAD, format!("column {} is not a field", c)));
        }
        if NullBitmap::is_null(row.bitmap, c) {
            return Ok(None);
        }
        let start: usize = (0..c).map(|f| layout.row_slot_width(f)).sum();
        let width = layout.row_slot_width(c);
        let slot = &row.fixed[start..start + width];
        if layout.column(c).is_variable() {
            debug_assert_eq!(width, VAR_COLUMN_SIZE);
            return read_var(row.var, le_u64(slot, 0))
                .map(|(v, _)| Some(v))
                .map_err(|e| e.at_cell(r, c));
        }
        Ok(Some(slot))
    }
}

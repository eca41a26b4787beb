use crate::engine::codec::bitmap::NullBitmap;
use crate::engine::codec::column_type::{ColumnType, VAR_COLUMN_SIZE};
use crate::engine::errors::{Result, WireError};
use crate::protocol::parameter_description::ParameterDescriptionEx;

pub const OSN_ID_OFFSET: usize = 0;
pub const OSN_ID_SIZE: usize = 16;
pub const RANGE_GROUP_ID_OFFSET: usize = 16;
pub const PAYLOAD_VERSION_OFFSET: usize = 18;
pub const DB_ID_OFFSET: usize = 22;
pub const TABLE_ID_OFFSET: usize = 26;
pub const TS_VERSION_OFFSET: usize = 34;
pub const ROW_NUM_OFFSET: usize = 38;
pub const ROW_TYPE_OFFSET: usize = 42;
/// Fixed head region at the start of every payload.
pub const HEAD_SIZE: usize = ROW_TYPE_OFFSET + 1;

pub const PTAG_LEN_SIZE: usize = 2;
pub const ALL_TAG_LEN_SIZE: usize = 4;
pub const DATA_LEN_SIZE: usize = 4;
pub const ROW_LEN_SIZE: usize = 4;
pub const VAR_DATA_LEN_SIZE: usize = 2;

const LAYOUT: &str = "table layout";

pub fn bitmap_size(column_count: usize) -> usize {
    NullBitmap::size_for(column_count)
}

/// Start of the tag section and of the tag variable region for a header
/// beginning at `head_offset`. The tag section holds the null bitmap and one
/// `storage_len` wide slot per tag column; the variable region follows it.
pub fn var_region_start(
    ptag_len: usize,
    head_offset: usize,
    tag_index: usize,
    storage_lens: &[u32],
) -> (usize, usize) {
    let tag_start = head_offset + HEAD_SIZE + PTAG_LEN_SIZE + ptag_len + ALL_TAG_LEN_SIZE;
    let tags = storage_lens.get(tag_index..).unwrap_or(&[]);
    let fixed: usize = tags.iter().map(|&l| l as usize).sum();
    (tag_start, tag_start + bitmap_size(tags.len()) + fixed)
}

/// Fixed width of one data row over `oids`. Variable columns count as their
/// slot only.
pub fn compute_row_size(oids: &[u32], storage_lens: &[u32]) -> Result<usize> {
    if oids.len() != storage_lens.len() {
        return Err(WireError::malformed(
            LAYOUT,
            format!("{} oids but {} storage lengths", oids.len(), storage_lens.len()),
        ));
    }
    oids.iter()
        .zip(storage_lens)
        .try_fold(0usize, |acc, (&oid, &len)| {
            let ty = ColumnType::from_oid(oid).ok_or(WireError::UnsupportedType(oid))?;
            Ok(acc + ty.row_slot_width(len))
        })
}

/// Validated column layout of a prepared insert.
///
/// Columns `[0, tag_index)` are fields written once per row. Columns
/// `[tag_index, n)` are tags written once per payload header; the primary
/// tags are a subset of them and also form the payload's identity.
#[derive(Debug, Clone, PartialEq)]
pub struct TableLayout {
    columns: Vec<ColumnType>,
    storage_lens: Vec<u32>,
    tag_index: usize,
    primary_tags: Vec<usize>,
    is_primary: Vec<bool>,
    row_size: usize,
    ptag_len: usize,
}

impl TableLayout {
    pub fn new(
        oids: &[u32],
        storage_lens: &[u32],
        tag_index: usize,
        primary_tags: &[usize],
    ) -> Result<Self> {
        if oids.len() != storage_lens.len() {
            return Err(WireError::malformed(
                LAYOUT,
                format!("{} oids but {} storage lengths", oids.len(), storage_lens.len()),
            ));
        }
        let n = oids.len();
        if tag_index > n {
            return Err(WireError::malformed(
                LAYOUT,
                format!("tag index {} beyond {} columns", tag_index, n),
            ));
        }

        let mut columns = Vec::with_capacity(n);
        for &oid in oids {
            match ColumnType::from_oid(oid) {
                Some(ty) if ty.is_encodable() => columns.push(ty),
                _ => return Err(WireError::UnsupportedType(oid)),
            }
        }

        let mut is_primary = vec![false; n];
        for &p in primary_tags {
            if p < tag_index || p >= n {
                return Err(WireError::malformed(
                    LAYOUT,
                    format!("primary tag {} is not a tag column [{}, {})", p, tag_index, n),
                ));
            }
            if is_primary[p] {
                return Err(WireError::malformed(
                    LAYOUT,
                    format!("primary tag {} listed twice", p),
                ));
            }
            is_primary[p] = true;
        }

        for i in tag_index..n {
            let ty = columns[i];
            let len = storage_lens[i] as usize;
            let min = match ty.fixed_width() {
                Some(w) => w,
                None if ty.is_variable() && !is_primary[i] => VAR_COLUMN_SIZE,
                None => 1,
            };
            if len < min {
                return Err(WireError::malformed(
                    LAYOUT,
                    format!(
                        "tag column {} ({}) needs at least {} bytes, storage length is {}",
                        i,
                        ty.name(),
                        min,
                        len
                    ),
                ));
            }
        }

        let ptag_len: usize = primary_tags.iter().map(|&p| storage_lens[p] as usize).sum();
        if ptag_len > u16::MAX as usize {
            return Err(WireError::malformed(
                LAYOUT,
                format!("primary tag width {} does not fit the length field", ptag_len),
            ));
        }

        let row_size = columns[..tag_index]
            .iter()
            .zip(&storage_lens[..tag_index])
            .map(|(ty, &len)| ty.row_slot_width(len))
            .sum();

        Ok(Self {
            columns,
            storage_lens: storage_lens.to_vec(),
            tag_index,
            primary_tags: primary_tags.to_vec(),
            is_primary,
            row_size,
            ptag_len,
        })
    }

    pub fn from_description(desc: &ParameterDescriptionEx) -> Result<Self> {
        let tag_index = usize::try_from(desc.tag_index).map_err(|_| {
            WireError::malformed(
                "ParameterDescriptionEx",
                format!("negative tag index {}", desc.tag_index),
            )
        })?;
        let primary: Vec<usize> = desc.primary_tag_ids.iter().map(|&p| p as usize).collect();
        Self::new(&desc.oids, &desc.storage_lens, tag_index, &primary)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn tag_index(&self) -> usize {
        self.tag_index
    }

    pub fn column(&self, i: usize) -> ColumnType {
        self.columns[i]
    }

    pub fn columns(&self) -> &[ColumnType] {
        &self.columns
    }

    pub fn storage_len(&self, i: usize) -> u32 {
        self.storage_lens[i]
    }

    pub fn storage_lens(&self) -> &[u32] {
        &self.storage_lens
    }

    pub fn primary_tags(&self) -> &[usize] {
        &self.primary_tags
    }

    pub fn is_primary_tag(&self, i: usize) -> bool {
        self.is_primary[i]
    }

    pub fn is_tag(&self, i: usize) -> bool {
        i >= self.tag_index
    }

    /// Fixed width of one data row, bitmap and length prefix excluded.
    pub fn row_size(&self) -> usize {
        self.row_size
    }

    /// Width of the primary tag bytes in the header.
    pub fn ptag_len(&self) -> usize {
        self.ptag_len
    }

    pub fn tag_count(&self) -> usize {
        self.columns.len() - self.tag_index
    }

    /// Bitmap plus fixed tag slots; the value stored in the header's tag length.
    pub fn tag_section_len(&self) -> usize {
        let fixed: usize = self.storage_lens[self.tag_index..]
            .iter()
            .map(|&l| l as usize)
            .sum();
        bitmap_size(self.tag_count()) + fixed
    }

    /// Width of field column `i` inside a data row.
    pub fn row_slot_width(&self, i: usize) -> usize {
        self.columns[i].row_slot_width(self.storage_lens[i])
    }

    /// `(tag_start, var_start)` for a header at the start of a payload.
    pub fn header_positions(&self) -> (usize, usize) {
        var_region_start(self.ptag_len, 0, self.tag_index, &self.storage_lens)
    }
}

use std::borrow::Cow;
use std::ops::Range;

use crate::engine::codec::column_type::{ColumnType, VAR_COLUMN_SIZE};
use crate::engine::codec::layout::VAR_DATA_LEN_SIZE;
use crate::engine::errors::{Result, WireError};
use crate::shared::time::pg_micros_to_unix_millis;

/// Text cell header in result batches: `u16 LE` length.
pub const TEXT_HEADER_SIZE: usize = 2;

/// An in-memory value about to be packed into a payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellValue<'a> {
    Null,
    Int(i64),
    Float(f64),
    /// Microseconds since 2000-01-01 UTC.
    Timestamp(i64),
    Bytes(&'a [u8]),
}

impl<'a> CellValue<'a> {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            CellValue::Null => "null",
            CellValue::Int(_) => "integer",
            CellValue::Float(_) => "float",
            CellValue::Timestamp(_) => "timestamp",
            CellValue::Bytes(_) => "bytes",
        }
    }

    /// Interpret a bind argument the way the loader produces them: numbers
    /// and timestamps as 8 big-endian bytes, character data as raw bytes.
    pub fn from_bind_param(type_oid: u32, param: Option<&'a [u8]>) -> Result<Self> {
        let ty = encodable(type_oid)?;
        let Some(raw) = param else {
            return Ok(CellValue::Null);
        };
        if ty.is_character() {
            return Ok(CellValue::Bytes(raw));
        }
        let bits: [u8; 8] = raw.try_into().map_err(|_| {
            WireError::malformed(
                "Bind",
                format!("{} argument must be 8 bytes, got {}", ty.name(), raw.len()),
            )
        })?;
        Ok(match ty {
            ColumnType::Float4 | ColumnType::Float8 => {
                CellValue::Float(f64::from_bits(u64::from_be_bytes(bits)))
            }
            ColumnType::Timestamp | ColumnType::TimestampTz => {
                CellValue::Timestamp(i64::from_be_bytes(bits))
            }
            _ => CellValue::Int(i64::from_be_bytes(bits)),
        })
    }

    /// Inverse of [`CellValue::from_bind_param`].
    pub fn to_bind_param(&self, type_oid: u32) -> Result<Option<Vec<u8>>> {
        let ty = encodable(type_oid)?;
        let bytes = match (*self, ty) {
            (CellValue::Null, _) => return Ok(None),
            (CellValue::Bytes(b), t) if t.is_character() => b.to_vec(),
            (CellValue::Int(v), ColumnType::Int2 | ColumnType::Int4 | ColumnType::Int8) => {
                v.to_be_bytes().to_vec()
            }
            (CellValue::Int(v), ColumnType::Float4 | ColumnType::Float8) => {
                (v as f64).to_bits().to_be_bytes().to_vec()
            }
            (CellValue::Float(v), ColumnType::Float4 | ColumnType::Float8) => {
                v.to_bits().to_be_bytes().to_vec()
            }
            (CellValue::Timestamp(v), t) if t.is_timestamp() => v.to_be_bytes().to_vec(),
            (other, _) => return Err(mismatch(type_oid, &other)),
        };
        Ok(Some(bytes))
    }
}

fn encodable(type_oid: u32) -> Result<ColumnType> {
    match ColumnType::from_oid(type_oid) {
        Some(ty) if ty.is_encodable() => Ok(ty),
        _ => Err(WireError::UnsupportedType(type_oid)),
    }
}

fn mismatch(type_oid: u32, value: &CellValue<'_>) -> WireError {
    WireError::TypeMismatch {
        oid: type_oid,
        value: value.kind(),
    }
}

fn slot<'d>(dest: &'d mut [u8], width: usize, type_oid: u32) -> Result<&'d mut [u8]> {
    let have = dest.len();
    dest.get_mut(..width).ok_or_else(|| {
        WireError::BoundsViolation(format!(
            "slot for oid {} needs {} bytes, destination has {}",
            type_oid, width, have
        ))
    })
}

fn copy_padded(dst: &mut [u8], src: &[u8]) {
    let n = src.len().min(dst.len());
    dst[..n].copy_from_slice(&src[..n]);
    dst[n..].fill(0);
}

/// Encode one cell into `dest`.
///
/// Returns `(fixed, var)`: bytes taken in the fixed slot and bytes appended to
/// `var_region` at `var_offset`. Variable character columns outside the
/// primary tag store `var_offset` in an 8-byte slot and write `u16 LE
/// (len + 1)`, the bytes, and a NUL into the variable region. Primary tag
/// columns are always inline and `storage_len` wide.
pub fn encode_cell(
    type_oid: u32,
    value: &CellValue<'_>,
    dest: &mut [u8],
    storage_len: u32,
    var_region: &mut [u8],
    var_offset: usize,
    is_primary_tag: bool,
) -> Result<(usize, usize)> {
    let ty = encodable(type_oid)?;
    let storage = storage_len as usize;

    if value.is_null() {
        let width = if ty.is_variable() && is_primary_tag {
            storage
        } else {
            ty.row_slot_width(storage_len)
        };
        slot(dest, width, type_oid)?.fill(0);
        return Ok((width, 0));
    }

    match ty {
        ColumnType::Int2 | ColumnType::Int4 | ColumnType::Int8 => {
            let CellValue::Int(v) = *value else {
                return Err(mismatch(type_oid, value));
            };
            match ty {
                ColumnType::Int2 => {
                    let v = i16::try_from(v).map_err(|_| {
                        WireError::range("int2", format!("{} outside 16-bit range", v))
                    })?;
                    slot(dest, 2, type_oid)?.copy_from_slice(&v.to_le_bytes());
                    Ok((2, 0))
                }
                ColumnType::Int4 => {
                    let v = i32::try_from(v).map_err(|_| {
                        WireError::range("int4", format!("{} outside 32-bit range", v))
                    })?;
                    slot(dest, 4, type_oid)?.copy_from_slice(&v.to_le_bytes());
                    Ok((4, 0))
                }
                _ => {
                    slot(dest, 8, type_oid)?.copy_from_slice(&v.to_le_bytes());
                    Ok((8, 0))
                }
            }
        }
        ColumnType::Float4 | ColumnType::Float8 => {
            let v = match *value {
                CellValue::Float(f) => f,
                CellValue::Int(i) => i as f64,
                _ => return Err(mismatch(type_oid, value)),
            };
            if ty == ColumnType::Float8 {
                slot(dest, 8, type_oid)?.copy_from_slice(&v.to_le_bytes());
                return Ok((8, 0));
            }
            let narrow = v as f32;
            if v.is_finite() && !narrow.is_finite() {
                return Err(WireError::range(
                    "float4",
                    format!("{} outside single precision range", v),
                ));
            }
            slot(dest, 4, type_oid)?.copy_from_slice(&narrow.to_le_bytes());
            Ok((4, 0))
        }
        ColumnType::Timestamp | ColumnType::TimestampTz => {
            let CellValue::Timestamp(micros) = *value else {
                return Err(mismatch(type_oid, value));
            };
            let millis = pg_micros_to_unix_millis(micros);
            slot(dest, 8, type_oid)?.copy_from_slice(&millis.to_le_bytes());
            Ok((8, 0))
        }
        ColumnType::BpChar => {
            let CellValue::Bytes(bytes) = *value else {
                return Err(mismatch(type_oid, value));
            };
            copy_padded(slot(dest, storage, type_oid)?, bytes);
            Ok((storage, 0))
        }
        ColumnType::VarChar | ColumnType::Text => {
            let CellValue::Bytes(bytes) = *value else {
                return Err(mismatch(type_oid, value));
            };
            if is_primary_tag {
                // one byte stays free for the terminator
                if bytes.len() > storage.saturating_sub(1) {
                    return Err(WireError::range(
                        ty.name(),
                        format!(
                            "{} bytes do not fit a {} byte primary tag slot",
                            bytes.len(),
                            storage
                        ),
                    ));
                }
                copy_padded(slot(dest, storage, type_oid)?, bytes);
                return Ok((storage, 0));
            }
            encode_var(type_oid, ty, bytes, dest, var_region, var_offset)
        }
        ColumnType::Date => Err(WireError::UnsupportedType(type_oid)),
    }
}

fn encode_var(
    type_oid: u32,
    ty: ColumnType,
    bytes: &[u8],
    dest: &mut [u8],
    var_region: &mut [u8],
    var_offset: usize,
) -> Result<(usize, usize)> {
    let declared = u16::try_from(bytes.len() + 1).map_err(|_| {
        WireError::range(
            ty.name(),
            format!("{} bytes exceed the variable length prefix", bytes.len()),
        )
    })?;
    let used = VAR_DATA_LEN_SIZE + bytes.len() + 1;
    let region_len = var_region.len();
    let entry = var_offset
        .checked_add(used)
        .and_then(|end| var_region.get_mut(var_offset..end))
        .ok_or_else(|| {
            WireError::BoundsViolation(format!(
                "variable entry of {} bytes at {} exceeds region of {}",
                used, var_offset, region_len
            ))
        })?;
    entry[..VAR_DATA_LEN_SIZE].copy_from_slice(&declared.to_le_bytes());
    entry[VAR_DATA_LEN_SIZE..used - 1].copy_from_slice(bytes);
    entry[used - 1] = 0;

    slot(dest, VAR_COLUMN_SIZE, type_oid)?.copy_from_slice(&(var_offset as u64).to_le_bytes());
    Ok((VAR_COLUMN_SIZE, used))
}

/// Where a decoded cell's bytes live: a range of the raw cell, or a freshly
/// built buffer for the hex fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellSpan {
    Range(Range<usize>),
    Owned(Vec<u8>),
}

impl CellSpan {
    pub fn resolve<'a>(&'a self, raw: &'a [u8]) -> &'a [u8] {
        match self {
            CellSpan::Range(r) => &raw[r.clone()],
            CellSpan::Owned(v) => v,
        }
    }
}

/// Decode a result cell to the span of its value bytes.
pub fn decode_cell_span(type_oid: u32, raw: &[u8]) -> Result<CellSpan> {
    let Some(ty) = ColumnType::from_oid(type_oid) else {
        return Ok(CellSpan::Owned(hex::encode(raw).into_bytes()));
    };
    if let Some(width) = ty.fixed_width() {
        if raw.len() < width {
            return Err(WireError::malformed(
                "RowBatch",
                format!("{} cell too short: {} < {}", ty.name(), raw.len(), width),
            ));
        }
        return Ok(CellSpan::Range(0..width));
    }

    if raw.len() < TEXT_HEADER_SIZE {
        return Ok(CellSpan::Range(0..0));
    }
    let declared = u16::from_le_bytes([raw[0], raw[1]]) as usize;
    let body = &raw[TEXT_HEADER_SIZE..];
    let mut end = body.len();
    if declared > 0 {
        end = end.min(declared);
    }
    if let Some(nul) = body[..end].iter().position(|&b| b == 0) {
        end = nul;
    }
    Ok(CellSpan::Range(TEXT_HEADER_SIZE..TEXT_HEADER_SIZE + end))
}

/// Decode a result cell. Fixed-width types come back as their raw bytes,
/// character types without their header and terminator, and unknown types as
/// hex text.
pub fn decode_cell(type_oid: u32, raw: &[u8]) -> Result<Cow<'_, [u8]>> {
    Ok(match decode_cell_span(type_oid, raw)? {
        CellSpan::Range(r) => Cow::Borrowed(&raw[r]),
        CellSpan::Owned(v) => Cow::Owned(v),
    })
}

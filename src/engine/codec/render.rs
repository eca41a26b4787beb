use chrono::SecondsFormat;

use crate::engine::codec::column_type::ColumnType;
use crate::shared::time::unix_millis_to_datetime;

/// Display text for a decoded cell (the output of `decode_cell`).
///
/// Cells too short for their type, and types the codec does not model, are
/// shown as they are: hex for short fixed cells, lossy UTF-8 otherwise.
pub fn render_cell(type_oid: u32, cell: &[u8]) -> String {
    let Some(ty) = ColumnType::from_oid(type_oid) else {
        return String::from_utf8_lossy(cell).into_owned();
    };
    if ty.is_character() {
        return String::from_utf8_lossy(cell).into_owned();
    }
    let Some(width) = ty.fixed_width() else {
        return hex::encode(cell);
    };
    if cell.len() < width {
        return hex::encode(cell);
    }
    let mut b8 = [0u8; 8];
    b8[..width].copy_from_slice(&cell[..width]);

    match ty {
        ColumnType::Int2 => i16::from_le_bytes([b8[0], b8[1]]).to_string(),
        ColumnType::Int4 => i32::from_le_bytes([b8[0], b8[1], b8[2], b8[3]]).to_string(),
        ColumnType::Int8 => i64::from_le_bytes(b8).to_string(),
        ColumnType::Float4 => f32::from_le_bytes([b8[0], b8[1], b8[2], b8[3]]).to_string(),
        ColumnType::Float8 => f64::from_le_bytes(b8).to_string(),
        ColumnType::Timestamp | ColumnType::TimestampTz => {
            let millis = i64::from_le_bytes(b8);
            match unix_millis_to_datetime(millis) {
                Some(t) => t.to_rfc3339_opts(SecondsFormat::Millis, true),
                None => millis.to_string(),
            }
        }
        ColumnType::Date => {
            let millis = i64::from_le_bytes(b8);
            match unix_millis_to_datetime(millis) {
                Some(t) => t.format("%Y-%m-%d").to_string(),
                None => millis.to_string(),
            }
        }
        ColumnType::BpChar | ColumnType::VarChar | ColumnType::Text => {
            String::from_utf8_lossy(cell).into_owned()
        }
    }
}

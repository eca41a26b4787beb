use rand::Rng;
use rand::distributions::Alphanumeric;

use crate::engine::codec::cell_codec::CellValue;
use crate::engine::codec::column_type::ColumnType;

/// A cell that owns its bytes, so generated rows can outlive the generator.
#[derive(Debug, Clone, PartialEq)]
pub enum OwnedCell {
    Null,
    Int(i64),
    Float(f64),
    Timestamp(i64),
    Bytes(Vec<u8>),
}

impl OwnedCell {
    pub fn as_cell(&self) -> CellValue<'_> {
        match self {
            OwnedCell::Null => CellValue::Null,
            OwnedCell::Int(v) => CellValue::Int(*v),
            OwnedCell::Float(v) => CellValue::Float(*v),
            OwnedCell::Timestamp(v) => CellValue::Timestamp(*v),
            OwnedCell::Bytes(b) => CellValue::Bytes(b),
        }
    }

    pub fn borrow_rows(rows: &[Vec<OwnedCell>]) -> Vec<Vec<CellValue<'_>>> {
        rows.iter()
            .map(|row| row.iter().map(OwnedCell::as_cell).collect())
            .collect()
    }
}

/// Random rows for a list of column oids.
pub struct RowFactory {
    oids: Vec<u32>,
    null_ratio: f64,
    max_text: usize,
    fixed: Vec<(usize, OwnedCell)>,
}

impl RowFactory {
    pub fn new(oids: &[u32]) -> Self {
        Self {
            oids: oids.to_vec(),
            null_ratio: 0.0,
            max_text: 12,
            fixed: Vec::new(),
        }
    }

    pub fn with_null_ratio(mut self, ratio: f64) -> Self {
        self.null_ratio = ratio;
        self
    }

    pub fn with_max_text(mut self, max: usize) -> Self {
        self.max_text = max;
        self
    }

    /// Pin column `col` to `value` in every generated row.
    pub fn with_value(mut self, col: usize, value: OwnedCell) -> Self {
        self.fixed.push((col, value));
        self
    }

    pub fn create(&self) -> Vec<OwnedCell> {
        let mut rng = rand::thread_rng();
        let mut row: Vec<OwnedCell> = self
            .oids
            .iter()
            .map(|&oid| {
                if self.null_ratio > 0.0 && rng.gen_bool(self.null_ratio) {
                    OwnedCell::Null
                } else {
                    random_value(&mut rng, oid, self.max_text)
                }
            })
            .collect();
        for (col, value) in &self.fixed {
            row[*col] = value.clone();
        }
        row
    }

    pub fn create_list(&self, count: usize) -> Vec<Vec<OwnedCell>> {
        (0..count).map(|_| self.create()).collect()
    }
}

fn random_text(rng: &mut impl Rng, max: usize) -> Vec<u8> {
    let len = rng.gen_range(0..=max);
    (0..len).map(|_| rng.sample(Alphanumeric)).collect()
}

fn random_value(rng: &mut impl Rng, oid: u32, max_text: usize) -> OwnedCell {
    match ColumnType::from_oid(oid) {
        Some(ColumnType::Int2) => OwnedCell::Int(rng.r#gen::<i16>() as i64),
        Some(ColumnType::Int4) => OwnedCell::Int(rng.r#gen::<i32>() as i64),
        Some(ColumnType::Int8 | ColumnType::Date) => OwnedCell::Int(rng.r#gen::<i64>()),
        // eighths are exact in single precision
        Some(ColumnType::Float4) => {
            OwnedCell::Float(rng.gen_range(-1_000_000i32..1_000_000) as f64 / 8.0)
        }
        Some(ColumnType::Float8) => OwnedCell::Float(rng.gen_range(-1e12..1e12)),
        // whole milliseconds within a few centuries of the database epoch
        Some(ColumnType::Timestamp | ColumnType::TimestampTz) => {
            OwnedCell::Timestamp(rng.gen_range(-10_000_000_000_000i64..10_000_000_000_000) * 1_000)
        }
        Some(_) | None => OwnedCell::Bytes(random_text(rng, max_text)),
    }
}

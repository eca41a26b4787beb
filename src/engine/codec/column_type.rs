pub mod oid {
    pub const INT8: u32 = 20;
    pub const INT2: u32 = 21;
    pub const INT4: u32 = 23;
    pub const TEXT: u32 = 25;
    pub const FLOAT4: u32 = 700;
    pub const FLOAT8: u32 = 701;
    pub const BPCHAR: u32 = 1042;
    pub const VARCHAR: u32 = 1043;
    pub const DATE: u32 = 1082;
    pub const TIMESTAMP: u32 = 1114;
    pub const TIMESTAMPTZ: u32 = 1184;
}

/// Fixed slot width of a variable-length column: it holds an offset into the
/// row's variable region.
pub const VAR_COLUMN_SIZE: usize = 8;

/// Column types the codec understands, keyed by PostgreSQL OID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Int2,
    Int4,
    Int8,
    Float4,
    Float8,
    Timestamp,
    TimestampTz,
    Date,
    BpChar,
    VarChar,
    Text,
}

impl ColumnType {
    pub fn from_oid(type_oid: u32) -> Option<Self> {
        Some(match type_oid {
            oid::INT2 => ColumnType::Int2,
            oid::INT4 => ColumnType::Int4,
            oid::INT8 => ColumnType::Int8,
            oid::FLOAT4 => ColumnType::Float4,
            oid::FLOAT8 => ColumnType::Float8,
            oid::TIMESTAMP => ColumnType::Timestamp,
            oid::TIMESTAMPTZ => ColumnType::TimestampTz,
            oid::DATE => ColumnType::Date,
            oid::BPCHAR => ColumnType::BpChar,
            oid::VARCHAR => ColumnType::VarChar,
            oid::TEXT => ColumnType::Text,
            _ => return None,
        })
    }

    pub fn oid(self) -> u32 {
        match self {
            ColumnType::Int2 => oid::INT2,
            ColumnType::Int4 => oid::INT4,
            ColumnType::Int8 => oid::INT8,
            ColumnType::Float4 => oid::FLOAT4,
            ColumnType::Float8 => oid::FLOAT8,
            ColumnType::Timestamp => oid::TIMESTAMP,
            ColumnType::TimestampTz => oid::TIMESTAMPTZ,
            ColumnType::Date => oid::DATE,
            ColumnType::BpChar => oid::BPCHAR,
            ColumnType::VarChar => oid::VARCHAR,
            ColumnType::Text => oid::TEXT,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ColumnType::Int2 => "int2",
            ColumnType::Int4 => "int4",
            ColumnType::Int8 => "int8",
            ColumnType::Float4 => "float4",
            ColumnType::Float8 => "float8",
            ColumnType::Timestamp => "timestamp",
            ColumnType::TimestampTz => "timestamptz",
            ColumnType::Date => "date",
            ColumnType::BpChar => "bpchar",
            ColumnType::VarChar => "varchar",
            ColumnType::Text => "text",
        }
    }

    /// Natural byte width of fixed-width types; `None` for character types.
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            ColumnType::Int2 => Some(2),
            ColumnType::Int4 | ColumnType::Float4 => Some(4),
            ColumnType::Int8
            | ColumnType::Float8
            | ColumnType::Timestamp
            | ColumnType::TimestampTz
            | ColumnType::Date => Some(8),
            ColumnType::BpChar | ColumnType::VarChar | ColumnType::Text => None,
        }
    }

    /// Stored out of line in a variable region unless used as a primary tag.
    pub fn is_variable(self) -> bool {
        matches!(self, ColumnType::VarChar | ColumnType::Text)
    }

    pub fn is_character(self) -> bool {
        matches!(
            self,
            ColumnType::BpChar | ColumnType::VarChar | ColumnType::Text
        )
    }

    pub fn is_timestamp(self) -> bool {
        matches!(self, ColumnType::Timestamp | ColumnType::TimestampTz)
    }

    /// Whether rows of this type can be packed. `date` is decode-only.
    pub fn is_encodable(self) -> bool {
        !matches!(self, ColumnType::Date)
    }

    /// Width of this column's slot inside a data row.
    pub fn row_slot_width(self, storage_len: u32) -> usize {
        match self.fixed_width() {
            Some(w) => w,
            None if self.is_variable() => VAR_COLUMN_SIZE,
            None => storage_len as usize,
        }
    }
}

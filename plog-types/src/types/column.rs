use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Converts a 1-based column ordinal to its 0-based slot index. Ordinal 0 is the
/// virtual/system column and has no slot.
pub fn column_index(ordinal: u32) -> Option<usize> {
    (ordinal as usize).checked_sub(1)
}

/// Inverse of [`column_index`].
pub fn column_ordinal(index: usize) -> u32 {
    index as u32 + 1
}

/// Oracle column data types the decoder knows about.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnDataType {
    Number,
    Float,
    BinaryFloat,
    BinaryDouble,
    Char,
    Varchar,
    NChar,
    NVarchar,
    Raw,
    LongRaw,
    Clob,
    NClob,
    Blob,
    Date,
    Timestamp,
    TimestampTz,
    TimestampLtz,
    IntervalDs,
    IntervalYm,
    /// Stands in for a column no entry has described yet.
    Unknown,
    Unsupported(String),
}

impl ColumnDataType {
    /// Maps a base type name (without precision/scale) onto a data type.
    pub fn from_name(name: &str) -> Self {
        let name = name.trim().to_ascii_uppercase();
        match name.as_str() {
            "NUMBER" | "INTEGER" | "INT" | "SMALLINT" | "DECIMAL" | "NUMERIC" => {
                ColumnDataType::Number
            }
            "FLOAT" => ColumnDataType::Float,
            "BINARY_FLOAT" => ColumnDataType::BinaryFloat,
            "BINARY_DOUBLE" => ColumnDataType::BinaryDouble,
            "CHAR" => ColumnDataType::Char,
            "VARCHAR2" | "VARCHAR" | "LONG" => ColumnDataType::Varchar,
            "NCHAR" => ColumnDataType::NChar,
            "NVARCHAR2" => ColumnDataType::NVarchar,
            "RAW" => ColumnDataType::Raw,
            "LONG RAW" => ColumnDataType::LongRaw,
            "CLOB" => ColumnDataType::Clob,
            "NCLOB" => ColumnDataType::NClob,
            "BLOB" => ColumnDataType::Blob,
            "DATE" => ColumnDataType::Date,
            "TIMESTAMP" => ColumnDataType::Timestamp,
            "TIMESTAMP WITH TIME ZONE" => ColumnDataType::TimestampTz,
            "TIMESTAMP WITH LOCAL TIME ZONE" => ColumnDataType::TimestampLtz,
            "INTERVAL DAY TO SECOND" => ColumnDataType::IntervalDs,
            "INTERVAL YEAR TO MONTH" => ColumnDataType::IntervalYm,
            _ => ColumnDataType::Unsupported(name),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ColumnDataType::Number => "NUMBER",
            ColumnDataType::Float => "FLOAT",
            ColumnDataType::BinaryFloat => "BINARY_FLOAT",
            ColumnDataType::BinaryDouble => "BINARY_DOUBLE",
            ColumnDataType::Char => "CHAR",
            ColumnDataType::Varchar => "VARCHAR2",
            ColumnDataType::NChar => "NCHAR",
            ColumnDataType::NVarchar => "NVARCHAR2",
            ColumnDataType::Raw => "RAW",
            ColumnDataType::LongRaw => "LONG RAW",
            ColumnDataType::Clob => "CLOB",
            ColumnDataType::NClob => "NCLOB",
            ColumnDataType::Blob => "BLOB",
            ColumnDataType::Date => "DATE",
            ColumnDataType::Timestamp => "TIMESTAMP",
            ColumnDataType::TimestampTz => "TIMESTAMP WITH TIME ZONE",
            ColumnDataType::TimestampLtz => "TIMESTAMP WITH LOCAL TIME ZONE",
            ColumnDataType::IntervalDs => "INTERVAL DAY TO SECOND",
            ColumnDataType::IntervalYm => "INTERVAL YEAR TO MONTH",
            ColumnDataType::Unknown => "UNKNOWN",
            ColumnDataType::Unsupported(name) => name,
        }
    }

    pub fn is_lob(&self) -> bool {
        matches!(
            self,
            ColumnDataType::Clob | ColumnDataType::NClob | ColumnDataType::Blob
        )
    }

    /// National character types, stored with a two byte character width.
    pub fn is_wide(&self) -> bool {
        matches!(
            self,
            ColumnDataType::NChar | ColumnDataType::NVarchar | ColumnDataType::NClob
        )
    }
}

impl Display for ColumnDataType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Dictionary entry for a single column.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// 1-based ordinal.
    pub id: u32,
    pub name: String,
    pub data_type: ColumnDataType,
    pub precision: i32,
    pub scale: i32,
    pub nullable: bool,
    pub is_key: bool,
}

impl Column {
    pub fn new(id: u32, name: impl Into<String>, data_type: ColumnDataType) -> Self {
        Self {
            id,
            name: name.into(),
            data_type,
            precision: 0,
            scale: 0,
            nullable: true,
            is_key: false,
        }
    }

    /// Nullable slot for an ordinal skipped by inline column definitions.
    pub fn placeholder(id: u32) -> Self {
        Self::new(id, "", ColumnDataType::Unknown)
    }

    pub fn is_placeholder(&self) -> bool {
        self.data_type == ColumnDataType::Unknown
    }

    /// Two versions of a column are compatible iff their signatures are equal.
    pub fn signature(&self) -> (&str, &ColumnDataType) {
        (&self.name, &self.data_type)
    }

    /// Type as it would appear in a DDL statement, e.g. `NUMBER(4,0)`.
    pub fn type_spec(&self) -> String {
        match self.data_type {
            ColumnDataType::Number if self.precision > 0 => {
                format!("NUMBER({},{})", self.precision, self.scale)
            }
            ColumnDataType::Char
            | ColumnDataType::Varchar
            | ColumnDataType::NChar
            | ColumnDataType::NVarchar
            | ColumnDataType::Raw
            | ColumnDataType::Float
                if self.precision > 0 =>
            {
                format!("{}({})", self.data_type, self.precision)
            }
            _ => self.data_type.name().to_string(),
        }
    }
}

/// Compact dictionary entry: just enough to decode a record that omits column metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub id: u32,
    pub owner: String,
    pub name: String,
    /// Ordered by ordinal, `columns[i].id == i + 1`.
    pub columns: Vec<Column>,
    pub has_key: bool,
}

impl Table {
    pub fn new(
        id: u32,
        owner: impl Into<String>,
        name: impl Into<String>,
        columns: Vec<Column>,
    ) -> Self {
        let has_key = columns.iter().any(|column| column.is_key);
        Self {
            id,
            owner: owner.into(),
            name: name.into(),
            columns,
            has_key,
        }
    }

    pub fn qualified_name(&self) -> String {
        qualified_name(&self.owner, &self.name)
    }

    pub fn column(&self, ordinal: u32) -> Option<&Column> {
        column_index(ordinal).and_then(|index| self.columns.get(index))
    }

    pub fn has_lob_columns(&self) -> bool {
        self.columns.iter().any(|column| column.data_type.is_lob())
    }
}

/// Full schema definition of a table, valid from `valid_since` on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDocument {
    pub owner: String,
    pub name: String,
    pub object_id: Option<u32>,
    /// Ordered by ordinal, `columns[i].id == i + 1`.
    pub columns: Vec<Column>,
    /// SCN from which this version is valid.
    pub valid_since: u64,
    /// Older document formats do not carry key flags.
    pub has_key_flags: bool,
}

impl SchemaDocument {
    pub fn qualified_name(&self) -> String {
        qualified_name(&self.owner, &self.name)
    }

    /// The compact dictionary view, when the document names its object id.
    pub fn to_table(&self) -> Option<Table> {
        self.object_id
            .map(|id| Table::new(id, &self.owner, &self.name, self.columns.clone()))
    }
}

pub fn qualified_name(owner: &str, name: &str) -> String {
    format!("{owner}.{name}")
}

mod aggregate;
mod error;
mod loader;
mod ops;

use std::{
    collections::HashMap,
    fmt::{Display, Formatter},
    hash::BuildHasher,
    io,
};

use indexmap::{IndexMap, IndexSet};
use ordered_float::OrderedFloat;
use serde::Serialize;

pub use self::{
    aggregate::{Aggregated, Aggregation, ColumnStats},
    error::Error,
    loader::{Delimiter, LoadOptions},
    ops::{BinaryOp, Reduction},
};

/// Single cell value.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Number(f64),
    Text(String),
    Null,
}

impl Scalar {
    /// Interpret a raw cell: empty is null, anything parsing as a float is a number.
    pub fn parse(cell: &str) -> Self {
        if cell.is_empty() {
            Self::Null
        } else if let Ok(number) = cell.parse() {
            Self::Number(number)
        } else {
            Self::Text(cell.to_owned())
        }
    }

    #[must_use]
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(number) => Some(*number),
            _ => None,
        }
    }
}

impl From<f64> for Scalar {
    fn from(number: f64) -> Self {
        Self::Number(number)
    }
}

impl From<&str> for Scalar {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<Option<f64>> for Scalar {
    fn from(number: Option<f64>) -> Self {
        number.map_or(Self::Null, Self::Number)
    }
}

impl Display for Scalar {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(number) => Display::fmt(number, f),
            Self::Text(text) => f.write_str(text),
            Self::Null => Ok(()),
        }
    }
}

/// Typed grouping key, nulls never form a group.
///
/// Numbers sort before text, numerically. A number never equals a text, even when displayed the
/// same, and negative zero is the same key as zero.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize)]
#[serde(untagged)]
pub enum GroupKey {
    Number(OrderedFloat<f64>),
    Text(String),
}

impl GroupKey {
    #[must_use]
    pub fn new(scalar: &Scalar) -> Option<Self> {
        match scalar {
            // Adding the positive zero turns the negative zero into the positive one:
            Scalar::Number(number) => Some(Self::Number(OrderedFloat(*number + 0.0))),
            Scalar::Text(text) => Some(Self::Text(text.clone())),
            Scalar::Null => None,
        }
    }
}

impl Display for GroupKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(number) => Display::fmt(&number.0, f),
            Self::Text(text) => f.write_str(text),
        }
    }
}

impl From<GroupKey> for Scalar {
    fn from(key: GroupKey) -> Self {
        match key {
            GroupKey::Number(number) => Self::Number(number.0),
            GroupKey::Text(text) => Self::Text(text),
        }
    }
}

/// Anything that resolves column names to cells.
pub trait Record {
    fn field(&self, name: &str) -> Option<&Scalar>;
}

impl<S: BuildHasher> Record for HashMap<String, Scalar, S> {
    fn field(&self, name: &str) -> Option<&Scalar> {
        self.get(name)
    }
}

impl<S: BuildHasher> Record for IndexMap<String, Scalar, S> {
    fn field(&self, name: &str) -> Option<&Scalar> {
        self.get(name)
    }
}

/// In-memory rows sharing the same named columns.
#[derive(Clone, Debug, Default)]
#[must_use]
pub struct Table {
    columns: IndexSet<String>,
    rows: Vec<Vec<Scalar>>,
}

/// Borrowed view of a single table row.
#[derive(Copy, Clone)]
pub struct Row<'a> {
    columns: &'a IndexSet<String>,
    cells: &'a [Scalar],
}

impl Record for Row<'_> {
    fn field(&self, name: &str) -> Option<&Scalar> {
        self.columns.get_index_of(name).and_then(|index| self.cells.get(index))
    }
}

impl Table {
    /// Build the table from validated column names, every row must have a cell per column.
    pub fn new(columns: IndexSet<String>, rows: Vec<Vec<Scalar>>) -> Self {
        debug_assert!(rows.iter().all(|row| row.len() == columns.len()));
        Self { columns, rows }
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(|cells| Row { columns: &self.columns, cells })
    }

    pub fn column_index(&self, name: &str) -> Result<usize, Error> {
        self.columns.get_index_of(name).ok_or_else(|| Error::UnknownColumn(name.to_owned()))
    }

    pub fn column(&self, name: &str) -> Result<impl Iterator<Item = &Scalar>, Error> {
        let index = self.column_index(name)?;
        Ok(self.rows.iter().map(move |row| &row[index]))
    }

    /// Numeric cells of the column, skipping text and nulls.
    pub fn numbers(&self, name: &str) -> Result<impl Iterator<Item = f64>, Error> {
        Ok(self.column(name)?.filter_map(Scalar::as_number))
    }

    /// Append a column, one cell per row.
    pub fn push_column(&mut self, name: String, cells: Vec<Scalar>) -> Result<(), Error> {
        if self.columns.contains(&name) {
            return Err(Error::DuplicateColumnName(name));
        }
        debug_assert_eq!(cells.len(), self.rows.len());
        self.columns.insert(name);
        for (row, cell) in self.rows.iter_mut().zip(cells) {
            row.push(cell);
        }
        Ok(())
    }

    /// Write the table with a header line.
    pub fn write_csv<W: io::Write>(&self, writer: W, delimiter: Delimiter) -> Result<(), Error> {
        let mut writer =
            csv::WriterBuilder::new().delimiter(delimiter.as_byte()).from_writer(writer);
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(ToString::to_string))?;
        }
        writer.flush().map_err(csv::Error::from)?;
        Ok(())
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    /// Build a table from literal columns and rows.
    pub fn table<const N: usize>(columns: [&str; N], rows: Vec<[Scalar; N]>) -> Table {
        Table::new(
            columns.into_iter().map(str::to_owned).collect(),
            rows.into_iter().map(Vec::from).collect(),
        )
    }

    #[test]
    fn test_parse_scalar() {
        assert_eq!(Scalar::parse("42"), Scalar::Number(42.0));
        assert_eq!(Scalar::parse("-1.5"), Scalar::Number(-1.5));
        assert_eq!(Scalar::parse("SP"), Scalar::Text("SP".to_owned()));
        assert_eq!(Scalar::parse(""), Scalar::Null);
    }

    #[test]
    fn test_display_scalar() {
        assert_eq!(Scalar::Number(3.0).to_string(), "3");
        assert_eq!(Scalar::Number(0.5).to_string(), "0.5");
        assert_eq!(Scalar::Null.to_string(), "");
    }

    #[test]
    fn test_row_fields() {
        let table = table(["time", "type"], vec![[10.0.into(), "SP".into()]]);
        let row = table.rows().next().unwrap();
        assert_eq!(row.field("type"), Some(&Scalar::from("SP")));
        assert_eq!(row.field("missing"), None);
    }

    #[test]
    fn test_group_key() {
        assert_eq!(GroupKey::new(&Scalar::Number(-0.0)), GroupKey::new(&Scalar::Number(0.0)));
        assert_eq!(GroupKey::new(&Scalar::Number(-0.0)).unwrap().to_string(), "0");
        assert_ne!(GroupKey::new(&Scalar::Number(1.0)), GroupKey::new(&Scalar::from("1")));
        assert_eq!(GroupKey::new(&Scalar::Null), None);
    }

    #[test]
    fn test_hash_map_record() {
        let record = HashMap::from([("time".to_owned(), Scalar::Number(5.0))]);
        assert_eq!(record.field("time"), Some(&Scalar::Number(5.0)));
        assert_eq!(record.field("size"), None);
    }

    #[test]
    fn test_push_duplicate_column() {
        let mut table = table(["time"], vec![[1.0.into()]]);
        assert!(matches!(
            table.push_column("time".to_owned(), vec![Scalar::Null]),
            Err(Error::DuplicateColumnName(_)),
        ));
    }

    #[test]
    fn test_write_csv() {
        let table =
            table(["time", "size"], vec![[0.0.into(), 2.0.into()], [30.5.into(), Scalar::Null]]);
        let mut output = Vec::new();
        table.write_csv(&mut output, Delimiter::Semicolon).unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "time;size\n0;2\n30.5;\n");
    }
}

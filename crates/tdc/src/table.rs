//! Column-oriented PSM/peptide tables
//!
//! The core never mutates a caller's [`Table`]: every operation either reads
//! from it or returns a new one.

use crate::{Error, Result};
use fnv::FnvHashMap;

#[derive(Clone, Debug, PartialEq)]
pub enum Column {
    Text(Vec<String>),
    Float(Vec<f64>),
    Int(Vec<i64>),
    Bool(Vec<bool>),
}

/// Hashable view of a single cell, used for group-by
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
enum Key<'a> {
    Text(&'a str),
    Float(u64),
    Int(i64),
    Bool(bool),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Text(v) => v.len(),
            Column::Float(v) => v.len(),
            Column::Int(v) => v.len(),
            Column::Bool(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, Column::Text(_))
    }

    /// Numeric value of a cell; booleans become 0.0 or 1.0
    pub fn f64(&self, row: usize) -> Option<f64> {
        match self {
            Column::Text(_) => None,
            Column::Float(v) => v.get(row).copied(),
            Column::Int(v) => v.get(row).map(|&x| x as f64),
            Column::Bool(v) => v.get(row).map(|&x| x as u8 as f64),
        }
    }

    /// Boolean value of a cell; any non-zero number is `true`
    pub fn bool(&self, row: usize) -> Option<bool> {
        match self {
            Column::Bool(v) => v.get(row).copied(),
            _ => self.f64(row).map(|x| x != 0.0),
        }
    }

    pub fn text(&self, row: usize) -> Option<&str> {
        match self {
            Column::Text(v) => v.get(row).map(String::as_str),
            _ => None,
        }
    }

    fn key(&self, row: usize) -> Key<'_> {
        match self {
            Column::Text(v) => Key::Text(&v[row]),
            // Fold -0.0 into 0.0 so that equal values group together
            Column::Float(v) => Key::Float((v[row] + 0.0).to_bits()),
            Column::Int(v) => Key::Int(v[row]),
            Column::Bool(v) => Key::Bool(v[row]),
        }
    }

    fn take(&self, rows: &[usize]) -> Column {
        match self {
            Column::Text(v) => Column::Text(rows.iter().map(|&r| v[r].clone()).collect()),
            Column::Float(v) => Column::Float(rows.iter().map(|&r| v[r]).collect()),
            Column::Int(v) => Column::Int(rows.iter().map(|&r| v[r]).collect()),
            Column::Bool(v) => Column::Bool(rows.iter().map(|&r| v[r]).collect()),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    names: Vec<String>,
    columns: Vec<Column>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`Table::insert`]
    pub fn with_column<S: Into<String>>(mut self, name: S, column: Column) -> Result<Self> {
        self.insert(name, column)?;
        Ok(self)
    }

    /// Add a column, replacing any existing column with the same name.
    /// All columns must have the same number of rows.
    pub fn insert<S: Into<String>>(&mut self, name: S, column: Column) -> Result<()> {
        let name = name.into();
        if let Some(first) = self.columns.first() {
            if first.len() != column.len() {
                return Err(Error::ColumnLength {
                    column: name,
                    expected: first.len(),
                    found: column.len(),
                });
            }
        }
        match self.names.iter().position(|n| *n == name) {
            Some(ix) => self.columns[ix] = column,
            None => {
                self.names.push(name);
                self.columns.push(column);
            }
        }
        Ok(())
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Column names, in insertion order
    pub fn columns(&self) -> &[String] {
        &self.names
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|ix| &self.columns[ix])
    }

    pub fn get(&self, name: &str) -> Result<&Column> {
        self.column(name)
            .ok_or_else(|| Error::MissingColumns(vec![name.into()]))
    }

    /// Check that every named column exists, reporting all missing names at once
    pub fn require<S: AsRef<str>>(&self, names: &[S]) -> Result<()> {
        let missing = names
            .iter()
            .map(|name| name.as_ref())
            .filter(|name| self.column(name).is_none())
            .map(String::from)
            .collect::<Vec<_>>();
        match missing.is_empty() {
            true => Ok(()),
            false => Err(Error::MissingColumns(missing)),
        }
    }

    pub fn numeric(&self, name: &str) -> Result<Vec<f64>> {
        let column = self.get(name)?;
        (0..column.len())
            .map(|row| column.f64(row))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| Error::ColumnType {
                column: name.into(),
                expected: "numeric",
            })
    }

    pub fn boolean(&self, name: &str) -> Result<Vec<bool>> {
        let column = self.get(name)?;
        (0..column.len())
            .map(|row| column.bool(row))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| Error::ColumnType {
                column: name.into(),
                expected: "boolean or numeric",
            })
    }

    pub fn text(&self, name: &str) -> Result<Vec<&str>> {
        let column = self.get(name)?;
        (0..column.len())
            .map(|row| column.text(row))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| Error::ColumnType {
                column: name.into(),
                expected: "text",
            })
    }

    /// Row indices grouped by the values of the `by` columns. Groups are
    /// returned in order of first appearance, rows within a group in table
    /// order.
    pub fn group_indices<S: AsRef<str>>(&self, by: &[S]) -> Result<Vec<Vec<usize>>> {
        self.require(by)?;
        let columns = by
            .iter()
            .filter_map(|name| self.column(name.as_ref()))
            .collect::<Vec<_>>();

        let mut lookup: FnvHashMap<Vec<Key<'_>>, usize> = FnvHashMap::default();
        let mut groups: Vec<Vec<usize>> = Vec::new();
        for row in 0..self.len() {
            let key = columns.iter().map(|c| c.key(row)).collect::<Vec<_>>();
            let next = groups.len();
            let ix = *lookup.entry(key).or_insert(next);
            if ix == next {
                groups.push(Vec::new());
            }
            groups[ix].push(row);
        }
        Ok(groups)
    }

    /// A new table holding `rows`, in the given order
    pub fn take(&self, rows: &[usize]) -> Table {
        Table {
            names: self.names.clone(),
            columns: self.columns.iter().map(|c| c.take(rows)).collect(),
        }
    }
}

/// Indices of the row holding the maximum `value` for each distinct key.
///
/// Rows are stably sorted by `(key, value)` and the last row of every key is
/// kept, so among tied values the row appearing later in the input wins.
/// Indices are returned in key order.
pub fn groupby_max<K: Ord>(keys: &[K], values: &[f64]) -> Vec<usize> {
    let mut order = (0..keys.len().min(values.len())).collect::<Vec<_>>();
    order.sort_by(|&a, &b| {
        keys[a]
            .cmp(&keys[b])
            .then_with(|| values[a].total_cmp(&values[b]))
    });

    let mut keep: Vec<usize> = Vec::new();
    for ix in order {
        let n = keep.len();
        if n > 0 && keys[keep[n - 1]] == keys[ix] {
            keep[n - 1] = ix;
        } else {
            keep.push(ix);
        }
    }
    keep
}

#[cfg(test)]
mod test {
    use super::*;

    fn table() -> Table {
        Table::new()
            .with_column(
                "file",
                Column::Text(vec!["a".into(), "a".into(), "b".into(), "a".into()]),
            )
            .and_then(|t| t.with_column("scan", Column::Int(vec![1, 2, 1, 1])))
            .and_then(|t| t.with_column("score", Column::Float(vec![0.5, -1.0, 2.0, 3.0])))
            .and_then(|t| t.with_column("target", Column::Bool(vec![true, false, true, true])))
            .unwrap()
    }

    #[test]
    fn columns_and_types() {
        let t = table();
        assert_eq!(t.len(), 4);
        assert_eq!(t.columns(), &["file", "scan", "score", "target"]);
        assert_eq!(t.numeric("scan").unwrap(), vec![1.0, 2.0, 1.0, 1.0]);
        assert_eq!(t.boolean("score").unwrap(), vec![true, true, true, true]);
        assert_eq!(t.numeric("target").unwrap(), vec![1.0, 0.0, 1.0, 1.0]);
        assert!(matches!(
            t.numeric("file"),
            Err(Error::ColumnType { .. })
        ));
    }

    #[test]
    fn missing_columns_are_all_reported() {
        let t = table();
        match t.require(&["file", "peptide", "proteins"]) {
            Err(Error::MissingColumns(cols)) => assert_eq!(cols, vec!["peptide", "proteins"]),
            _ => panic!("expected missing columns"),
        }
    }

    #[test]
    fn length_checked() {
        let t = table();
        assert!(matches!(
            t.with_column("x", Column::Float(vec![1.0])),
            Err(Error::ColumnLength {
                expected: 4,
                found: 1,
                ..
            })
        ));
    }

    #[test]
    fn grouping() {
        let t = table();
        assert_eq!(
            t.group_indices(&["file", "scan"]).unwrap(),
            vec![vec![0, 3], vec![1], vec![2]]
        );
        assert_eq!(
            t.group_indices(&["scan"]).unwrap(),
            vec![vec![0, 2, 3], vec![1]]
        );
    }

    #[test]
    fn take_rows() {
        let t = table().take(&[3, 0]);
        assert_eq!(t.len(), 2);
        assert_eq!(t.numeric("score").unwrap(), vec![3.0, 0.5]);
        assert_eq!(t.text("file").unwrap(), vec!["a", "a"]);
    }

    #[test]
    fn max_per_group() {
        let keys = ["b", "a", "b", "a", "c"];
        let values = [1.0, 5.0, 3.0, 5.0, -1.0];
        // Tie between rows 1 and 3: the later row wins
        assert_eq!(groupby_max(&keys, &values), vec![3, 2, 4]);
    }
}

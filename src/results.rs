use std::collections::HashMap;
use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::types::RowValues;

/// A row from a database result, built once per row event.
///
/// Column order is the order the server reported; column names are shared
/// by every row of the same result.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// The column names for this row (shared across all rows in a result)
    pub column_names: Arc<Vec<String>>,
    /// The values for this row, positionally aligned with `column_names`
    pub values: Vec<RowValues>,
    column_index_cache: Arc<HashMap<String, usize>>,
}

impl Row {
    /// Create a new row.
    ///
    /// Missing trailing values are padded with `RowValues::Null`; surplus
    /// values beyond the column list are dropped.
    #[must_use]
    pub fn new(column_names: Arc<Vec<String>>, mut values: Vec<RowValues>) -> Self {
        values.resize(column_names.len(), RowValues::Null);
        let cache = Arc::new(
            column_names
                .iter()
                .enumerate()
                .map(|(i, name)| (name.clone(), i))
                .collect::<HashMap<_, _>>(),
        );
        Self {
            column_names,
            values,
            column_index_cache: cache,
        }
    }

    /// Convenience constructor for hand-built rows.
    #[must_use]
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, RowValues)>,
        S: Into<String>,
    {
        let (names, values): (Vec<String>, Vec<RowValues>) =
            pairs.into_iter().map(|(k, v)| (k.into(), v)).unzip();
        Self::new(Arc::new(names), values)
    }

    /// Get the index of a column by name
    #[must_use]
    pub fn get_column_index(&self, column_name: &str) -> Option<usize> {
        self.column_index_cache.get(column_name).copied()
    }

    /// Get a value from the row by column name
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&RowValues> {
        self.get_column_index(column_name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Get a value from the row by column index
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&RowValues> {
        self.values.get(index)
    }

    /// Iterate `(column, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RowValues)> {
        self.column_names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (column, value) in self.iter() {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_name_and_index() {
        let row = Row::from_pairs([
            ("id", RowValues::Int(4)),
            ("titulo", RowValues::Text("Foo".into())),
        ]);
        assert_eq!(row.get("titulo"), Some(&RowValues::Text("Foo".into())));
        assert_eq!(row.get_by_index(0), Some(&RowValues::Int(4)));
        assert_eq!(row.get("missing"), None);
    }

    #[test]
    fn short_value_lists_are_padded() {
        let row = Row::new(Arc::new(vec!["a".into(), "b".into()]), vec![RowValues::Int(1)]);
        assert_eq!(row.get("b"), Some(&RowValues::Null));
        assert_eq!(row.len(), 2);
    }

    #[test]
    fn serializes_as_ordered_object() {
        let row = Row::from_pairs([
            ("titulo", RowValues::Text("Foo".into())),
            ("stock", RowValues::Int(5)),
            ("editorial", RowValues::Null),
        ]);
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"titulo":"Foo","stock":5,"editorial":null}"#);
    }
}

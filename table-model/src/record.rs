//! FILENAME: table-model/src/record.rs
//! PURPOSE: The original business record underlying every leaf row.
//! CONTEXT: Records are built once by the caller and shared by reference
//! (`Rc<Record>`) across every row derived from them; the engine never
//! copies or mutates record data.

use serde::{Deserialize, Serialize};
use rustc_hash::FxHashMap;

use crate::value::DataValue;

/// One flat record: field name to value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    fields: FxHashMap<String, DataValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a record from (field, value) pairs.
    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, DataValue)>,
        K: Into<String>,
    {
        let mut record = Record::new();
        for (field, value) in pairs {
            record.fields.insert(field.into(), value);
        }
        record
    }

    pub fn set(&mut self, field: impl Into<String>, value: DataValue) {
        self.fields.insert(field.into(), value);
    }

    pub fn get(&self, field: &str) -> Option<&DataValue> {
        self.fields.get(field)
    }

    /// Returns the field's value, or `Empty` when the field is absent.
    pub fn value_or_empty(&self, field: &str) -> DataValue {
        self.fields.get(field).cloned().unwrap_or(DataValue::Empty)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

//! FILENAME: table-model/src/value.rs
//! PURPOSE: Dynamic cell values and their normalized, hashable key form.
//! CONTEXT: `DataValue` is what accessors produce and aggregations consume.
//! `KeyValue` is the normalized representation used to decide which bucket
//! a row belongs to. Partition equality is computed on raw typed values,
//! never on their string serialization. The string form of a `KeyValue`
//! only feeds synthesized row ids.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

// ============================================================================
// DATA VALUE
// ============================================================================

/// A dynamically typed value held by one field of one record, or produced
/// by an accessor or aggregation function.
///
/// `List` exists for aggregations whose result is inherently composite
/// (`unique` collects distinct values, `extent` a min/max pair).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DataValue {
    Empty,
    Number(f64),
    Text(String),
    Boolean(bool),
    List(Vec<DataValue>),
}

impl DataValue {
    /// Returns the numeric content, or None for non-numbers.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            DataValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, DataValue::Empty)
    }
}

impl Default for DataValue {
    fn default() -> Self {
        DataValue::Empty
    }
}

impl From<f64> for DataValue {
    fn from(n: f64) -> Self {
        DataValue::Number(n)
    }
}

impl From<i64> for DataValue {
    fn from(n: i64) -> Self {
        DataValue::Number(n as f64)
    }
}

impl From<&str> for DataValue {
    fn from(s: &str) -> Self {
        DataValue::Text(s.to_string())
    }
}

impl From<String> for DataValue {
    fn from(s: String) -> Self {
        DataValue::Text(s)
    }
}

impl From<bool> for DataValue {
    fn from(b: bool) -> Self {
        DataValue::Boolean(b)
    }
}

impl fmt::Display for DataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataValue::Empty => Ok(()),
            DataValue::Number(n) => write_number(f, *n),
            DataValue::Text(s) => f.write_str(s),
            DataValue::Boolean(b) => f.write_str(if *b { "true" } else { "false" }),
            DataValue::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
        }
    }
}

/// Formats a number without unnecessary decimal places.
fn write_number(f: &mut fmt::Formatter<'_>, n: f64) -> fmt::Result {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        write!(f, "{:.0}", n)
    } else {
        write!(f, "{}", n)
    }
}

// ============================================================================
// ORDERED FLOAT
// ============================================================================

/// Wrapper around f64 that implements Eq and Hash for use as HashMap keys.
/// NaN values are treated as equal to each other.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OrderedFloat(pub f64);

impl PartialEq for OrderedFloat {
    fn eq(&self, other: &Self) -> bool {
        if self.0.is_nan() && other.0.is_nan() {
            true
        } else {
            self.0 == other.0
        }
    }
}

impl Eq for OrderedFloat {}

impl std::hash::Hash for OrderedFloat {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        if self.0.is_nan() {
            // All NaN values hash to the same thing
            u64::MAX.hash(state);
        } else {
            self.0.to_bits().hash(state);
        }
    }
}

impl OrderedFloat {
    pub fn as_f64(&self) -> f64 {
        self.0
    }
}

// ============================================================================
// KEY VALUE
// ============================================================================

/// A normalized, hashable representation of a `DataValue`.
/// Used as a partition key while grouping: two rows land in the same
/// bucket iff their `KeyValue`s are equal. A number and its textual
/// rendering stay distinct here even though they stringify identically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyValue {
    Empty,
    Number(OrderedFloat),
    Text(String),
    Boolean(bool),
    List(Vec<KeyValue>),
}

impl From<&DataValue> for KeyValue {
    fn from(value: &DataValue) -> Self {
        match value {
            DataValue::Empty => KeyValue::Empty,
            DataValue::Number(n) => KeyValue::Number(OrderedFloat(*n)),
            DataValue::Text(s) => KeyValue::Text(s.clone()),
            DataValue::Boolean(b) => KeyValue::Boolean(*b),
            DataValue::List(items) => KeyValue::List(items.iter().map(KeyValue::from).collect()),
        }
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Empty => Ok(()),
            KeyValue::Number(n) => write_number(f, n.0),
            KeyValue::Text(s) => f.write_str(s),
            KeyValue::Boolean(b) => f.write_str(if *b { "true" } else { "false" }),
            KeyValue::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
        }
    }
}

// ============================================================================
// GROUP PATH
// ============================================================================

/// The ordered key values from the outermost grouping level down to one
/// group, forming its collision-free composite identity. Synthesized string ids
/// can collide when two distinct values stringify identically; the path
/// never does.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GroupPath(SmallVec<[KeyValue; 4]>);

impl GroupPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of this path extended by one more level.
    pub fn child(&self, key: KeyValue) -> Self {
        let mut values = self.0.clone();
        values.push(key);
        GroupPath(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn values(&self) -> &[KeyValue] {
        &self.0
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    fn hash_of<T: Hash>(value: &T) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_ordered_float_nan_equality() {
        let a = OrderedFloat(f64::NAN);
        let b = OrderedFloat(f64::NAN);
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn test_ordered_float_distinguishes_values() {
        assert_ne!(OrderedFloat(1.0), OrderedFloat(2.0));
        assert_eq!(OrderedFloat(1.0), OrderedFloat(1.0));
    }

    #[test]
    fn test_key_value_keeps_types_apart() {
        // Both display as "1", but they are different buckets.
        let number = KeyValue::from(&DataValue::Number(1.0));
        let text = KeyValue::from(&DataValue::Text("1".to_string()));
        assert_ne!(number, text);
        assert_eq!(format!("{}", number), format!("{}", text));
    }

    #[test]
    fn test_number_display_trims_integers() {
        assert_eq!(format!("{}", DataValue::Number(42.0)), "42");
        assert_eq!(format!("{}", DataValue::Number(1.5)), "1.5");
    }

    #[test]
    fn test_display_forms() {
        assert_eq!(format!("{}", DataValue::Empty), "");
        assert_eq!(format!("{}", DataValue::Boolean(true)), "true");
        assert_eq!(
            format!(
                "{}",
                DataValue::List(vec![DataValue::from(1.0), DataValue::from("a")])
            ),
            "1, a"
        );
    }

    #[test]
    fn test_as_number() {
        assert_eq!(DataValue::Number(3.0).as_number(), Some(3.0));
        assert_eq!(DataValue::Text("3".to_string()).as_number(), None);
        assert_eq!(DataValue::Empty.as_number(), None);
    }

    #[test]
    fn test_group_path_child() {
        let root = GroupPath::new();
        let a = root.child(KeyValue::Text("A".to_string()));
        let ax = a.child(KeyValue::Number(OrderedFloat(1.0)));
        assert_eq!(a.len(), 1);
        assert_eq!(ax.len(), 2);
        assert_ne!(a, ax);
        // Sibling paths with the same leading value stay distinct.
        let ay = a.child(KeyValue::Number(OrderedFloat(2.0)));
        assert_ne!(ax, ay);
    }

    #[test]
    fn test_data_value_serde_round_trip() {
        let value = DataValue::List(vec![
            DataValue::Empty,
            DataValue::Number(2.5),
            DataValue::Text("x".to_string()),
            DataValue::Boolean(false),
        ]);
        let json = serde_json::to_string(&value).unwrap();
        let back: DataValue = serde_json::from_str(&json).unwrap();
        assert_eq!(value, back);
    }
}

//! Feature properties: reading typed values and interning new ones.
//!
//! MVT features store properties as pairs of indices into the layer's `keys`
//! and `values` tables.

use std::collections::HashMap;

use crate::aqi::AqiError;
use crate::reading::Concentration;
use crate::vector_tile::tile::{Feature, Value};

pub fn string_value(s: impl Into<String>) -> Value {
    Value {
        string_value: Some(s.into()),
        ..Default::default()
    }
}

pub fn double_value(v: f64) -> Value {
    Value {
        double_value: Some(v),
        ..Default::default()
    }
}

pub fn uint_value(v: u64) -> Value {
    Value {
        uint_value: Some(v),
        ..Default::default()
    }
}

/// Validates a tile property into a concentration.
///
/// Numeric variants and numeric strings are accepted; booleans and empty
/// values are not.
pub fn concentration_from_value(value: &Value) -> Result<Concentration, AqiError> {
    if let Some(v) = value.double_value {
        return Concentration::new(v);
    }
    if let Some(v) = value.float_value {
        return Concentration::new(f64::from(v));
    }
    if let Some(v) = value.uint_value {
        return Concentration::new(v as f64);
    }
    if let Some(v) = value.int_value.or(value.sint_value) {
        return Concentration::new(v as f64);
    }
    if let Some(s) = &value.string_value {
        return Concentration::parse(s);
    }
    if value.bool_value.is_some() {
        return Err(AqiError::invalid("boolean is not a concentration"));
    }
    Err(AqiError::invalid("property has no value"))
}

/// Looks up the value of property `name` on a feature.
pub fn feature_property<'a>(
    feature: &Feature,
    keys: &[String],
    values: &'a [Value],
    name: &str,
) -> Option<&'a Value> {
    feature.tags.chunks_exact(2).find_map(|pair| {
        let key = keys.get(pair[0] as usize)?;
        if key == name {
            values.get(pair[1] as usize)
        } else {
            None
        }
    })
}

/// Hashable identity of a [`Value`], floats compared bitwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ValueKey {
    String(String),
    Float(u32),
    Double(u64),
    Int(i64),
    Uint(u64),
    Sint(i64),
    Bool(bool),
}

impl ValueKey {
    fn of(value: &Value) -> Option<Self> {
        if let Some(s) = &value.string_value {
            Some(ValueKey::String(s.clone()))
        } else if let Some(v) = value.float_value {
            Some(ValueKey::Float(v.to_bits()))
        } else if let Some(v) = value.double_value {
            Some(ValueKey::Double(v.to_bits()))
        } else if let Some(v) = value.int_value {
            Some(ValueKey::Int(v))
        } else if let Some(v) = value.uint_value {
            Some(ValueKey::Uint(v))
        } else if let Some(v) = value.sint_value {
            Some(ValueKey::Sint(v))
        } else {
            value.bool_value.map(ValueKey::Bool)
        }
    }
}

/// Deduplicating index over a layer's `keys` and `values` tables.
///
/// The tables themselves are passed in on every call so callers can keep
/// borrowing the layer's features at the same time.
#[derive(Debug, Default)]
pub struct TagTable {
    keys: HashMap<String, u32>,
    values: HashMap<ValueKey, u32>,
}

impl TagTable {
    /// Indexes the existing tables; first occurrence wins on duplicates.
    pub fn from_layer(keys: &[String], values: &[Value]) -> Self {
        let mut table = TagTable::default();
        for (i, key) in keys.iter().enumerate() {
            table.keys.entry(key.clone()).or_insert(i as u32);
        }
        for (i, value) in values.iter().enumerate() {
            if let Some(k) = ValueKey::of(value) {
                table.values.entry(k).or_insert(i as u32);
            }
        }
        table
    }

    pub fn key(&mut self, keys: &mut Vec<String>, name: &str) -> u32 {
        if let Some(&index) = self.keys.get(name) {
            return index;
        }
        let index = keys.len() as u32;
        keys.push(name.to_string());
        self.keys.insert(name.to_string(), index);
        index
    }

    pub fn value(&mut self, values: &mut Vec<Value>, value: Value) -> u32 {
        let Some(k) = ValueKey::of(&value) else {
            // Empty values are never shared.
            values.push(value);
            return (values.len() - 1) as u32;
        };
        if let Some(&index) = self.values.get(&k) {
            return index;
        }
        let index = values.len() as u32;
        values.push(value);
        self.values.insert(k, index);
        index
    }
}

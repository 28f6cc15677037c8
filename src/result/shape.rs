//! Response set shapes
//!
//! A call can answer with one result, an ordered list of results (batch of a
//! list of commands), or a keyed map of results (batch of named commands).
//! `Shape` keeps that distinction explicit so normalization can transform the
//! elements without losing the caller's layout.

use serde_json::Value;

/// Envelope keys that mark a JSON object as a single response
const ENVELOPE_KEYS: [&str; 4] = ["result", "error", "next", "total"];

/// Single, list, or keyed container
#[derive(Debug, Clone, PartialEq)]
pub enum Shape<T> {
    /// One element
    Single(T),
    /// Ordered elements
    List(Vec<T>),
    /// Keyed elements, in the order the keys were given
    Map(Vec<(String, T)>),
}

impl<T> Shape<T> {
    /// Number of elements
    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::List(items) => items.len(),
            Self::Map(entries) => entries.len(),
        }
    }

    /// Whether there are no elements (only possible for empty list or map)
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_single(&self) -> bool {
        matches!(self, Self::Single(_))
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }

    pub fn is_map(&self) -> bool {
        matches!(self, Self::Map(_))
    }

    /// Transform every element, keeping the shape
    pub fn map<U, F>(self, mut f: F) -> Shape<U>
    where
        F: FnMut(T) -> U,
    {
        match self {
            Self::Single(item) => Shape::Single(f(item)),
            Self::List(items) => Shape::List(items.into_iter().map(f).collect()),
            Self::Map(entries) => Shape::Map(entries.into_iter().map(|(k, v)| (k, f(v))).collect()),
        }
    }

    /// Transform every element with a fallible function, stopping at the first error
    pub fn try_map<U, E, F>(self, mut f: F) -> Result<Shape<U>, E>
    where
        F: FnMut(T) -> Result<U, E>,
    {
        Ok(match self {
            Self::Single(item) => Shape::Single(f(item)?),
            Self::List(items) => Shape::List(items.into_iter().map(f).collect::<Result<_, _>>()?),
            Self::Map(entries) => Shape::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| f(v).map(|v| (k, v)))
                    .collect::<Result<_, _>>()?,
            ),
        })
    }

    /// Iterate over elements in order
    pub fn iter(&self) -> Box<dyn Iterator<Item = &T> + '_> {
        match self {
            Self::Single(item) => Box::new(std::iter::once(item)),
            Self::List(items) => Box::new(items.iter()),
            Self::Map(entries) => Box::new(entries.iter().map(|(_, v)| v)),
        }
    }

    /// Look up an element by key (maps) or by decimal index (lists)
    pub fn get(&self, key: &str) -> Option<&T> {
        match self {
            Self::Single(_) => None,
            Self::List(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
            Self::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
        }
    }

    /// The element, if this is `Single`
    pub fn into_single(self) -> Option<T> {
        match self {
            Self::Single(item) => Some(item),
            _ => None,
        }
    }

    /// All elements in order, discarding keys
    pub fn into_values(self) -> Vec<T> {
        match self {
            Self::Single(item) => vec![item],
            Self::List(items) => items,
            Self::Map(entries) => entries.into_iter().map(|(_, v)| v).collect(),
        }
    }
}

impl Shape<Value> {
    /// Classify a free-form JSON response.
    ///
    /// Arrays become `List`. Objects carrying any envelope key (`result`,
    /// `error`, `next`, `total`) are a `Single` response; other objects are a
    /// `Map` of responses. Any other value is `Single`.
    pub fn classify(value: Value) -> Self {
        match value {
            Value::Array(items) => Self::List(items),
            Value::Object(map) if ENVELOPE_KEYS.iter().any(|k| map.contains_key(*k)) => {
                Self::Single(Value::Object(map))
            }
            Value::Object(map) => Self::Map(map.into_iter().collect()),
            other => Self::Single(other),
        }
    }
}

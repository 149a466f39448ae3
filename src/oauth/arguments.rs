//! Ordered multi-valued request fields (grant types, scopes, response types).

use serde::{Deserialize, Serialize};
use std::fmt;

/// An ordered sequence of strings.
///
/// Used for every multi-valued OAuth parameter. Order is preserved as parsed,
/// duplicates are kept so that `exact` can reject `grant_type=password password`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Arguments(Vec<String>);

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Split a space-delimited parameter such as `scope` or `response_type`.
    pub fn from_space_delimited(value: &str) -> Self {
        Self(value.split_whitespace().map(str::to_string).collect())
    }

    /// True if every given value is present.
    pub fn has(&self, values: &[&str]) -> bool {
        values.iter().all(|v| self.0.iter().any(|a| a == v))
    }

    /// True if at least one of the given values is present.
    pub fn has_one_of(&self, values: &[&str]) -> bool {
        values.iter().any(|v| self.0.iter().any(|a| a == v))
    }

    /// True only for a single-element sequence equal to `value`.
    pub fn exact(&self, value: &str) -> bool {
        self.0.len() == 1 && self.0[0] == value
    }

    /// True if both sequences hold the same values, ignoring order.
    pub fn matches(&self, values: &[&str]) -> bool {
        self.0.len() == values.len() && self.has(values)
    }

    /// Append `value` unless it is already present.
    pub fn append(&mut self, value: impl Into<String>) {
        let value = value.into();
        if !self.0.contains(&value) {
            self.0.push(value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Space-joined form used on the wire.
    pub fn to_space_delimited(&self) -> String {
        self.0.join(" ")
    }
}

impl fmt::Display for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_space_delimited())
    }
}

impl<S: Into<String>> FromIterator<S> for Arguments {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl From<Vec<String>> for Arguments {
    fn from(values: Vec<String>) -> Self {
        Self(values)
    }
}

impl From<&[&str]> for Arguments {
    fn from(values: &[&str]) -> Self {
        values.iter().copied().collect()
    }
}

#![forbid(unsafe_code)]

//! `Labels`: the L0 layer. A finite ordered sequence of [`LabelValue`]s
//! with position-preserving operations only — no notion of a name or a
//! uniqueness invariant. Those live one layer up, in `cubes-axis`, where
//! the Index/Series distinction decides whether lookups go through a
//! memoized hash map or a linear scan.

use std::cell::OnceCell;
use std::collections::HashMap;

use cubes_types::LabelValue;

fn detect_duplicates(values: &[LabelValue]) -> bool {
    let mut seen = HashMap::<&LabelValue, ()>::with_capacity(values.len());
    for value in values {
        if seen.insert(value, ()).is_some() {
            return true;
        }
    }
    false
}

#[derive(Debug, Clone)]
pub struct Labels {
    values: Vec<LabelValue>,
    duplicate_cache: OnceCell<bool>,
}

impl PartialEq for Labels {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl Eq for Labels {}

impl Labels {
    #[must_use]
    pub fn new(values: Vec<LabelValue>) -> Self {
        Self {
            values,
            duplicate_cache: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn values(&self) -> &[LabelValue] {
        &self.values
    }

    #[must_use]
    pub fn has_duplicates(&self) -> bool {
        *self
            .duplicate_cache
            .get_or_init(|| detect_duplicates(&self.values))
    }

    /// Linear-scan membership, used by `Series` axes, which have no
    /// memoized lookup table.
    #[must_use]
    pub fn position_linear(&self, needle: &LabelValue) -> Option<usize> {
        self.values.iter().position(|v| v == needle)
    }

    #[must_use]
    pub fn contains(&self, needle: &LabelValue) -> bool {
        self.position_linear(needle).is_some()
    }

    /// First-occurrence position map, used by `Index` axes for hash lookup.
    /// Always safe to build even over a vector with duplicates; callers on
    /// an `Index` axis are expected to have already checked uniqueness.
    #[must_use]
    pub fn position_map_first(&self) -> HashMap<&LabelValue, usize> {
        let mut positions = HashMap::with_capacity(self.values.len());
        for (idx, value) in self.values.iter().enumerate() {
            positions.entry(value).or_insert(idx);
        }
        positions
    }

    /// Selects positions in the given order, producing a new `Labels`.
    #[must_use]
    pub fn take(&self, positions: &[usize]) -> Self {
        Self::new(
            positions
                .iter()
                .map(|&idx| self.values[idx].clone())
                .collect(),
        )
    }
}

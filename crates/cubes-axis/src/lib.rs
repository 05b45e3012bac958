#![forbid(unsafe_code)]

//! `Axis`: the L1 layer. A named [`Labels`] vector tagged with a kind that
//! decides the lookup strategy: `Index` memoizes a hash map on first
//! lookup (lazy, single-threaded init), `Series` always falls back to a
//! linear scan.

use std::cell::OnceCell;
use std::collections::{HashMap, HashSet};

use cubes_labels::Labels;
use cubes_types::LabelValue;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AxisKind {
    Index,
    Series,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AxisError {
    #[error("label {label} not found on axis {axis:?}")]
    LabelNotFound { axis: String, label: String },
    #[error("axis {axis:?} would acquire a duplicate label {label} under its Index invariant")]
    UniquenessViolation { axis: String, label: String },
}

#[derive(Debug)]
pub struct Axis {
    name: String,
    kind: AxisKind,
    labels: Labels,
    index_cache: OnceCell<HashMap<LabelValue, usize>>,
}

impl Clone for Axis {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            kind: self.kind,
            labels: self.labels.clone(),
            index_cache: self.index_cache.clone(),
        }
    }
}

impl PartialEq for Axis {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.kind == other.kind && self.labels == other.labels
    }
}

impl Eq for Axis {}

impl Axis {
    /// `name` must be non-empty; this is a construction contract enforced
    /// the way slice bounds are, not a recoverable `Result` case.
    pub fn new(name: impl Into<String>, kind: AxisKind, labels: Labels) -> Result<Self, AxisError> {
        let name = name.into();
        debug_assert!(!name.is_empty(), "axis name must be non-empty");

        if matches!(kind, AxisKind::Index) && labels.has_duplicates() {
            return Err(AxisError::UniquenessViolation {
                axis: name,
                label: "<multiple>".to_owned(),
            });
        }

        Ok(Self {
            name,
            kind,
            labels,
            index_cache: OnceCell::new(),
        })
    }

    #[must_use]
    pub fn index(name: impl Into<String>, labels: Vec<LabelValue>) -> Result<Self, AxisError> {
        Self::new(name, AxisKind::Index, Labels::new(labels))
    }

    #[must_use]
    pub fn series(name: impl Into<String>, labels: Vec<LabelValue>) -> Self {
        Self::new(name, AxisKind::Series, Labels::new(labels))
            .expect("Series construction never violates uniqueness")
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> AxisKind {
        self.kind
    }

    #[must_use]
    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    #[must_use]
    pub fn length(&self) -> usize {
        self.labels.len()
    }

    fn hash_index(&self) -> &HashMap<LabelValue, usize> {
        self.index_cache.get_or_init(|| {
            self.labels
                .position_map_first()
                .into_iter()
                .map(|(label, pos)| (label.clone(), pos))
                .collect()
        })
    }

    /// A single lookup. Well-defined (unique answer) on `Index`; on
    /// `Series` this is the first-occurrence position, the same answer
    /// `positions` would give for a one-element query.
    pub fn indexof(&self, label: &LabelValue) -> Result<usize, AxisError> {
        let found = match self.kind {
            AxisKind::Index => self.hash_index().get(label).copied(),
            AxisKind::Series => self.labels.position_linear(label),
        };
        found.ok_or_else(|| AxisError::LabelNotFound {
            axis: self.name.clone(),
            label: label.to_string(),
        })
    }

    pub fn positions(&self, query: &[LabelValue]) -> Result<Vec<usize>, AxisError> {
        query.iter().map(|label| self.indexof(label)).collect()
    }

    /// Positions whose label is in `query`, preserving this axis's own
    /// order. Does not fail on a query label absent from this axis — that
    /// check belongs to the `Cube`-level `filter` op.
    #[must_use]
    pub fn filter(&self, query: &[LabelValue]) -> (Self, Vec<usize>) {
        let wanted: HashSet<&LabelValue> = query.iter().collect();
        let positions: Vec<usize> = self
            .labels
            .values()
            .iter()
            .enumerate()
            .filter_map(|(idx, label)| wanted.contains(label).then_some(idx))
            .collect();

        let axis = Self::new(self.name.clone(), self.kind, self.labels.take(&positions))
            .expect("filtering a subset of an Index axis cannot introduce duplicates");
        (axis, positions)
    }

    /// Selects `positions` in the given order. Preserves this axis's kind
    /// unless doing so would introduce a duplicate label into an `Index`
    /// axis, in which case it fails — callers that want the permissive
    /// "demote to Series" behaviour use [`Self::take_or_demote`] instead.
    pub fn take(&self, positions: &[usize]) -> Result<Self, AxisError> {
        Self::new(self.name.clone(), self.kind, self.labels.take(positions))
    }

    /// Cube-level `take`/`filter`/`compress` never fail on duplication: an
    /// `Index` axis that would acquire a duplicate is demoted to `Series`
    /// instead.
    #[must_use]
    pub fn take_or_demote(&self, positions: &[usize]) -> Self {
        let labels = self.labels.take(positions);
        if matches!(self.kind, AxisKind::Index) && labels.has_duplicates() {
            return Self::new(self.name.clone(), AxisKind::Series, labels)
                .expect("Series never fails uniqueness");
        }
        Self::new(self.name.clone(), self.kind, labels)
            .expect("kind unchanged, already validated duplicate-free above")
    }

    pub fn compress(&self, mask: &[bool]) -> Result<Self, AxisError> {
        debug_assert_eq!(mask.len(), self.length(), "mask length must match axis length");
        let positions: Vec<usize> = mask
            .iter()
            .enumerate()
            .filter_map(|(idx, &keep)| keep.then_some(idx))
            .collect();
        self.take(&positions)
    }
}

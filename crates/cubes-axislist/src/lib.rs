#![forbid(unsafe_code)]

//! `AxisList`: the L2 layer. An ordered sequence of axes whose names are
//! pairwise distinct. Length is the rank of the associated cube.

use std::collections::HashSet;

use cubes_axis::Axis;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AxisListError {
    #[error("duplicate axis name {0:?} in AxisList")]
    DuplicateAxis(String),
    #[error("axis {0:?} not found")]
    AxisNotFound(String),
    #[error("transpose order is not a complete, unique permutation of the axes")]
    InvalidPermutation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AxisList {
    axes: Vec<Axis>,
}

impl AxisList {
    pub fn new(axes: Vec<Axis>) -> Result<Self, AxisListError> {
        let mut seen = HashSet::with_capacity(axes.len());
        for axis in &axes {
            if !seen.insert(axis.name().to_owned()) {
                return Err(AxisListError::DuplicateAxis(axis.name().to_owned()));
            }
        }
        Ok(Self { axes })
    }

    #[must_use]
    pub fn empty() -> Self {
        Self { axes: Vec::new() }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.axes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.axes.is_empty()
    }

    #[must_use]
    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    #[must_use]
    pub fn find(&self, name: &str) -> Option<usize> {
        self.axes.iter().position(|axis| axis.name() == name)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Axis> {
        self.find(name).map(|pos| &self.axes[pos])
    }

    pub fn axis_at(&self, pos: usize) -> Option<&Axis> {
        self.axes.get(pos)
    }

    /// Appends `axis` at the end. Rejects a duplicate name.
    pub fn insert(&self, axis: Axis) -> Result<Self, AxisListError> {
        if self.find(axis.name()).is_some() {
            return Err(AxisListError::DuplicateAxis(axis.name().to_owned()));
        }
        let mut axes = self.axes.clone();
        axes.push(axis);
        Ok(Self { axes })
    }

    /// Removes the named axis, if present. A no-op (returns an identical
    /// list) when the name is absent.
    #[must_use]
    pub fn remove(&self, name: &str) -> Self {
        Self {
            axes: self
                .axes
                .iter()
                .filter(|axis| axis.name() != name)
                .cloned()
                .collect(),
        }
    }

    /// Permutes the axis list by the given index order. `order` must be a
    /// complete permutation of `0..len()`.
    pub fn transpose(&self, order: &[usize]) -> Result<Self, AxisListError> {
        if order.len() != self.axes.len() {
            return Err(AxisListError::InvalidPermutation);
        }
        let mut seen = vec![false; self.axes.len()];
        for &pos in order {
            match seen.get_mut(pos) {
                Some(slot) if !*slot => *slot = true,
                _ => return Err(AxisListError::InvalidPermutation),
            }
        }

        Ok(Self {
            axes: order.iter().map(|&pos| self.axes[pos].clone()).collect(),
        })
    }
}

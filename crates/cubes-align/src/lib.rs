#![forbid(unsafe_code)]

//! The Aligner: the L4 layer, the central algorithm of the library. A pure
//! function of two `AxisList`s that computes the output axis order and,
//! per operand, a shaping plan the kernel (`cubes-kernel`) can apply
//! mechanically. Planning is deliberately separate from execution — an
//! `AlignPlan` is small, pure, and trivially testable on its own.

use cubes_axis::{Axis, AxisError, AxisKind};
use cubes_axislist::{AxisList, AxisListError};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AlignError {
    #[error("axis {name:?} is incompatible between operands: {reason}")]
    IncompatibleAxes { name: String, reason: String },
    #[error(transparent)]
    AxisList(#[from] AxisListError),
    #[error(transparent)]
    Axis(#[from] AxisError),
}

/// Where one output position's data comes from, for one operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AxisSlot {
    /// This output axis is one of the operand's own axes, at
    /// `original_axis` in the operand's own `AxisList`. `gather`, if
    /// present, is a per-position reindex to apply along that axis
    /// before shaping.
    Own {
        original_axis: usize,
        gather: Option<Vec<usize>>,
    },
    /// The operand has no axis of this name; a length-1 dimension is
    /// inserted here to enable broadcasting.
    Broadcast,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperandPlan {
    pub slots: Vec<AxisSlot>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlignPlan {
    pub out_axes: AxisList,
    pub left: OperandPlan,
    pub right: OperandPlan,
}

/// Pairwise resolution result for one matched `(a, b)` axis.
struct Resolution {
    resolved: Axis,
    left_gather: Option<Vec<usize>>,
    right_gather: Option<Vec<usize>>,
}

fn resolve_pair(a: &Axis, b: &Axis) -> Result<Resolution, AlignError> {
    let name = a.name().to_owned();
    let incompatible = |reason: &str| AlignError::IncompatibleAxes {
        name: name.clone(),
        reason: reason.to_owned(),
    };

    let resolution = match (a.kind(), b.kind()) {
        (AxisKind::Index, AxisKind::Index) => {
            if a.length() != b.length() {
                return Err(incompatible(
                    "Index/Index pairing requires the same multiset of labels",
                ));
            }
            let right_gather = b
                .positions(a.labels().values())
                .map_err(|_| incompatible("Index/Index pairing requires the same multiset of labels"))?;
            Resolution {
                resolved: a.clone(),
                left_gather: None,
                right_gather: Some(right_gather),
            }
        }
        (AxisKind::Index, AxisKind::Series) => {
            let left_gather = a.positions(b.labels().values()).map_err(|_| {
                incompatible("labels of the Series operand must be a subset of the Index operand's labels")
            })?;
            Resolution {
                resolved: b.clone(),
                left_gather: Some(left_gather),
                right_gather: None,
            }
        }
        (AxisKind::Series, AxisKind::Index) => {
            let right_gather = b.positions(a.labels().values()).map_err(|_| {
                incompatible("labels of the Series operand must be a subset of the Index operand's labels")
            })?;
            Resolution {
                resolved: a.clone(),
                left_gather: None,
                right_gather: Some(right_gather),
            }
        }
        (AxisKind::Series, AxisKind::Series) => {
            if a.labels().values() != b.labels().values() {
                return Err(incompatible(
                    "Series/Series pairing requires the same label sequence in the same order",
                ));
            }
            Resolution {
                resolved: a.clone(),
                left_gather: None,
                right_gather: None,
            }
        }
    };

    #[cfg(feature = "tracing")]
    tracing::debug!(
        axis = %name,
        left_kind = ?a.kind(),
        right_kind = ?b.kind(),
        "resolved paired axis"
    );

    Ok(resolution)
}

/// Computes the alignment plan for two operand `AxisList`s.
pub fn align(left: &AxisList, right: &AxisList) -> Result<AlignPlan, AlignError> {
    let mut out_axes = Vec::with_capacity(left.len() + right.len());
    let mut left_slots = Vec::with_capacity(left.len() + right.len());
    let mut right_slots = Vec::with_capacity(left.len() + right.len());
    let mut right_matched = vec![false; right.len()];

    // Step 1 + 2 + 3: walk A in order, resolving paired axes and carrying
    // unique-to-A axes through as-is.
    for (left_pos, a) in left.axes().iter().enumerate() {
        match right.find(a.name()) {
            Some(right_pos) => {
                right_matched[right_pos] = true;
                let b = right.axis_at(right_pos).expect("position from find()");
                let resolution = resolve_pair(a, b)?;
                out_axes.push(resolution.resolved);
                left_slots.push(AxisSlot::Own {
                    original_axis: left_pos,
                    gather: resolution.left_gather,
                });
                right_slots.push(AxisSlot::Own {
                    original_axis: right_pos,
                    gather: resolution.right_gather,
                });
            }
            None => {
                out_axes.push(a.clone());
                left_slots.push(AxisSlot::Own {
                    original_axis: left_pos,
                    gather: None,
                });
                right_slots.push(AxisSlot::Broadcast);
            }
        }
    }

    // Every axis of B not already paired is unique-to-B, appended in B's order.
    for (right_pos, b) in right.axes().iter().enumerate() {
        if right_matched[right_pos] {
            continue;
        }
        out_axes.push(b.clone());
        left_slots.push(AxisSlot::Broadcast);
        right_slots.push(AxisSlot::Own {
            original_axis: right_pos,
            gather: None,
        });
    }

    let out_axes = AxisList::new(out_axes)?;

    Ok(AlignPlan {
        out_axes,
        left: OperandPlan { slots: left_slots },
        right: OperandPlan { slots: right_slots },
    })
}

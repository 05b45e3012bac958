#![forbid(unsafe_code)]

//! The Kernel: the L5 layer. Consumes the `AlignPlan` produced by
//! `cubes-align` and realizes it against real tensors: gather, permute,
//! insert broadcast dimensions, then hand both operands — now same-rank
//! and shape-compatible — to a binary elementwise closure.

use cubes_align::{AlignError, AlignPlan, AxisSlot, OperandPlan, align};
use cubes_core::{Cube, CubeError};
use ndarray::{ArrayD, Axis as NdAxis};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum KernelError {
    #[error(transparent)]
    Align(#[from] AlignError),
    #[error(transparent)]
    Cube(#[from] CubeError),
    #[error("bare-tensor operand shape {raw_shape:?} is not broadcast-compatible with {cube_shape:?}")]
    ShapeMismatch {
        cube_shape: Vec<usize>,
        raw_shape: Vec<usize>,
    },
}

/// Shapes one operand's tensor according to its half of the plan: gather
/// first (indices are into the *original*, unshaped tensor), then permute
/// the operand's own axes into their output-relative order, then insert
/// length-1 dimensions at every position the other operand owns
/// exclusively.
fn shape_operand(tensor: &ArrayD<f64>, plan: &OperandPlan) -> ArrayD<f64> {
    let mut tensor = tensor.clone();

    for slot in &plan.slots {
        if let AxisSlot::Own {
            original_axis,
            gather: Some(indices),
        } = slot
        {
            #[cfg(feature = "tracing")]
            tracing::trace!(axis = original_axis, len = indices.len(), "gather");
            tensor = tensor.select(NdAxis(*original_axis), indices);
        }
    }

    let perm: Vec<usize> = plan
        .slots
        .iter()
        .filter_map(|slot| match slot {
            AxisSlot::Own { original_axis, .. } => Some(*original_axis),
            AxisSlot::Broadcast => None,
        })
        .collect();
    #[cfg(feature = "tracing")]
    tracing::trace!(?perm, "transpose");
    tensor = tensor.permuted_axes(perm);

    for (position, slot) in plan.slots.iter().enumerate() {
        if matches!(slot, AxisSlot::Broadcast) {
            #[cfg(feature = "tracing")]
            tracing::trace!(position, "insert broadcast dimension");
            tensor = tensor.insert_axis(NdAxis(position));
        }
    }

    tensor
}

/// Applies `op` elementwise to two cubes, aligning and broadcasting their
/// axes first.
pub fn apply_binary(
    left: &Cube,
    right: &Cube,
    op: impl Fn(f64, f64) -> f64,
) -> Result<Cube, KernelError> {
    let plan: AlignPlan = align(left.axes(), right.axes())?;

    let shaped_left = shape_operand(left.values(), &plan.left);
    let shaped_right = shape_operand(right.values(), &plan.right);

    let out_shape: Vec<usize> = plan
        .out_axes
        .axes()
        .iter()
        .map(cubes_axis::Axis::length)
        .collect();

    let left_view = shaped_left
        .broadcast(out_shape.clone())
        .expect("own-axis dims already match out_shape; broadcast dims are 1");
    let right_view = shaped_right
        .broadcast(out_shape)
        .expect("own-axis dims already match out_shape; broadcast dims are 1");

    let result = ndarray::Zip::from(left_view)
        .and(right_view)
        .map_collect(|&l, &r| op(l, r));

    Ok(Cube::new(plan.out_axes, result)?)
}

/// Applies `op` between a cube and a true scalar, preserving the cube's
/// `AxisList`. A scalar is a degenerate rank-0 cube and this path never
/// goes through the Aligner.
pub fn apply_scalar(cube: &Cube, scalar: f64, op: impl Fn(f64, f64) -> f64) -> Cube {
    let result = cube.values().mapv(|v| op(v, scalar));
    Cube::new(cube.axes().clone(), result).expect("mapv preserves shape")
}

/// Applies `op` between a cube and a bare, axis-less tensor. Alignment is
/// bypassed entirely; only the tensor engine's own broadcast rules decide
/// compatibility, and the left cube's `AxisList` is kept as-is.
pub fn apply_raw(cube: &Cube, raw: &ArrayD<f64>, op: impl Fn(f64, f64) -> f64) -> Result<Cube, KernelError> {
    let cube_shape = cube.shape().to_vec();
    let raw_broadcast = raw
        .broadcast(cube_shape.clone())
        .ok_or_else(|| KernelError::ShapeMismatch {
            cube_shape: cube_shape.clone(),
            raw_shape: raw.shape().to_vec(),
        })?;

    let result = ndarray::Zip::from(cube.values())
        .and(raw_broadcast)
        .map_collect(|&l, &r| op(l, r));

    Ok(Cube::new(cube.axes().clone(), result)?)
}

#![forbid(unsafe_code)]
#![doc = include_str!("../../../README.md")]

//! The public facade: re-exports the full surface from the underlying
//! layered crates so a caller depends on one crate, `cubes`, instead of
//! the nine it's built from.

pub use cubes_align::{align, AlignError, AlignPlan, AxisSlot, OperandPlan};
pub use cubes_axis::{Axis, AxisError, AxisKind};
pub use cubes_axislist::{AxisList, AxisListError};
pub use cubes_core::{Cube, CubeError};
pub use cubes_kernel::{apply_binary, apply_raw, apply_scalar, KernelError};
pub use cubes_labels::Labels;
pub use cubes_ops::{
    abs, add, add_raw, add_scalar, all, any, compress, cos, div, div_scalar, elementwise_eq,
    elementwise_ne, exp, filter, ge, group, gt, le, ln, lt, max, mean, min, mul, mul_raw,
    mul_scalar, neg, reduce_axes, reduce_keep, sin, sqrt, sub, sub_scalar, sum, tan, take,
    transpose, GroupReducer, OpsError, TransposeOrder,
};
pub use cubes_types::{Dtype, LabelValue};

/// Re-exports the dense tensor crate `Cube` is built on, for callers who
/// need to construct raw tensors to hand to [`Cube::new`] or the
/// bare-tensor operations ([`add_raw`], [`mul_raw`]).
pub use ndarray;

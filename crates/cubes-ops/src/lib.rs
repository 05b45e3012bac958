#![forbid(unsafe_code)]

//! The L6 layer: the public surface built on top of the Kernel and the
//! Aligner. Arithmetic and comparison operators, unary numeric functions,
//! reductions, grouping, filtering, and transpose — all expressed as
//! ordinary functions over `Cube`, plus a handful of operator-overload
//! conveniences for the arithmetic operators.

use std::collections::HashMap;

use cubes_align::AlignError;
use cubes_axis::{Axis, AxisError};
use cubes_axislist::{AxisList, AxisListError};
use cubes_core::{Cube, CubeError};
use cubes_kernel::{apply_binary, apply_raw, apply_scalar, KernelError};
use cubes_types::LabelValue;
use ndarray::{Array, ArrayD, Axis as NdAxis};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum OpsError {
    #[error(transparent)]
    Kernel(#[from] KernelError),
    #[error(transparent)]
    Align(#[from] AlignError),
    #[error(transparent)]
    Cube(#[from] CubeError),
    #[error(transparent)]
    Axis(#[from] AxisError),
    #[error(transparent)]
    AxisList(#[from] AxisListError),
}

// ---------------------------------------------------------------------
// Arithmetic and comparison
// ---------------------------------------------------------------------

pub fn add(left: &Cube, right: &Cube) -> Result<Cube, OpsError> {
    Ok(apply_binary(left, right, |l, r| l + r)?)
}

pub fn sub(left: &Cube, right: &Cube) -> Result<Cube, OpsError> {
    Ok(apply_binary(left, right, |l, r| l - r)?)
}

pub fn mul(left: &Cube, right: &Cube) -> Result<Cube, OpsError> {
    Ok(apply_binary(left, right, |l, r| l * r)?)
}

pub fn div(left: &Cube, right: &Cube) -> Result<Cube, OpsError> {
    Ok(apply_binary(left, right, |l, r| l / r)?)
}

pub fn add_raw(cube: &Cube, raw: &ArrayD<f64>) -> Result<Cube, OpsError> {
    Ok(apply_raw(cube, raw, |l, r| l + r)?)
}

pub fn mul_raw(cube: &Cube, raw: &ArrayD<f64>) -> Result<Cube, OpsError> {
    Ok(apply_raw(cube, raw, |l, r| l * r)?)
}

fn as_bool(cond: bool) -> f64 {
    if cond {
        1.0
    } else {
        0.0
    }
}

pub fn lt(left: &Cube, right: &Cube) -> Result<Cube, OpsError> {
    Ok(apply_binary(left, right, |l, r| as_bool(l < r))?)
}

pub fn le(left: &Cube, right: &Cube) -> Result<Cube, OpsError> {
    Ok(apply_binary(left, right, |l, r| as_bool(l <= r))?)
}

pub fn gt(left: &Cube, right: &Cube) -> Result<Cube, OpsError> {
    Ok(apply_binary(left, right, |l, r| as_bool(l > r))?)
}

pub fn ge(left: &Cube, right: &Cube) -> Result<Cube, OpsError> {
    Ok(apply_binary(left, right, |l, r| as_bool(l >= r))?)
}

pub fn elementwise_eq(left: &Cube, right: &Cube) -> Result<Cube, OpsError> {
    Ok(apply_binary(left, right, |l, r| as_bool(l == r))?)
}

pub fn elementwise_ne(left: &Cube, right: &Cube) -> Result<Cube, OpsError> {
    Ok(apply_binary(left, right, |l, r| as_bool(l != r))?)
}

macro_rules! scalar_op {
    ($name:ident, $op:expr) => {
        #[must_use]
        pub fn $name(cube: &Cube, scalar: f64) -> Cube {
            apply_scalar(cube, scalar, $op)
        }
    };
}

scalar_op!(add_scalar, |l, r| l + r);
scalar_op!(sub_scalar, |l, r| l - r);
scalar_op!(mul_scalar, |l, r| l * r);
scalar_op!(div_scalar, |l, r| l / r);

impl std::ops::Add<&Cube> for &Cube {
    type Output = Result<Cube, OpsError>;
    fn add(self, rhs: &Cube) -> Self::Output {
        add(self, rhs)
    }
}

impl std::ops::Sub<&Cube> for &Cube {
    type Output = Result<Cube, OpsError>;
    fn sub(self, rhs: &Cube) -> Self::Output {
        sub(self, rhs)
    }
}

impl std::ops::Mul<&Cube> for &Cube {
    type Output = Result<Cube, OpsError>;
    fn mul(self, rhs: &Cube) -> Self::Output {
        mul(self, rhs)
    }
}

impl std::ops::Div<&Cube> for &Cube {
    type Output = Result<Cube, OpsError>;
    fn div(self, rhs: &Cube) -> Self::Output {
        div(self, rhs)
    }
}

impl std::ops::Mul<f64> for &Cube {
    type Output = Cube;
    fn mul(self, rhs: f64) -> Cube {
        mul_scalar(self, rhs)
    }
}

impl std::ops::Mul<&Cube> for f64 {
    type Output = Cube;
    fn mul(self, rhs: &Cube) -> Cube {
        mul_scalar(rhs, self)
    }
}

// ---------------------------------------------------------------------
// Unary numeric functions
// ---------------------------------------------------------------------

macro_rules! unary_fn {
    ($name:ident, $f:expr) => {
        #[must_use]
        pub fn $name(cube: &Cube) -> Cube {
            let result = cube.values().mapv($f);
            Cube::new(cube.axes().clone(), result).expect("mapv preserves shape")
        }
    };
}

unary_fn!(neg, |v: f64| -v);
unary_fn!(abs, f64::abs);
unary_fn!(sqrt, f64::sqrt);
unary_fn!(exp, f64::exp);
unary_fn!(ln, f64::ln);
unary_fn!(sin, f64::sin);
unary_fn!(cos, f64::cos);
unary_fn!(tan, f64::tan);

// ---------------------------------------------------------------------
// Reductions
// ---------------------------------------------------------------------

fn axis_positions(axes: &AxisList, names: &[&str]) -> Result<Vec<usize>, OpsError> {
    names
        .iter()
        .map(|&name| {
            axes.find(name)
                .ok_or_else(|| AxisListError::AxisNotFound(name.to_owned()).into())
        })
        .collect()
}

fn complement(axes: &AxisList, keep: &[&str]) -> Result<Vec<usize>, OpsError> {
    let kept = axis_positions(axes, keep)?;
    Ok((0..axes.len()).filter(|pos| !kept.contains(pos)).collect())
}

/// Reduces the named axes of `cube` with `reducer`, which collapses one
/// full slice along those axes (in the order they appear along the
/// permuted tensor, trailing fastest) into a single value. The output's
/// `AxisList` is the input's with the reduced axes removed, relative
/// order of the remaining axes preserved.
pub fn reduce_axes(
    cube: &Cube,
    axis_names: &[&str],
    reducer: impl Fn(&[f64]) -> f64,
) -> Result<Cube, OpsError> {
    let axes = cube.axes();
    let mut reduced: Vec<usize> = axis_positions(axes, axis_names)?;
    reduced.sort_unstable();
    reduced.dedup();

    let remaining: Vec<usize> = (0..axes.len()).filter(|pos| !reduced.contains(pos)).collect();

    let perm: Vec<usize> = remaining.iter().chain(reduced.iter()).copied().collect();
    let permuted = cube.values().clone().permuted_axes(perm);

    let reduced_len: usize = reduced.iter().map(|&pos| axes.axis_at(pos).expect("valid position").length()).product();
    let remaining_shape: Vec<usize> = remaining
        .iter()
        .map(|&pos| axes.axis_at(pos).expect("valid position").length())
        .collect();
    let remaining_total: usize = remaining_shape.iter().product();

    let flat: Vec<f64> = permuted.iter().copied().collect();
    let reduced_len = reduced_len.max(1);
    let mut out = Vec::with_capacity(remaining_total);
    for chunk in flat.chunks(reduced_len) {
        out.push(reducer(chunk));
    }

    let out_values = Array::from_shape_vec(remaining_shape, out)
        .expect("chunked reduction produces exactly remaining_total values")
        .into_dyn();

    let out_axes = AxisList::new(
        remaining
            .iter()
            .map(|&pos| axes.axis_at(pos).expect("valid position").clone())
            .collect(),
    )?;

    Ok(Cube::new(out_axes, out_values)?)
}

/// The complementary spelling of [`reduce_axes`]: reduces every axis not
/// named in `keep`.
pub fn reduce_keep(
    cube: &Cube,
    keep: &[&str],
    reducer: impl Fn(&[f64]) -> f64,
) -> Result<Cube, OpsError> {
    let positions = complement(cube.axes(), keep)?;
    let names: Vec<String> = positions
        .iter()
        .map(|&pos| cube.axes().axis_at(pos).expect("valid position").name().to_owned())
        .collect();
    let borrowed: Vec<&str> = names.iter().map(String::as_str).collect();
    reduce_axes(cube, &borrowed, reducer)
}

fn sum_reducer(xs: &[f64]) -> f64 {
    xs.iter().sum()
}

fn mean_reducer(xs: &[f64]) -> f64 {
    xs.iter().sum::<f64>() / xs.len() as f64
}

fn min_reducer(xs: &[f64]) -> f64 {
    xs.iter().copied().fold(f64::INFINITY, f64::min)
}

fn max_reducer(xs: &[f64]) -> f64 {
    xs.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

fn all_reducer(xs: &[f64]) -> f64 {
    as_bool(xs.iter().all(|&v| v != 0.0))
}

fn any_reducer(xs: &[f64]) -> f64 {
    as_bool(xs.iter().any(|&v| v != 0.0))
}

pub fn sum(cube: &Cube, axis_names: &[&str]) -> Result<Cube, OpsError> {
    reduce_axes(cube, axis_names, sum_reducer)
}

pub fn mean(cube: &Cube, axis_names: &[&str]) -> Result<Cube, OpsError> {
    reduce_axes(cube, axis_names, mean_reducer)
}

pub fn min(cube: &Cube, axis_names: &[&str]) -> Result<Cube, OpsError> {
    reduce_axes(cube, axis_names, min_reducer)
}

pub fn max(cube: &Cube, axis_names: &[&str]) -> Result<Cube, OpsError> {
    reduce_axes(cube, axis_names, max_reducer)
}

pub fn all(cube: &Cube, axis_names: &[&str]) -> Result<Cube, OpsError> {
    reduce_axes(cube, axis_names, all_reducer)
}

pub fn any(cube: &Cube, axis_names: &[&str]) -> Result<Cube, OpsError> {
    reduce_axes(cube, axis_names, any_reducer)
}

// ---------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------

/// A grouping reducer. `Custom` carries its own assertion that the
/// function's result does not depend on the order its members are fed in
/// — grouping assigns members to groups by first-occurrence order of the
/// group key along the tensor, which is not the same as iteration order
/// within a group once ties are broken differently across calls, so a
/// reducer that is sensitive to that order must say so up front and is
/// refused otherwise.
pub enum GroupReducer {
    Sum,
    Mean,
    Min,
    Max,
    All,
    Any,
    Custom {
        f: Box<dyn Fn(&[f64]) -> f64>,
        order_insensitive: bool,
    },
}

impl GroupReducer {
    fn resolve(&self) -> Result<&dyn Fn(&[f64]) -> f64, OpsError> {
        Ok(match self {
            Self::Sum => &sum_reducer,
            Self::Mean => &mean_reducer,
            Self::Min => &min_reducer,
            Self::Max => &max_reducer,
            Self::All => &all_reducer,
            Self::Any => &any_reducer,
            Self::Custom { f, order_insensitive } => {
                if !order_insensitive {
                    return Err(CubeError::NonGroupableReducer.into());
                }
                f.as_ref()
            }
        })
    }
}

/// Groups `cube` along `axis_name` by label value, collapsing every run of
/// positions sharing a label into one value via `reducer`. The resulting
/// axis is an `Index` axis whose labels are the distinct values in
/// first-occurrence order, placed at the same position the original axis
/// held; every other axis is unchanged.
pub fn group(cube: &Cube, axis_name: &str, reducer: &GroupReducer) -> Result<Cube, OpsError> {
    let reducer_fn = reducer.resolve()?;

    let axes = cube.axes();
    let pos = axes
        .find(axis_name)
        .ok_or_else(|| AxisListError::AxisNotFound(axis_name.to_owned()))?;
    let axis = axes.axis_at(pos).expect("valid position");

    let mut first_seen: HashMap<LabelValue, usize> = HashMap::new();
    let mut distinct_labels = Vec::new();
    let mut group_of = Vec::with_capacity(axis.length());
    for label in axis.labels().values() {
        let group_index = *first_seen.entry(label.clone()).or_insert_with(|| {
            distinct_labels.push(label.clone());
            distinct_labels.len() - 1
        });
        group_of.push(group_index);
    }
    let num_groups = distinct_labels.len();

    let remaining: Vec<usize> = (0..axes.len()).filter(|&p| p != pos).collect();
    let perm: Vec<usize> = remaining.iter().copied().chain(std::iter::once(pos)).collect();
    let permuted = cube.values().clone().permuted_axes(perm);

    let remaining_shape: Vec<usize> = remaining
        .iter()
        .map(|&p| axes.axis_at(p).expect("valid position").length())
        .collect();
    let remaining_total: usize = remaining_shape.iter().product();
    let axis_len = axis.length();

    let flat: Vec<f64> = permuted.iter().copied().collect();
    let mut out = Vec::with_capacity(remaining_total * num_groups);
    for row in flat.chunks(axis_len.max(1)) {
        let mut buckets: Vec<Vec<f64>> = vec![Vec::new(); num_groups];
        for (value, &g) in row.iter().zip(group_of.iter()) {
            buckets[g].push(*value);
        }
        for bucket in &buckets {
            out.push(reducer_fn(bucket));
        }
    }

    let mut permuted_out_shape = remaining_shape.clone();
    permuted_out_shape.push(num_groups);
    let grouped = Array::from_shape_vec(permuted_out_shape, out)
        .expect("chunked grouping produces exactly remaining_total * num_groups values");

    let mut inverse_perm = vec![0usize; perm.len()];
    for (new_pos, &old_pos) in perm.iter().enumerate() {
        inverse_perm[old_pos] = new_pos;
    }
    let out_values = grouped.permuted_axes(inverse_perm);

    let grouped_axis = Axis::index(axis_name, distinct_labels)?;
    let mut out_axis_vec: Vec<Axis> = axes.axes().to_vec();
    out_axis_vec[pos] = grouped_axis;
    let out_axes = AxisList::new(out_axis_vec)?;

    Ok(Cube::new(out_axes, out_values)?)
}

// ---------------------------------------------------------------------
// Filtering, selection, and transpose
// ---------------------------------------------------------------------

fn rebuild(cube: &Cube, pos: usize, new_axis: Axis, selector: &[usize]) -> Result<Cube, OpsError> {
    let tensor = cube.values().select(NdAxis(pos), selector);
    let mut axis_vec: Vec<Axis> = cube.axes().axes().to_vec();
    axis_vec[pos] = new_axis;
    let out_axes = AxisList::new(axis_vec)?;
    Ok(Cube::new(out_axes, tensor)?)
}

/// Restricts `axis_name` to the labels in `labels`, preserving the axis's
/// own order. Fails if any requested label is absent from the axis.
pub fn filter(cube: &Cube, axis_name: &str, labels: &[LabelValue]) -> Result<Cube, OpsError> {
    let axes = cube.axes();
    let pos = axes
        .find(axis_name)
        .ok_or_else(|| AxisListError::AxisNotFound(axis_name.to_owned()))?;
    let axis = axes.axis_at(pos).expect("valid position");
    axis.positions(labels)?;
    let (new_axis, selector) = axis.filter(labels);
    rebuild(cube, pos, new_axis, &selector)
}

/// Selects `positions` along `axis_name` in the given order. An `Index`
/// axis that would acquire a duplicate label is demoted to `Series`
/// rather than failing.
pub fn take(cube: &Cube, axis_name: &str, positions: &[usize]) -> Result<Cube, OpsError> {
    let axes = cube.axes();
    let pos = axes
        .find(axis_name)
        .ok_or_else(|| AxisListError::AxisNotFound(axis_name.to_owned()))?;
    let axis = axes.axis_at(pos).expect("valid position");
    for &p in positions {
        if p >= axis.length() {
            return Err(CubeError::IndexOutOfRange {
                axis: axis_name.to_owned(),
                position: p,
                length: axis.length(),
            }
            .into());
        }
    }
    let new_axis = axis.take_or_demote(positions);
    rebuild(cube, pos, new_axis, positions)
}

/// Boolean-masks `axis_name`: `mask.len()` must equal the axis's length.
pub fn compress(cube: &Cube, axis_name: &str, mask: &[bool]) -> Result<Cube, OpsError> {
    let axes = cube.axes();
    let pos = axes
        .find(axis_name)
        .ok_or_else(|| AxisListError::AxisNotFound(axis_name.to_owned()))?;
    let axis = axes.axis_at(pos).expect("valid position");
    if mask.len() != axis.length() {
        return Err(CubeError::ShapeMismatch {
            axis_shape: vec![axis.length()],
            tensor_shape: vec![mask.len()],
        }
        .into());
    }
    let positions: Vec<usize> = mask
        .iter()
        .enumerate()
        .filter_map(|(idx, &keep)| keep.then_some(idx))
        .collect();
    let new_axis = axis.take_or_demote(&positions);
    rebuild(cube, pos, new_axis, &positions)
}

/// Either a complete, unique list of axis names or of positions.
pub enum TransposeOrder<'a> {
    Names(&'a [&'a str]),
    Positions(&'a [usize]),
}

fn resolve_transpose_order(axes: &AxisList, order: &TransposeOrder<'_>) -> Result<Vec<usize>, OpsError> {
    match order {
        TransposeOrder::Names(names) => names
            .iter()
            .map(|&name| axes.find(name).ok_or(CubeError::InvalidPermutation))
            .collect::<Result<Vec<_>, _>>()
            .map_err(OpsError::from),
        TransposeOrder::Positions(positions) => Ok(positions.to_vec()),
    }
}

pub fn transpose(cube: &Cube, order: TransposeOrder<'_>) -> Result<Cube, OpsError> {
    let positions = resolve_transpose_order(cube.axes(), &order)?;
    Ok(cube.transpose(&positions)?)
}

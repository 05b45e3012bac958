#![forbid(unsafe_code)]

//! `Cube`: the L3 layer. A pair `(axes, values)` under the invariant
//! `rank(values) = |axes|` and `length(axes[i]) = shape(values)[i]` for
//! every position. The tensor is always dense `f64`; the dense tensor
//! engine is treated as an opaque external collaborator, and this crate
//! uses `ndarray` in that role.

use cubes_axis::AxisError;
use cubes_axislist::{AxisList, AxisListError};
use ndarray::{ArrayD, IxDyn};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CubeError {
    #[error("cube shape mismatch: axis lengths {axis_shape:?} do not agree with tensor shape {tensor_shape:?}")]
    ShapeMismatch {
        axis_shape: Vec<usize>,
        tensor_shape: Vec<usize>,
    },
    #[error("position {position} is out of range for axis {axis:?} of length {length}")]
    IndexOutOfRange {
        axis: String,
        position: usize,
        length: usize,
    },
    #[error("transpose order is not a valid, complete permutation")]
    InvalidPermutation,
    #[error("group() was given an order-sensitive reducer, which cannot be used for grouping")]
    NonGroupableReducer,
    #[error(transparent)]
    AxisList(#[from] AxisListError),
    #[error(transparent)]
    Axis(#[from] AxisError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cube {
    axes: AxisList,
    values: ArrayD<f64>,
}

impl Cube {
    pub fn new(axes: AxisList, values: ArrayD<f64>) -> Result<Self, CubeError> {
        let axis_shape: Vec<usize> = axes.axes().iter().map(cubes_axis::Axis::length).collect();
        let tensor_shape = values.shape().to_vec();
        if axis_shape != tensor_shape {
            return Err(CubeError::ShapeMismatch {
                axis_shape,
                tensor_shape,
            });
        }
        Ok(Self { axes, values })
    }

    /// A scalar is a degenerate, rank-0 cube.
    #[must_use]
    pub fn scalar(value: f64) -> Self {
        Self {
            axes: AxisList::empty(),
            values: ArrayD::from_elem(IxDyn(&[]), value),
        }
    }

    #[must_use]
    pub fn as_scalar(&self) -> Option<f64> {
        if self.rank() == 0 {
            self.values.iter().next().copied()
        } else {
            None
        }
    }

    #[must_use]
    pub fn axes(&self) -> &AxisList {
        &self.axes
    }

    #[must_use]
    pub fn values(&self) -> &ArrayD<f64> {
        &self.values
    }

    #[must_use]
    pub fn shape(&self) -> &[usize] {
        self.values.shape()
    }

    #[must_use]
    pub fn rank(&self) -> usize {
        self.values.ndim()
    }

    /// Permutes the cube's axes by the given index order.
    pub fn transpose(&self, order: &[usize]) -> Result<Self, CubeError> {
        if order.len() != self.rank() {
            return Err(CubeError::InvalidPermutation);
        }
        let out_axes = self
            .axes
            .transpose(order)
            .map_err(|_| CubeError::InvalidPermutation)?;
        let out_values = self.values.clone().permuted_axes(order.to_vec());
        Ok(Self {
            axes: out_axes,
            values: out_values,
        })
    }
}

#[cfg(test)]
mod tests {
    use cubes_axis::Axis;
    use cubes_axislist::AxisList;
    use ndarray::array;

    use super::{Cube, CubeError};

    fn sample_cube() -> Cube {
        let year = Axis::index("year", vec![2014_i64.into(), 2015_i64.into()]).expect("year");
        let quarter = Axis::index(
            "quarter",
            vec!["Q1".into(), "Q2".into(), "Q3".into(), "Q4".into()],
        )
        .expect("quarter");
        let axes = AxisList::new(vec![year, quarter]).expect("axes");
        let values = array![[14.0, 16.0, 13.0, 20.0], [15.0, 15.0, 10.0, 19.0]].into_dyn();
        Cube::new(axes, values).expect("cube")
    }

    #[test]
    fn construction_validates_shape_agreement() {
        let cube = sample_cube();
        assert_eq!(cube.shape(), &[2, 4]);
        assert_eq!(cube.rank(), 2);
    }

    #[test]
    fn construction_rejects_shape_disagreement() {
        let year = Axis::index("year", vec![2014_i64.into()]).expect("year");
        let axes = AxisList::new(vec![year]).expect("axes");
        let values = array![1.0, 2.0].into_dyn();
        let err = Cube::new(axes, values).expect_err("must fail");
        assert!(matches!(err, CubeError::ShapeMismatch { .. }));
    }

    #[test]
    fn transpose_then_its_inverse_round_trips() {
        let cube = sample_cube();
        let transposed = cube.transpose(&[1, 0]).expect("transpose");
        assert_eq!(transposed.shape(), &[4, 2]);
        let back = transposed.transpose(&[1, 0]).expect("inverse transpose");
        assert_eq!(back, cube);
    }

    #[test]
    fn scalar_cube_has_rank_zero() {
        let cube = Cube::scalar(0.5);
        assert_eq!(cube.rank(), 0);
        assert_eq!(cube.as_scalar(), Some(0.5));
    }
}

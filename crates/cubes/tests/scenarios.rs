use cubes::ndarray::array;
use cubes::{
    add, elementwise_eq, filter, group, mean, mul, mul_scalar, sub, sum, take, transpose, Axis,
    AxisKind, AxisList, Cube, GroupReducer, OpsError, TransposeOrder,
};

fn approx_eq(a: &[f64], b: &[f64]) {
    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(b.iter()) {
        assert!((x - y).abs() < 1e-9, "{x} != {y}");
    }
}

fn year_quarter_sales() -> Cube {
    let year = Axis::index("year", vec![2014_i64.into(), 2015_i64.into()]).unwrap();
    let quarter = Axis::index(
        "quarter",
        vec!["Q1".into(), "Q2".into(), "Q3".into(), "Q4".into()],
    )
    .unwrap();
    let axes = AxisList::new(vec![year, quarter]).unwrap();
    let values = array![[14.0, 16.0, 13.0, 20.0], [15.0, 15.0, 10.0, 19.0]].into_dyn();
    Cube::new(axes, values).unwrap()
}

#[test]
fn scalar_broadcast() {
    let sales = year_quarter_sales();
    let halved = mul_scalar(&sales, 0.5);
    assert_eq!(halved.axes(), sales.axes());
    approx_eq(
        halved.values().as_slice().unwrap(),
        &[7.0, 8.0, 6.5, 10.0, 7.5, 7.5, 5.0, 9.5],
    );
}

#[test]
fn single_axis_alignment_by_broadcast() {
    let sales = year_quarter_sales();
    let quarter = Axis::index(
        "quarter",
        vec!["Q1".into(), "Q2".into(), "Q3".into(), "Q4".into()],
    )
    .unwrap();
    let prices = Cube::new(
        AxisList::new(vec![quarter]).unwrap(),
        array![1.50, 1.52, 1.53, 1.55].into_dyn(),
    )
    .unwrap();

    let out = mul(&sales, &prices).unwrap();
    assert_eq!(
        out.axes().axes().iter().map(Axis::name).collect::<Vec<_>>(),
        vec!["year", "quarter"]
    );
    approx_eq(
        out.values().as_slice().unwrap(),
        &[21.0, 24.32, 19.89, 31.0, 22.5, 22.8, 15.3, 29.45],
    );
}

#[test]
fn index_index_reorder() {
    let a = Axis::index("k", vec!["a".into(), "b".into(), "c".into()]).unwrap();
    let b = Axis::index("k", vec!["c".into(), "b".into(), "a".into()]).unwrap();
    let p = Cube::new(AxisList::new(vec![a]).unwrap(), array![1.0, 2.0, 3.0].into_dyn()).unwrap();
    let q = Cube::new(AxisList::new(vec![b]).unwrap(), array![30.0, 20.0, 10.0].into_dyn()).unwrap();

    let out = add(&p, &q).unwrap();
    assert_eq!(
        out.axes().axes()[0].labels().values(),
        &["a".into(), "b".into(), "c".into()]
    );
    approx_eq(out.values().as_slice().unwrap(), &[11.0, 22.0, 33.0]);
}

#[test]
fn index_series_subset() {
    let i = Axis::index("k", vec!["a".into(), "b".into(), "c".into(), "d".into()]).unwrap();
    let s = Axis::series("k", vec!["b".into(), "d".into(), "b".into()]);
    let x = Cube::new(
        AxisList::new(vec![i]).unwrap(),
        array![10.0, 20.0, 30.0, 40.0].into_dyn(),
    )
    .unwrap();
    let y = Cube::new(AxisList::new(vec![s]).unwrap(), array![1.0, 2.0, 3.0].into_dyn()).unwrap();

    let out = mul(&x, &y).unwrap();
    assert_eq!(out.axes().axes()[0].kind(), AxisKind::Series);
    assert_eq!(
        out.axes().axes()[0].labels().values(),
        &["b".into(), "d".into(), "b".into()]
    );
    approx_eq(out.values().as_slice().unwrap(), &[20.0, 80.0, 60.0]);
}

#[test]
fn aggregation_with_keep() {
    let year = Axis::index("year", vec![2014_i64.into(), 2015_i64.into()]).unwrap();
    let quarter = Axis::index(
        "quarter",
        vec!["Q1".into(), "Q2".into(), "Q3".into(), "Q4".into()],
    )
    .unwrap();
    let revenues = Cube::new(
        AxisList::new(vec![year, quarter]).unwrap(),
        array![[10.0, 20.0, 30.0, 40.0], [50.0, 60.0, 70.0, 80.0]].into_dyn(),
    )
    .unwrap();

    let kept = cubes::reduce_keep(&revenues, &["year"], |xs| xs.iter().sum()).unwrap();
    assert_eq!(kept.axes().axes().iter().map(Axis::name).collect::<Vec<_>>(), vec!["year"]);
    approx_eq(kept.values().as_slice().unwrap(), &[100.0, 260.0]);

    let summed = sum(&revenues, &["quarter"]).unwrap();
    assert_eq!(kept.values(), summed.values());
}

#[test]
fn grouping_by_label() {
    let subj = Axis::series(
        "subject",
        vec![
            "m".into(), "b".into(), "m".into(), "p".into(),
            "m".into(), "b".into(), "m".into(), "p".into(),
        ],
    );
    let score = Cube::new(
        AxisList::new(vec![subj]).unwrap(),
        array![65.0, 80.0, 95.0, 52.0, 35.0, 50.0, 89.0, 95.0].into_dyn(),
    )
    .unwrap();

    let grouped = group(&score, "subject", &GroupReducer::Mean).unwrap();
    assert_eq!(grouped.axes().axes()[0].kind(), AxisKind::Index);
    assert_eq!(
        grouped.axes().axes()[0].labels().values(),
        &["m".into(), "b".into(), "p".into()]
    );
    approx_eq(grouped.values().as_slice().unwrap(), &[71.0, 65.0, 73.5]);
}

#[test]
fn incompatible_axes_fail_rather_than_inner_join() {
    let a = Axis::index("k", vec!["a".into(), "b".into(), "c".into()]).unwrap();
    let b = Axis::index("k", vec!["a".into(), "b".into(), "d".into()]).unwrap();
    let left = Cube::new(AxisList::new(vec![a]).unwrap(), array![1.0, 2.0, 3.0].into_dyn()).unwrap();
    let right = Cube::new(AxisList::new(vec![b]).unwrap(), array![1.0, 2.0, 3.0].into_dyn()).unwrap();

    let err = add(&left, &right).expect_err("must not silently inner-join");
    assert!(matches!(err, OpsError::Kernel(_) | OpsError::Align(_)));
}

#[test]
fn transpose_then_its_inverse_round_trips() {
    let sales = year_quarter_sales();
    let flipped = transpose(&sales, TransposeOrder::Positions(&[1, 0])).unwrap();
    let back = transpose(&flipped, TransposeOrder::Positions(&[1, 0])).unwrap();
    assert_eq!(back, sales);
}

#[test]
fn filtering_is_idempotent() {
    let sales = year_quarter_sales();
    let once = filter(&sales, "quarter", &["Q1".into(), "Q3".into()]).unwrap();
    let twice = filter(&once, "quarter", &["Q1".into(), "Q3".into()]).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn take_over_the_full_range_is_identity() {
    let sales = year_quarter_sales();
    let out = take(&sales, "quarter", &[0, 1, 2, 3]).unwrap();
    assert_eq!(out.axes(), sales.axes());
    assert_eq!(out.values(), sales.values());
}

#[test]
fn elementwise_eq_after_subtraction_is_all_true() {
    let sales = year_quarter_sales();
    let zero = sub(&sales, &sales).unwrap();
    let same = elementwise_eq(&sales, &sales).unwrap();
    assert!(same.values().iter().all(|&v| v == 1.0));
    assert!(zero.values().iter().all(|&v| v == 0.0));
}

#[test]
fn division_by_the_mean_preserves_axes() {
    let sales = year_quarter_sales();
    let avg = mean(&sales, &["year", "quarter"]).unwrap();
    let avg_scalar = avg.as_scalar().expect("fully reduced cube is a scalar");
    let normalized = cubes::div_scalar(&sales, avg_scalar);
    assert_eq!(normalized.axes(), sales.axes());
    let reconstructed = cubes::mul_scalar(&normalized, avg_scalar);
    approx_eq(
        reconstructed.values().as_slice().unwrap(),
        sales.values().as_slice().unwrap(),
    );
}

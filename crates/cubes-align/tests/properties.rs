use cubes_axis::Axis;
use cubes_axislist::AxisList;
use proptest::prelude::*;

fn index_axis_of(name: &str, mut values: Vec<i64>) -> Axis {
    values.dedup();
    Axis::index(name, values.into_iter().map(Into::into).collect()).expect("distinct by construction")
}

proptest! {
    /// Any permutation of the same Index label set aligns, and the
    /// resolved output axis always keeps the left operand's own order.
    #[test]
    fn index_index_alignment_is_order_independent(
        base in prop::collection::vec(-50i64..50, 1..8),
        seed in any::<u64>(),
    ) {
        let mut base = base;
        base.dedup();
        prop_assume!(!base.is_empty());

        let left = AxisList::new(vec![index_axis_of("k", base.clone())]).unwrap();

        let mut shuffled = base.clone();
        // A cheap deterministic shuffle so the test stays reproducible.
        let n = shuffled.len();
        for i in 0..n {
            let j = (seed as usize).wrapping_add(i).wrapping_mul(2654435761) % n;
            shuffled.swap(i, j);
        }
        let right = AxisList::new(vec![index_axis_of("k", shuffled)]).unwrap();

        let plan = cubes_align::align(&left, &right).expect("same label set must align");
        prop_assert_eq!(plan.out_axes.axes()[0].labels().values(), left.axes()[0].labels().values());
    }
}

use crate::{
    field::Field,
    foundation::error::{BulbError, BulbResult},
};

/// Elementwise sum of two same-shaped fields.
///
/// Fails with [`BulbError::ShapeMismatch`] instead of broadcasting; nothing is allocated for
/// the result until the shapes agree.
pub fn combine(distance: &Field<f64>, light: &Field<f64>) -> BulbResult<Field<f64>> {
    if distance.size() != light.size() {
        return Err(BulbError::ShapeMismatch {
            left_width: distance.width(),
            left_height: distance.height(),
            right_width: light.width(),
            right_height: light.height(),
        });
    }
    let data = distance
        .values()
        .iter()
        .zip(light.values())
        .map(|(a, b)| a + b)
        .collect();
    Field::from_vec(distance.size(), data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::Size;
    use proptest::prelude::*;

    fn field(w: u32, h: u32, data: Vec<f64>) -> Field<f64> {
        Field::from_vec(Size::new(w, h).unwrap(), data).unwrap()
    }

    #[test]
    fn sums_elementwise() {
        let a = field(2, 1, vec![1.0, 2.0]);
        let b = field(2, 1, vec![0.5, -2.0]);
        assert_eq!(combine(&a, &b).unwrap().values(), &[1.5, 0.0]);
    }

    #[test]
    fn transposed_shapes_are_a_mismatch() {
        let a = field(2, 3, vec![0.0; 6]);
        let b = field(3, 2, vec![0.0; 6]);
        let err = combine(&a, &b).unwrap_err();
        assert!(matches!(
            err,
            BulbError::ShapeMismatch {
                left_width: 2,
                left_height: 3,
                right_width: 3,
                right_height: 2,
            }
        ));
    }

    #[test]
    fn mismatch_leaves_inputs_untouched() {
        let a = field(1, 1, vec![4.0]);
        let b = field(2, 1, vec![1.0, 1.0]);
        assert!(combine(&a, &b).is_err());
        assert_eq!(a.values(), &[4.0]);
        assert_eq!(b.values(), &[1.0, 1.0]);
    }

    proptest! {
        #[test]
        fn combine_is_commutative(
            (w, h, xs, ys) in (1u32..8, 1u32..8).prop_flat_map(|(w, h)| {
                let n = (w * h) as usize;
                (
                    Just(w),
                    Just(h),
                    prop::collection::vec(-1e6f64..1e6, n),
                    prop::collection::vec(-1e6f64..1e6, n),
                )
            })
        ) {
            let a = field(w, h, xs);
            let b = field(w, h, ys);
            prop_assert_eq!(combine(&a, &b).unwrap(), combine(&b, &a).unwrap());
        }
    }
}

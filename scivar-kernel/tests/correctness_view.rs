use approx::assert_relative_eq;
use rand::{Rng, SeedableRng};
use scivar_kernel::{map2_in_place, zip2_in_place, zip4_in_place};
use scivar_traits::ValueAndVariance;
use scivar_view::{Dim, Dimensions, Slice, StridedView, StridedViewMut, ViewLayout};

fn make_tensor(rows: usize, cols: usize) -> Vec<f64> {
    (0..rows * cols).map(|i| i as f64).collect()
}

fn yx(ny: usize, nx: usize) -> Dimensions {
    Dimensions::new(&[(Dim::Y, ny), (Dim::X, nx)]).unwrap()
}

#[test]
fn test_zip2_transposed_source() {
    let a = make_tensor(6, 4);
    let a_view = StridedView::contiguous(&a, yx(6, 4)).unwrap();
    let a_t = StridedView::new(
        a_view.data(),
        a_view.layout().transpose(&[Dim::X, Dim::Y]).unwrap(),
    )
    .unwrap();

    let mut out = vec![1.0; 24];
    let out_dims = *a_t.dims();
    let mut dst = StridedViewMut::new(&mut out, ViewLayout::contiguous(out_dims)).unwrap();
    zip2_in_place(&mut dst, &a_t, |x, y| *x += 2.0 * y).unwrap();

    for i in 0..4 {
        for j in 0..6 {
            let expected = 1.0 + 2.0 * a[j * 4 + i];
            assert_relative_eq!(out[i * 6 + j], expected, epsilon = 1e-12);
        }
    }
}

#[test]
fn test_zip2_sliced_destination_leaves_rest_untouched() {
    let mut out = make_tensor(4, 5);
    let before = out.clone();
    let layout = ViewLayout::contiguous(yx(4, 5))
        .slice(Slice::range(Dim::X, 1, 4))
        .unwrap()
        .slice(Slice::range(Dim::Y, 2, 4))
        .unwrap();
    let ones = vec![1.0; 6];
    let src = StridedView::contiguous(&ones, *layout.dims()).unwrap();
    let mut dst = StridedViewMut::new(&mut out, layout).unwrap();
    zip2_in_place(&mut dst, &src, |x, y| *x -= y).unwrap();

    for y in 0..4 {
        for x in 0..5 {
            let i = y * 5 + x;
            let inside = (2..4).contains(&y) && (1..4).contains(&x);
            let expected = if inside { before[i] - 1.0 } else { before[i] };
            assert_eq!(out[i], expected);
        }
    }
}

#[test]
fn test_values_and_variances_through_value_and_variance() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(7);
    let n = 64;
    let a: Vec<f64> = (0..n).map(|_| rng.gen_range(1.0..2.0)).collect();
    let va: Vec<f64> = (0..n).map(|_| rng.gen_range(0.0..0.1)).collect();
    let b: Vec<f64> = (0..n).map(|_| rng.gen_range(1.0..2.0)).collect();
    let vb: Vec<f64> = (0..n).map(|_| rng.gen_range(0.0..0.1)).collect();
    let dims = Dimensions::single(Dim::Tof, n).unwrap();

    let mut values = a.clone();
    let mut variances = va.clone();
    {
        let mut v = StridedViewMut::new(&mut values, ViewLayout::contiguous(dims)).unwrap();
        let mut e = StridedViewMut::new(&mut variances, ViewLayout::contiguous(dims)).unwrap();
        let sb = StridedView::contiguous(&b, dims).unwrap();
        let svb = StridedView::contiguous(&vb, dims).unwrap();
        zip4_in_place(&mut v, &mut e, &sb, &svb, |v, e, b, vb| {
            let r = ValueAndVariance::new(*v, *e) * ValueAndVariance::new(*b, *vb);
            *v = r.value;
            *e = r.variance;
        })
        .unwrap();
    }
    for i in 0..n {
        assert_relative_eq!(values[i], a[i] * b[i], epsilon = 1e-12);
        assert_relative_eq!(
            variances[i],
            va[i] * b[i] * b[i] + vb[i] * a[i] * a[i],
            epsilon = 1e-12
        );
    }
}

#[test]
fn test_map2_sqrt_strided() {
    let mut values = vec![4.0, 0.0, 9.0, 0.0];
    let mut variances = vec![2.0, 0.0, 3.0, 0.0];
    let every_other = ViewLayout::contiguous(yx(2, 2))
        .slice(Slice::point(Dim::X, 0))
        .unwrap();
    let mut v = StridedViewMut::new(&mut values, every_other).unwrap();
    let mut e = StridedViewMut::new(&mut variances, every_other).unwrap();
    map2_in_place(&mut v, &mut e, |v, e| {
        let r = ValueAndVariance::new(*v, *e).sqrt();
        *v = r.value;
        *e = r.variance;
    })
    .unwrap();
    assert_eq!(values, vec![2.0, 0.0, 3.0, 0.0]);
    assert_relative_eq!(variances[0], 0.125);
    assert_relative_eq!(variances[2], 0.25 * 3.0 / 9.0);
}

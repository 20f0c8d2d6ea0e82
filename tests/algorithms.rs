use approx::assert_relative_eq;
use scivar::{
    concatenate, counts_to_density, groupby, mean, rebin, sum, DataArray, Dim, Dimensions, Error,
    Unit, Variable,
};

fn edges(dim: Dim, values: Vec<f64>) -> Variable {
    Variable::new(Dimensions::single(dim, values.len()).unwrap(), Unit::us(), values).unwrap()
}

#[test]
fn test_rebin_conserves_counts() {
    let counts = Variable::new(
        Dimensions::single(Dim::Tof, 4).unwrap(),
        Unit::counts(),
        vec![1.0, 1.0, 1.0, 1.0],
    )
    .unwrap();
    let old = edges(Dim::Tof, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    let new = edges(Dim::Tof, vec![0.0, 2.0, 4.0]);
    let out = rebin(&counts, Dim::Tof, &old, &new).unwrap();
    assert_eq!(out.values::<f64>().unwrap(), vec![2.0, 2.0]);
    let before = sum(&counts, Dim::Tof).unwrap().values::<f64>().unwrap()[0];
    let after = sum(&out, Dim::Tof).unwrap().values::<f64>().unwrap()[0];
    assert_relative_eq!(before, 4.0);
    assert_relative_eq!(after, before);
}

#[test]
fn test_rebin_irregular_edges_per_spectrum() {
    let counts = Variable::new(
        Dimensions::new(&[(Dim::Spectrum, 2), (Dim::Tof, 3)]).unwrap(),
        Unit::counts(),
        vec![3.0, 6.0, 9.0, 1.0, 2.0, 3.0],
    )
    .unwrap();
    let old = edges(Dim::Tof, vec![0.0, 1.0, 3.0, 6.0]);
    let new = edges(Dim::Tof, vec![0.0, 1.5, 6.0]);
    let out = rebin(&counts, Dim::Tof, &old, &new).unwrap();
    let values = out.values::<f64>().unwrap();
    for (got, want) in values.iter().zip([4.5, 13.5, 1.5, 4.5]) {
        assert_relative_eq!(*got, want, epsilon = 1e-12);
    }
}

#[test]
fn test_rebin_density_round_trip() {
    let counts = Variable::new(
        Dimensions::single(Dim::Tof, 2).unwrap(),
        Unit::counts(),
        vec![2.0, 6.0],
    )
    .unwrap();
    let old = edges(Dim::Tof, vec![0.0, 1.0, 3.0]);
    let new = edges(Dim::Tof, vec![0.0, 3.0]);
    let density = counts_to_density(&counts, Dim::Tof, &old).unwrap();
    let rebinned = rebin(&density, Dim::Tof, &old, &new).unwrap();
    assert_eq!(rebinned.unit(), Unit::counts() / Unit::us());
    assert_relative_eq!(rebinned.values::<f64>().unwrap()[0], 8.0 / 3.0);
    assert!(matches!(
        counts_to_density(&density, Dim::Tof, &old),
        Err(Error::Unit(_))
    ));
}

#[test]
fn test_dense_concatenate_builds_outer_product_order() {
    let a = Variable::scalar(1.0, Unit::m());
    let b = Variable::scalar(2.0, Unit::m());
    let ab = concatenate(&a, &b, Dim::Tof).unwrap();
    assert_eq!(ab.values::<f64>().unwrap(), vec![1.0, 2.0]);
    assert_eq!(ab.unit(), Unit::m());
    let grid = concatenate(&ab, &ab, Dim::X).unwrap();
    assert_eq!(
        grid.dims(),
        Dimensions::new(&[(Dim::X, 2), (Dim::Tof, 2)]).unwrap()
    );
    assert_eq!(grid.values::<f64>().unwrap(), vec![1.0, 2.0, 1.0, 2.0]);
    let longer = concatenate(&grid, &ab, Dim::X).unwrap();
    assert_eq!(longer.dims().extent(Dim::X).unwrap(), 3);
}

#[test]
fn test_groupby_sum_and_mean() {
    let rows = Dimensions::single(Dim::Row, 4).unwrap();
    let data = DataArray::new(
        Variable::with_variances(rows, Unit::counts(), vec![1.0, 2.0, 3.0, 4.0], vec![1.0; 4]).unwrap(),
    )
    .with_coord(
        Dim::Detector,
        Variable::new(rows, Unit::dimensionless(), vec![2i32, 1, 2, 1]).unwrap(),
    )
    .unwrap();
    let grouped = groupby(&data, Dim::Detector).unwrap().sum(Dim::Row).unwrap();
    assert_eq!(grouped.dims(), Dimensions::single(Dim::Detector, 2).unwrap());
    assert_eq!(grouped.data().values::<f64>().unwrap(), vec![6.0, 4.0]);
    assert_eq!(grouped.data().variances::<f64>().unwrap(), vec![2.0, 2.0]);
    assert_eq!(
        grouped.coord(Dim::Detector).unwrap().values::<i32>().unwrap(),
        vec![1, 2]
    );

    let m = mean(data.data(), Dim::Row).unwrap();
    assert_relative_eq!(m.values::<f64>().unwrap()[0], 2.5);
    assert_relative_eq!(m.variances::<f64>().unwrap()[0], 0.25);
}

//! Decoding of synthetic archives written with the netcdf library.

use cmip_catalog::MultiplyAdd;
use netcdf_parser::{Archive, ArchiveIngestor, NetCdfError};
use test_utils::{
    assert_approx_eq, create_field_series, temp_test_dir, write_archive, write_series_archive,
    write_static_archive, ARCHIVE_FILL_VALUE,
};

#[test]
fn test_reads_series_with_rewrap_and_units() {
    let dir = temp_test_dir();
    let path = dir.path().join("tas.nc");
    // value encodes (t, y, x) in Kelvin offsets
    let data = create_field_series(4, 2, 3, |t, y, x| 273.15 + (t * 100 + y * 10 + x) as f32);
    write_series_archive(&path, "tas", 3, 2, 4, &data);

    let array = ArchiveIngestor::read(&path, "tas", Some(MultiplyAdd::KELVIN_TO_CELSIUS))
        .expect("Failed to decode");

    assert_eq!(array.n_time, 3);
    assert_eq!(array.n_locations, 8);
    // second time step, first row: columns 2,3 then 0,1
    let step = array.time_step(1);
    let expected = [102.0, 103.0, 100.0, 101.0, 112.0, 113.0, 110.0, 111.0];
    for (got, want) in step.iter().zip(expected) {
        assert_approx_eq!(*got, want, 1e-3);
    }
}

#[test]
fn test_static_field_is_one_time_step() {
    let dir = temp_test_dir();
    let path = dir.path().join("orog_fx.nc");
    write_static_archive(&path, "orog", 2, 2, &[10.0, 20.0, 30.0, 40.0]);

    let array = ArchiveIngestor::read(&path, "orog", None).unwrap();
    assert_eq!(array.n_time, 1);
    assert_eq!(array.data, vec![20.0, 10.0, 40.0, 30.0]);
}

#[test]
fn test_fill_value_becomes_nan() {
    let dir = temp_test_dir();
    let path = dir.path().join("pr.nc");
    let data = [1.0, ARCHIVE_FILL_VALUE, 3.0, 4.0];
    write_archive(&path, "pr", Some(1), 1, 4, &data, Some(ARCHIVE_FILL_VALUE));

    let raw = Archive::open(&path).unwrap().read("pr").unwrap();
    assert!(raw[1].is_nan());
    assert_eq!(raw[0], 1.0);
}

#[test]
fn test_missing_field_is_reported_with_context() {
    let dir = temp_test_dir();
    let path = dir.path().join("psl.nc");
    write_series_archive(&path, "psl", 1, 1, 2, &[1.0, 2.0]);

    match ArchiveIngestor::read(&path, "tas", None) {
        Err(NetCdfError::FieldNotFound { field, path: p }) => {
            assert_eq!(field, "tas");
            assert_eq!(p, path);
        }
        other => panic!("expected FieldNotFound, got {:?}", other.map(|a| a.n_time)),
    }
}

#[test]
fn test_open_failure() {
    let dir = temp_test_dir();
    let path = dir.path().join("broken.nc");
    std::fs::write(&path, b"not a netcdf file").unwrap();

    let err = ArchiveIngestor::read(&path, "tas", None).unwrap_err();
    assert!(matches!(err, NetCdfError::Open { .. }));
    assert!(err.is_format_error());
}

#[test]
fn test_read_with_shape() {
    let dir = temp_test_dir();
    let path = dir.path().join("sftlf_fx.nc");
    write_static_archive(&path, "sftlf", 3, 4, &[1.0; 12]);

    let (array, shape) = ArchiveIngestor::read_with_shape(&path, "sftlf", None).unwrap();
    assert_eq!((shape.nt, shape.ny, shape.nx), (1, 3, 4));
    assert_eq!(array.n_locations, 12);
}

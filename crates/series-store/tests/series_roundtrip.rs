//! Write/read tests for series arrays on a temporary filesystem store.

use series_store::{
    Layout, LocationBatch, LocationRangeReader, SeriesSpec, SpaceMajorArray, StoreCompression,
    StoreConfig, TimeSeriesReader, TimeSeriesWriter,
};

/// Field sequence where value = location * 1000 + time step.
fn create_fields(n_locations: usize, n_time: usize) -> SpaceMajorArray {
    let data = (0..n_time)
        .flat_map(|t| (0..n_locations).map(move |l| (l * 1000 + t) as f32))
        .collect();
    SpaceMajorArray::new(data, n_locations, n_time).expect("valid shape")
}

fn small_config() -> StoreConfig {
    StoreConfig {
        series_chunk_locations: 6,
        series_chunk_time: 10,
        shard_locations: 12,
        ..Default::default()
    }
}

#[test]
fn test_write_all_then_read_series() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("series.zarr");

    let writer = TimeSeriesWriter::new(small_config());
    let spec = SeriesSpec::time_series(writer.config(), 30, 25, 1.0)
        .attribute("model", "MRI_AGCM3_2_S")
        .attribute("variable", "temperature_2m_max");
    let series = create_fields(30, 25).transpose();
    let result = writer
        .create(&path, spec)
        .expect("Failed to create")
        .write_all(series.data)
        .expect("Failed to write");

    assert_eq!(result.shape, [30, 25]);
    assert!(path.exists());
    assert!(!temp_dir.path().join("series.zarr.tmp").exists());

    let reader = TimeSeriesReader::open(&path).expect("Failed to open");
    assert_eq!(reader.shape(), [30, 25]);
    assert_eq!(reader.layout(), Layout::TimeMajor);
    assert_eq!(reader.attributes()["variable"], "temperature_2m_max");

    let one = reader.read(17..18, 0..25).expect("Failed to read");
    let expected: Vec<f32> = (0..25).map(|t| (17_000 + t) as f32).collect();
    assert_eq!(one, expected);

    let block = reader.read(3..5, 20..22).expect("Failed to read");
    assert_eq!(block, vec![3020.0, 3021.0, 4020.0, 4021.0]);
}

#[test]
fn test_write_batches_matches_bulk_write() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let bulk_path = temp_dir.path().join("bulk.zarr");
    let batched_path = temp_dir.path().join("batched.zarr");

    let writer = TimeSeriesWriter::new(small_config());
    let series = create_fields(40, 12).transpose();

    writer
        .create(&bulk_path, SeriesSpec::time_series(writer.config(), 40, 12, 1.0))
        .unwrap()
        .write_all(series.data.clone())
        .unwrap();

    // batches of 12 with a short tail
    let batches = (0..40).step_by(12).map(|start| {
        let end = (start + 12).min(40);
        LocationBatch::new(start, end - start, 12, series.locations(start..end).to_vec())
    });
    writer
        .create(&batched_path, SeriesSpec::time_series(writer.config(), 40, 12, 1.0))
        .unwrap()
        .write_batches(batches)
        .unwrap();

    let bulk = TimeSeriesReader::open(&bulk_path).unwrap().read_all().unwrap();
    let batched = TimeSeriesReader::open(&batched_path).unwrap().read_all().unwrap();
    assert_eq!(bulk, batched);
    assert_eq!(bulk, series.data);
}

#[test]
fn test_batch_gap_leaves_no_final_file() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("gap.zarr");

    let writer = TimeSeriesWriter::new(small_config());
    let batches = vec![
        LocationBatch::new(0, 2, 3, vec![0.0; 6]),
        LocationBatch::new(4, 2, 3, vec![0.0; 6]),
    ];
    let err = writer
        .create(&path, SeriesSpec::time_series(writer.config(), 6, 3, 1.0))
        .unwrap()
        .write_batches(batches);

    assert!(err.is_err());
    assert!(!path.exists());
}

#[test]
fn test_scale_factor_quantises_and_keeps_nan() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("quantised.zarr");

    let config = StoreConfig {
        compression: StoreCompression::None,
        ..small_config()
    };
    let writer = TimeSeriesWriter::new(config);
    let data = vec![12.345, f32::NAN, -3.21, 0.04];
    writer
        .create(&path, SeriesSpec::time_series(writer.config(), 2, 2, 10.0))
        .unwrap()
        .write_all(data)
        .unwrap();

    let reader = TimeSeriesReader::open(&path).unwrap();
    assert_eq!(reader.scale_factor(), 10.0);
    let values = reader.read_all().unwrap();
    assert!((values[0] - 12.3).abs() < 1e-4);
    assert!(values[1].is_nan());
    assert!((values[2] + 3.2).abs() < 1e-4);
    assert_eq!(values[3], 0.0);
}

#[test]
fn test_stale_temporary_is_replaced() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("elevation.zarr");
    let stale = temp_dir.path().join("elevation.zarr.tmp");
    std::fs::create_dir_all(&stale).unwrap();
    std::fs::write(stale.join("garbage"), b"partial").unwrap();

    let writer = TimeSeriesWriter::new(small_config());
    let spec = SeriesSpec::static_field(writer.config(), 4, 5, 1.0);
    let field: Vec<f32> = (0..20).map(|v| v as f32).collect();
    writer.create(&path, spec).unwrap().write_all(field.clone()).unwrap();

    assert!(!stale.exists());
    let reader = TimeSeriesReader::open(&path).unwrap();
    assert_eq!(reader.shape(), [4, 5]);
    assert_eq!(reader.read_all().unwrap(), field);
}

#[test]
fn test_prefetch_serves_same_values() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("prefetch.zarr");

    let writer = TimeSeriesWriter::new(small_config());
    let series = create_fields(20, 8).transpose();
    writer
        .create(&path, SeriesSpec::intermediate(20, 8, 6, 1.0))
        .unwrap()
        .write_all(series.data.clone())
        .unwrap();

    let reader = TimeSeriesReader::open(&path).unwrap();
    reader.prefetch(6..12);
    assert_eq!(reader.read_locations(6..12).unwrap(), series.locations(6..12));
    assert_eq!(reader.read_locations(0..3).unwrap(), series.locations(0..3));
}

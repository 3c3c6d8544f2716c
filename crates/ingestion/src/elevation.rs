//! Static surface elevation per model.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cmip_catalog::Model;
use netcdf_parser::FieldShape;
use series_store::{SeriesSpec, SpaceMajorArray, StoreConfig, TimeSeriesReader, TimeSeriesWriter};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{IngestionError, Result};

/// Elevation written for cells that are mostly ocean.
pub const OCEAN_ELEVATION: f32 = -999.0;

/// Cells with a land fraction below this are masked as ocean.
pub const LAND_FRACTION_THRESHOLD: f32 = 0.5;

/// Replace the altitude of ocean cells by [`OCEAN_ELEVATION`].
///
/// `land_fraction` is in the archive's units, 0..1.
pub fn mask_ocean(altitude: &mut [f32], land_fraction: &[f32]) -> Result<()> {
    if altitude.len() != land_fraction.len() {
        return Err(IngestionError::InputMismatch(format!(
            "altitude has {} cells, land fraction has {}",
            altitude.len(),
            land_fraction.len()
        )));
    }
    for (height, fraction) in altitude.iter_mut().zip(land_fraction) {
        if *fraction < LAND_FRACTION_THRESHOLD {
            *height = OCEAN_ELEVATION;
        }
    }
    Ok(())
}

/// Mask `altitude` with `land_fraction` and store it as the model's
/// elevation artifact at `path`.
///
/// `shape` is the decoded archive shape; the artifact keeps its `(ny, nx)`
/// layout. A grid that differs from the catalog is stored as decoded and
/// logged, since every series of the model is decoded the same way.
pub fn write_elevation(
    path: &Path,
    store: &StoreConfig,
    model: Model,
    shape: FieldShape,
    mut altitude: SpaceMajorArray,
    land_fraction: &SpaceMajorArray,
) -> Result<()> {
    if altitude.n_time != 1 || altitude.n_locations != shape.n_locations() {
        return Err(IngestionError::InputMismatch(format!(
            "orography of {} has {} locations x {} steps, expected {}x{}",
            model, altitude.n_locations, altitude.n_time, shape.ny, shape.nx
        )));
    }
    let grid = model.grid();
    if shape.n_locations() != grid.count() {
        warn!(
            model = %model,
            ny = shape.ny,
            nx = shape.nx,
            catalog_ny = grid.ny,
            catalog_nx = grid.nx,
            "Orography grid differs from catalog"
        );
    }
    mask_ocean(&mut altitude.data, &land_fraction.data)?;

    let writer = TimeSeriesWriter::new(store.clone());
    let spec = SeriesSpec::static_field(store, shape.ny, shape.nx, 1.0)
        .attribute("model", model.as_str())
        .attribute("variable", "elevation")
        .attribute("units", "m")
        .attribute("ocean_sentinel", OCEAN_ELEVATION);
    writer.create(path, spec)?.write_all(altitude.data)?;

    info!(model = %model, path = %path.display(), "Surface elevation written");
    Ok(())
}

/// Pipeline-owned cache of opened elevation artifacts.
///
/// Each model's field is read once on first use and shared until closed.
pub struct ElevationRegistry {
    paths: HashMap<Model, PathBuf>,
    loaded: RwLock<HashMap<Model, Arc<Vec<f32>>>>,
}

impl ElevationRegistry {
    pub fn new() -> Self {
        Self {
            paths: HashMap::new(),
            loaded: RwLock::new(HashMap::new()),
        }
    }

    /// Register where a model's elevation artifact lives.
    pub fn register(&mut self, model: Model, path: PathBuf) {
        self.paths.insert(model, path);
    }

    pub fn path(&self, model: Model) -> Option<&Path> {
        self.paths.get(&model).map(PathBuf::as_path)
    }

    /// Elevation of every location of `model`, in grid order.
    pub async fn get(&self, model: Model) -> Result<Arc<Vec<f32>>> {
        if let Some(field) = self.loaded.read().await.get(&model) {
            return Ok(field.clone());
        }

        let path = self
            .paths
            .get(&model)
            .cloned()
            .ok_or_else(|| IngestionError::ElevationUnavailable(model.to_string()))?;
        if !path.exists() {
            return Err(IngestionError::ElevationUnavailable(model.to_string()));
        }

        let mut loaded = self.loaded.write().await;
        // another task may have loaded it while we waited for the lock
        if let Some(field) = loaded.get(&model) {
            return Ok(field.clone());
        }

        let field = tokio::task::spawn_blocking(move || -> Result<Vec<f32>> {
            Ok(TimeSeriesReader::open(&path)?.read_all()?)
        })
        .await??;
        debug!(model = %model, locations = field.len(), "Elevation loaded");

        let field = Arc::new(field);
        loaded.insert(model, field.clone());
        Ok(field)
    }

    /// Drop the cached field of `model`. Returns whether one was loaded.
    pub async fn close(&self, model: Model) -> bool {
        self.loaded.write().await.remove(&model).is_some()
    }

    /// Drop every cached field.
    pub async fn close_all(&self) {
        self.loaded.write().await.clear();
    }

    pub async fn is_loaded(&self, model: Model) -> bool {
        self.loaded.read().await.contains_key(&model)
    }
}

impl Default for ElevationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_ocean() {
        let mut altitude = vec![0.0, 120.0, 800.0, 3.0];
        mask_ocean(&mut altitude, &[0.0, 0.5, 1.0, 0.49]).unwrap();
        assert_eq!(altitude, vec![OCEAN_ELEVATION, 120.0, 800.0, OCEAN_ELEVATION]);
    }

    #[test]
    fn test_mask_ocean_length_mismatch() {
        let mut altitude = vec![0.0; 3];
        assert!(mask_ocean(&mut altitude, &[1.0; 2]).is_err());
    }

    #[test]
    fn test_write_elevation_masks_ocean() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("HSURF.zarr");
        let shape = FieldShape { nt: 1, ny: 2, nx: 2 };
        let altitude = SpaceMajorArray::new(vec![10.0, 20.0, 30.0, 40.0], 4, 1).unwrap();
        let land = SpaceMajorArray::new(vec![1.0, 0.0, 0.9, 0.2], 4, 1).unwrap();

        write_elevation(&path, &StoreConfig::default(), Model::CMCC_CM2_VHR4, shape, altitude, &land)
            .unwrap();

        let reader = TimeSeriesReader::open(&path).unwrap();
        assert_eq!(reader.shape(), [2, 2]);
        assert_eq!(
            reader.read_all().unwrap(),
            vec![10.0, OCEAN_ELEVATION, 30.0, OCEAN_ELEVATION]
        );
    }

    #[test]
    fn test_write_elevation_rejects_series() {
        let dir = tempfile::tempdir().unwrap();
        let shape = FieldShape { nt: 1, ny: 1, nx: 2 };
        let altitude = SpaceMajorArray::new(vec![1.0; 4], 2, 2).unwrap();
        let land = SpaceMajorArray::new(vec![1.0; 2], 2, 1).unwrap();
        let err = write_elevation(
            &dir.path().join("HSURF.zarr"),
            &StoreConfig::default(),
            Model::CMCC_CM2_VHR4,
            shape,
            altitude,
            &land,
        )
        .unwrap_err();
        assert!(matches!(err, IngestionError::InputMismatch(_)));
    }

    #[tokio::test]
    async fn test_registry_unknown_model() {
        let registry = ElevationRegistry::new();
        let err = registry.get(Model::HiRAM_SIT_HR).await.unwrap_err();
        assert!(matches!(err, IngestionError::ElevationUnavailable(_)));
    }

    #[tokio::test]
    async fn test_registry_loads_once_and_closes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("HSURF.zarr");
        let store = StoreConfig::default();
        let writer = TimeSeriesWriter::new(store.clone());
        writer
            .create(&path, SeriesSpec::static_field(&store, 2, 3, 1.0))
            .unwrap()
            .write_all(vec![1.0, 2.0, 3.0, 4.0, 5.0, OCEAN_ELEVATION])
            .unwrap();

        let mut registry = ElevationRegistry::new();
        registry.register(Model::MRI_AGCM3_2_S, path.clone());

        let first = registry.get(Model::MRI_AGCM3_2_S).await.unwrap();
        assert_eq!(first.len(), 6);
        assert_eq!(first[5], OCEAN_ELEVATION);

        // served from the cache even once the file is gone
        std::fs::remove_dir_all(&path).unwrap();
        let second = registry.get(Model::MRI_AGCM3_2_S).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        assert!(registry.close(Model::MRI_AGCM3_2_S).await);
        assert!(!registry.is_loaded(Model::MRI_AGCM3_2_S).await);
        assert!(registry.get(Model::MRI_AGCM3_2_S).await.is_err());
    }

    #[tokio::test]
    async fn test_registry_close_all() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("HSURF.zarr");
        let store = StoreConfig::default();
        TimeSeriesWriter::new(store.clone())
            .create(&path, SeriesSpec::static_field(&store, 1, 2, 1.0))
            .unwrap()
            .write_all(vec![10.0, OCEAN_ELEVATION])
            .unwrap();

        let mut registry = ElevationRegistry::new();
        registry.register(Model::MRI_AGCM3_2_S, path.clone());
        registry.register(Model::FGOALS_f3_H, path);
        registry.get(Model::MRI_AGCM3_2_S).await.unwrap();
        registry.get(Model::FGOALS_f3_H).await.unwrap();

        registry.close_all().await;
        assert!(!registry.is_loaded(Model::MRI_AGCM3_2_S).await);
        assert!(!registry.is_loaded(Model::FGOALS_f3_H).await);
        // closing releases the cache only, the file is read again on demand
        assert_eq!(*registry.get(Model::FGOALS_f3_H).await.unwrap(), vec![10.0, OCEAN_ELEVATION]);
    }
}

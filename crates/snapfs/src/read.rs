//! The read pipeline: load a stored snapshot and dereference its
//! components.

use crate::config::Config;
use crate::error::Error;
use dataset::{Component, Dataset, StoredComponent};
use std::future::Future;
use store::{Address, ObjectStore, StoreError};

/// Load the snapshot at `address`, dereferencing every component stored in
/// reference form. The body is never loaded eagerly; use [`load_body`].
///
/// Each fetch is bounded by `config.open_file_timeout`: stores that fall
/// back to network fetches would otherwise stall a load indefinitely, so an
/// unresolvable reference reads as not found.
#[tracing::instrument(skip_all, fields(address = %address))]
pub async fn load_dataset(
    store: &dyn ObjectStore,
    address: &Address,
    config: &Config,
) -> Result<Dataset, Error> {
    let links = bounded(config, address, store.get_node(address)).await?;

    let dataset_address = links
        .get(&Component::Dataset.filename(""))
        .ok_or_else(|| StoreError::NotFound(address.clone()))?;
    let raw = bounded(config, dataset_address, store.get(dataset_address)).await?;
    let mut ds: Dataset = serde_json::from_slice(&raw).map_err(|source| Error::InvalidComponent {
        component: Component::Dataset,
        source,
    })?;
    ds.path = address.clone();

    if let Some(meta) = ds.meta.as_mut() {
        if meta.is_reference() {
            *meta = load_component(store, config, Component::Meta, &meta.path.clone()).await?;
        }
    }
    if let Some(structure) = ds.structure.as_mut() {
        if structure.is_reference() {
            *structure =
                load_component(store, config, Component::Structure, &structure.path.clone())
                    .await?;
        }
    }
    if let Some(transform) = ds.transform.as_mut() {
        if transform.is_reference() {
            *transform =
                load_component(store, config, Component::Transform, &transform.path.clone())
                    .await?;
        }
    }
    if let Some(viz) = ds.viz.as_mut() {
        if viz.is_reference() {
            *viz = load_component(store, config, Component::Viz, &viz.path.clone()).await?;
        }
    }
    if let Some(readme) = ds.readme.as_mut() {
        if readme.is_reference() {
            *readme =
                load_component(store, config, Component::Readme, &readme.path.clone()).await?;
        }
    }
    if let Some(stats) = ds.stats.as_mut() {
        if stats.is_reference() {
            *stats = load_component(store, config, Component::Stats, &stats.path.clone()).await?;
        }
    }
    if let Some(commit) = ds.commit.as_mut() {
        if commit.is_reference() {
            *commit =
                load_component(store, config, Component::Commit, &commit.path.clone()).await?;
        }
    }

    Ok(ds)
}

/// Open the snapshot's body, returning a readable handle. Format
/// interpretation is the caller's concern.
pub async fn load_body(
    store: &dyn ObjectStore,
    ds: &Dataset,
) -> Result<impl tokio::io::AsyncRead + Send + Unpin, Error> {
    if ds.body_path.is_empty() {
        return Err(Error::MissingBody);
    }
    let bytes = store.get(&ds.body_path).await?;
    Ok(std::io::Cursor::new(bytes))
}

/// Fetch and decode one component, preserving its store address.
async fn load_component<T>(
    store: &dyn ObjectStore,
    config: &Config,
    component: Component,
    address: &Address,
) -> Result<T, Error>
where
    T: StoredComponent + serde::de::DeserializeOwned,
{
    let raw = bounded(config, address, store.get(address)).await?;
    let mut loaded: T = serde_json::from_slice(&raw)
        .map_err(|source| Error::InvalidComponent { component, source })?;
    *loaded.path_mut() = address.clone();
    Ok(loaded)
}

/// Bound a store operation by the configured open timeout, mapping a lapse
/// to not-found.
async fn bounded<T>(
    config: &Config,
    address: &Address,
    operation: impl Future<Output = Result<T, StoreError>>,
) -> Result<T, Error> {
    match tokio::time::timeout(config.open_file_timeout, operation).await {
        Ok(result) => Ok(result?),
        Err(_elapsed) => Err(Error::Store(StoreError::NotFound(address.clone()))),
    }
}

//! Turning geolocation or a search pick into a [`LocationQuery`].

use async_trait::async_trait;
use std::fmt::Debug;
use tokio_util::sync::CancellationToken;

use crate::{
    error::ResolutionError,
    model::{Coordinate, LocationQuery},
};

/// Host capability that can report where the user is.
#[async_trait]
pub trait GeolocationSource: Send + Sync + Debug {
    fn is_supported(&self) -> bool;

    /// Single-shot position request. No timeout is imposed here; the source
    /// applies its own, if any.
    async fn current_position(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Coordinate, ResolutionError>;
}

/// A host with no geolocation at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unavailable;

#[async_trait]
impl GeolocationSource for Unavailable {
    fn is_supported(&self) -> bool {
        false
    }

    async fn current_position(
        &self,
        _cancel: &CancellationToken,
    ) -> Result<Coordinate, ResolutionError> {
        Err(ResolutionError::Unsupported)
    }
}

/// Position the user configured ahead of time.
#[derive(Debug, Clone, Copy)]
pub struct FixedPosition {
    coordinate: Coordinate,
}

impl FixedPosition {
    pub fn new(coordinate: Coordinate) -> Self {
        Self { coordinate }
    }
}

#[async_trait]
impl GeolocationSource for FixedPosition {
    fn is_supported(&self) -> bool {
        true
    }

    async fn current_position(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Coordinate, ResolutionError> {
        if cancel.is_cancelled() {
            return Err(ResolutionError::Denied);
        }
        Ok(self.coordinate)
    }
}

/// A city picked from search results.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSelection {
    pub coordinate: Coordinate,
    /// e.g. "London, GB"
    pub label: String,
}

/// Ask the host where we are. The label is left for the provider to fill.
pub async fn resolve_current_location(
    source: &dyn GeolocationSource,
    cancel: &CancellationToken,
) -> Result<LocationQuery, ResolutionError> {
    if !source.is_supported() {
        tracing::info!("Geolocation unsupported on this host");
        return Err(ResolutionError::Unsupported);
    }

    let coordinate = source.current_position(cancel).await.inspect_err(|e| {
        tracing::warn!(error = %e, "Geolocation failed");
    })?;

    tracing::info!(%coordinate, "Resolved host location");
    Ok(LocationQuery::new(coordinate, None))
}

pub fn resolve_from_search_selection(selection: &SearchSelection) -> LocationQuery {
    LocationQuery::new(selection.coordinate, Some(selection.label.clone()))
}

//! Async client for a remote geospatial compute service.
//!
//! Sends logical objects from `geofetch-protocol` to the service and
//! assembles the responses into labelled arrays:
//!
//! ```text
//! ImageCollection
//!      │
//!      ├─► timestamps / id / size / band names   (value:compute)
//!      │
//!      ├─► image 0..N, at most max_workers at once (image:computePixels)
//!      │         │
//!      │         └─► RetryingTransport: backoff on 5xx, 429, network errors
//!      │
//!      └─► stack by index ─► mask / nodata ─► SeriesDataset
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use geofetch_client::{ClientConfig, ComputeClient, EnvToken, FetchOptions};
//! use geofetch_common::{BoundingBox, Domain};
//! use geofetch_protocol::ImageCollection;
//!
//! let client = ComputeClient::new(
//!     ClientConfig::from_env()?,
//!     Arc::new(EnvToken::new("GEOFETCH_ACCESS_TOKEN")),
//! )?;
//! let domain = Domain::new(BoundingBox::new(-105.3, 39.9, -105.1, 40.1), 0.001, "EPSG:4326")?;
//! let series = client
//!     .collection_to_dataset(&domain, &ImageCollection::load("MODIS/061/MOD13A2"), &FetchOptions::default())
//!     .await?;
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod dataset;
pub mod error;
pub mod export;
pub mod orchestrator;
pub mod transport;

pub use auth::{EnvToken, NoAuth, StaticToken, TokenFile, TokenProvider};
pub use client::ComputeClient;
pub use config::{ClientConfig, RetrySettings};
pub use dataset::{
    timestamp_from_millis, Axis, FetchOptions, ImageDataset, SeriesBand, SeriesDataset,
};
pub use error::{ErrorKind, FetchError, FetchResult};
pub use orchestrator::{batch_progress, fetch_indexed};
pub use transport::{RawResponse, RetryPolicy, Transport};

//! High-level fetches against the compute service.

use std::sync::Arc;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument};

use geofetch_common::Domain;
use geofetch_protocol::{
    build_image_payload, build_table_payload, build_value_payload, decode_error_body,
    decode_image_response, decode_table_response, decode_value_response, ComputedValue,
    DataFormat, FeatureCollection, FeatureTable, Image, ImageCollection, ImagePixels,
    LogicalObject,
};

use crate::auth::TokenProvider;
use crate::config::ClientConfig;
use crate::dataset::{timestamp_from_millis, FetchOptions, ImageDataset, SeriesDataset};
use crate::error::{FetchError, FetchResult};
use crate::orchestrator::{batch_progress, fetch_indexed};
use crate::transport::{RetryPolicy, Transport};

pub const COMPUTE_PIXELS: &str = "image:computePixels";
pub const COMPUTE_FEATURES: &str = "table:computeFeatures";
pub const COMPUTE_VALUE: &str = "value:compute";

/// Client for the pixel, table and value endpoints of one project.
#[derive(Debug, Clone)]
pub struct ComputeClient {
    transport: Transport,
    config: Arc<ClientConfig>,
}

impl ComputeClient {
    /// Validates `config` and builds the shared HTTP client.
    pub fn new(config: ClientConfig, tokens: Arc<dyn TokenProvider>) -> FetchResult<Self> {
        config.validate()?;
        let transport = Transport::new(&config, tokens)?;
        Ok(Self {
            transport,
            config: Arc::new(config),
        })
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.transport = self.transport.with_policy(policy);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// POST to `method` and return the body of a successful response.
    async fn post<P>(&self, method: &str, payload: &P) -> FetchResult<Bytes>
    where
        P: Serialize + ?Sized,
    {
        let url = self.config.endpoint(method);
        let response = self.transport.send(&url, payload).await?;
        if !response.is_success() {
            let message = decode_error_body(&response.body).unwrap_or_else(|| {
                String::from_utf8_lossy(&response.body).trim().to_string()
            });
            return Err(FetchError::RemoteCompute {
                status: response.status,
                message,
            });
        }
        Ok(response.body)
    }

    /// Evaluate `value` remotely.
    pub async fn compute_value(&self, value: &ComputedValue) -> FetchResult<Value> {
        let body = self.post(COMPUTE_VALUE, &build_value_payload(value)).await?;
        Ok(decode_value_response(&body)?)
    }

    /// Evaluate `value` and deserialize the result.
    pub async fn compute_value_as<T>(&self, value: &ComputedValue) -> FetchResult<T>
    where
        T: DeserializeOwned,
    {
        let result = self.compute_value(value).await?;
        serde_json::from_value(result)
            .map_err(|e| FetchError::unexpected(format!("{}: {}", value.label(), e)))
    }

    async fn resolve_bands(&self, image: &Image, bands: Option<&[String]>) -> FetchResult<Vec<String>> {
        match bands {
            Some(bands) if !bands.is_empty() => Ok(bands.to_vec()),
            _ => self.compute_value_as(&image.band_names()).await,
        }
    }

    /// Pixels of `image` over `domain`.
    ///
    /// Bands default to all bands of the image. The format is checked before
    /// any request is made.
    #[instrument(skip(self, domain, image, bands, format), fields(image = %image.label(), format = %format))]
    pub async fn get_image(
        &self,
        domain: &Domain,
        image: &Image,
        bands: Option<&[String]>,
        format: DataFormat,
    ) -> FetchResult<ImagePixels> {
        let grid = domain.pixel_grid();
        build_image_payload(image, &grid, &[], format)?;

        let bands = self.resolve_bands(image, bands).await?;
        let payload = build_image_payload(image, &grid, &bands, format)?;
        let body = self.post(COMPUTE_PIXELS, &payload).await?;
        debug!(bytes = body.len(), "Received pixels");
        Ok(decode_image_response(body, format, domain.shape())?)
    }

    /// Features of `collection` as GeoJSON.
    #[instrument(skip(self, collection), fields(table = %collection.label()))]
    pub async fn get_table(&self, collection: &FeatureCollection) -> FetchResult<FeatureTable> {
        let body = self
            .post(COMPUTE_FEATURES, &build_table_payload(collection))
            .await?;
        let table = decode_table_response(&body)?;
        debug!(features = table.len(), "Received features");
        Ok(table)
    }

    /// Fetch `image` as NPY and label it with the domain's coordinates.
    pub async fn image_to_dataset(
        &self,
        domain: &Domain,
        image: &Image,
        options: &FetchOptions,
    ) -> FetchResult<ImageDataset> {
        let bands = self
            .get_image(domain, image, options.bands.as_deref(), DataFormat::Npy)
            .await?
            .into_bands()
            .ok_or_else(|| FetchError::unexpected("pixel response carried no bands"))?;
        let dataset = ImageDataset::assemble(domain, bands, options, image.label());
        info!(image = %image.label(), bands = dataset.bands.len(), "Image fetched");
        Ok(dataset)
    }

    /// Fetch every image of `collection` and stack them along time.
    ///
    /// At most `options.max_workers` images are requested at once, falling
    /// back to the configured `max_workers`.
    ///
    /// Any failing image aborts the whole fetch with
    /// [`FetchError::BatchAborted`].
    #[instrument(skip(self, domain, collection, options), fields(collection = %collection.label()))]
    pub async fn collection_to_dataset(
        &self,
        domain: &Domain,
        collection: &ImageCollection,
        options: &FetchOptions,
    ) -> FetchResult<SeriesDataset> {
        let timestamps = collection.timestamps();
        let collection_id = collection.collection_id();
        let size = collection.size();
        let (timestamps, collection_id, size) = futures::try_join!(
            self.compute_value_as::<Vec<Option<f64>>>(&timestamps),
            self.compute_value_as::<Option<String>>(&collection_id),
            self.compute_value_as::<usize>(&size),
        )?;

        if size == 0 {
            return Err(FetchError::EmptyCollection(collection.label().to_string()));
        }
        if timestamps.len() != size {
            return Err(FetchError::unexpected(format!(
                "{} timestamps for {} images",
                timestamps.len(),
                size
            )));
        }
        let time = timestamps
            .into_iter()
            .enumerate()
            .map(|(index, millis)| {
                millis
                    .ok_or_else(|| FetchError::unexpected(format!("image {} has no time_start", index)))
                    .and_then(timestamp_from_millis)
            })
            .collect::<FetchResult<Vec<_>>>()?;

        let bands = self
            .resolve_bands(&collection.first(), options.bands.as_deref())
            .await?;
        let workers = options.max_workers.unwrap_or(self.config.max_workers);
        info!(images = size, bands = ?bands, workers, "Fetching collection");

        let progress = batch_progress(size, options.verbose);
        let items = fetch_indexed(size, workers, &progress, |index| {
            let image = collection.image_at(index, size);
            let bands = bands.as_slice();
            async move {
                self.get_image(domain, &image, Some(bands), DataFormat::Npy)
                    .await?
                    .into_bands()
                    .ok_or_else(|| FetchError::unexpected("pixel response carried no bands"))
            }
        })
        .await?;

        let series = SeriesDataset::assemble(
            domain,
            &bands,
            items,
            time,
            collection_id,
            options,
            collection.label(),
        )?;
        info!(images = series.len(), "Collection fetched");
        Ok(series)
    }

    /// Domain covering the features of `collection`, masked to them.
    pub async fn domain_from_features(
        &self,
        collection: &FeatureCollection,
        resolution: f64,
    ) -> FetchResult<Domain> {
        let table = self.get_table(collection).await?;
        Ok(table.domain(resolution)?)
    }
}

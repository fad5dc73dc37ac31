//! Labelled arrays assembled from pixel responses.

use chrono::{DateTime, TimeZone, Utc};
use ndarray::{Array2, Array3, Axis as NdAxis, Zip};

use geofetch_common::{AffineTransform, Crs, Domain};
use geofetch_protocol::Band;

use crate::error::{FetchError, FetchResult};

/// Options shared by image and collection fetches.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOptions {
    /// Bands to request; `None` asks the service for all of them.
    pub bands: Option<Vec<String>>,
    /// Pool size for collection fetches; `None` uses the client config.
    pub max_workers: Option<usize>,
    /// Draw a progress bar while a collection is fetched.
    pub verbose: bool,
    /// Set cells outside the domain mask to NaN.
    pub apply_mask: bool,
    /// Cells equal to this value become NaN.
    pub no_data_value: Option<f64>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            bands: None,
            max_workers: None,
            verbose: false,
            apply_mask: true,
            no_data_value: None,
        }
    }
}

impl FetchOptions {
    pub fn with_bands<I, S>(mut self, bands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bands = Some(bands.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_no_data(mut self, value: f64) -> Self {
        self.no_data_value = Some(value);
        self
    }

    /// Replace sentinel and outside-mask cells with NaN.
    pub fn post_process(&self, data: &mut Array2<f64>, mask: &Array2<bool>) {
        if let Some(no_data) = self.no_data_value {
            data.mapv_inplace(|v| if v == no_data { f64::NAN } else { v });
        }
        if self.apply_mask && mask.dim() == data.dim() {
            Zip::from(data).and(mask).for_each(|v, &inside| {
                if !inside {
                    *v = f64::NAN;
                }
            });
        }
    }
}

/// A labelled coordinate axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    pub name: &'static str,
    pub long_name: &'static str,
    pub units: &'static str,
    pub values: Vec<f64>,
}

/// x and y axes of `domain`, named after its CRS.
fn spatial_axes(domain: &Domain) -> (Axis, Axis) {
    let labels = domain.crs().axis_labels();
    (
        Axis {
            name: labels.x_name,
            long_name: labels.x_long_name,
            units: labels.x_units,
            values: domain.x_coords().to_vec(),
        },
        Axis {
            name: labels.y_name,
            long_name: labels.y_long_name,
            units: labels.y_units,
            values: domain.y_coords().to_vec(),
        },
    )
}

/// A single fetched image.
#[derive(Debug, Clone)]
pub struct ImageDataset {
    /// Bands in request order, each (height, width).
    pub bands: Vec<Band>,
    pub x: Axis,
    pub y: Axis,
    pub crs: Crs,
    pub transform: AffineTransform,
    pub label: String,
}

impl ImageDataset {
    pub(crate) fn assemble(
        domain: &Domain,
        mut bands: Vec<Band>,
        options: &FetchOptions,
        label: impl Into<String>,
    ) -> Self {
        for band in &mut bands {
            options.post_process(&mut band.data, domain.mask());
        }
        let (x, y) = spatial_axes(domain);
        Self {
            bands,
            x,
            y,
            crs: domain.crs().clone(),
            transform: *domain.transform(),
            label: label.into(),
        }
    }

    pub fn band(&self, name: &str) -> Option<&Array2<f64>> {
        self.bands.iter().find(|b| b.name == name).map(|b| &b.data)
    }

    pub fn band_names(&self) -> Vec<&str> {
        self.bands.iter().map(|b| b.name.as_str()).collect()
    }

    /// (height, width)
    pub fn shape(&self) -> (usize, usize) {
        (self.y.values.len(), self.x.values.len())
    }
}

/// One band of a time series, shaped (time, height, width).
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesBand {
    pub name: String,
    pub data: Array3<f64>,
}

/// A fetched image collection stacked along a time axis.
#[derive(Debug, Clone)]
pub struct SeriesDataset {
    pub bands: Vec<SeriesBand>,
    pub time: Vec<DateTime<Utc>>,
    /// `None` for collections computed on the fly.
    pub collection_id: Option<String>,
    pub x: Axis,
    pub y: Axis,
    pub crs: Crs,
    pub transform: AffineTransform,
    pub label: String,
}

impl SeriesDataset {
    /// Stack per-item bands, already in index order, into one array per
    /// band. Every item must carry `band_names` in that order.
    pub(crate) fn assemble(
        domain: &Domain,
        band_names: &[String],
        items: Vec<Vec<Band>>,
        time: Vec<DateTime<Utc>>,
        collection_id: Option<String>,
        options: &FetchOptions,
        label: impl Into<String>,
    ) -> FetchResult<Self> {
        let (height, width) = domain.shape();
        let mut stacks: Vec<Array3<f64>> = band_names
            .iter()
            .map(|_| Array3::from_elem((items.len(), height, width), f64::NAN))
            .collect();

        for (index, item) in items.into_iter().enumerate() {
            let actual: Vec<String> = item.iter().map(|b| b.name.clone()).collect();
            if actual.as_slice() != band_names {
                return Err(FetchError::BandMismatch {
                    index,
                    expected: band_names.to_vec(),
                    actual,
                });
            }
            for (stack, mut band) in stacks.iter_mut().zip(item) {
                if band.data.dim() != (height, width) {
                    return Err(geofetch_protocol::ProtocolError::shape_mismatch(
                        (height, width),
                        band.data.shape(),
                    )
                    .into());
                }
                options.post_process(&mut band.data, domain.mask());
                stack.index_axis_mut(NdAxis(0), index).assign(&band.data);
            }
        }

        let (x, y) = spatial_axes(domain);
        Ok(Self {
            bands: band_names
                .iter()
                .cloned()
                .zip(stacks)
                .map(|(name, data)| SeriesBand { name, data })
                .collect(),
            time,
            collection_id,
            x,
            y,
            crs: domain.crs().clone(),
            transform: *domain.transform(),
            label: label.into(),
        })
    }

    pub fn band(&self, name: &str) -> Option<&Array3<f64>> {
        self.bands.iter().find(|b| b.name == name).map(|b| &b.data)
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// The image at time step `index`.
    pub fn image_at(&self, index: usize) -> Option<ImageDataset> {
        if index >= self.len() {
            return None;
        }
        Some(ImageDataset {
            bands: self
                .bands
                .iter()
                .map(|b| Band {
                    name: b.name.clone(),
                    data: b.data.index_axis(NdAxis(0), index).to_owned(),
                })
                .collect(),
            x: self.x.clone(),
            y: self.y.clone(),
            crs: self.crs.clone(),
            transform: self.transform,
            label: format!("{}[{}]", self.label, index),
        })
    }
}

/// Milliseconds since the epoch to UTC.
pub fn timestamp_from_millis(millis: f64) -> FetchResult<DateTime<Utc>> {
    if !millis.is_finite() {
        return Err(FetchError::unexpected(format!("invalid timestamp {}", millis)));
    }
    Utc.timestamp_millis_opt(millis.round() as i64)
        .single()
        .ok_or_else(|| FetchError::unexpected(format!("timestamp {} out of range", millis)))
}

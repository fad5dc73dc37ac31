//! Float64 GeoTIFF export of decoded datasets.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use tiff::encoder::{colortype::Gray64Float, TiffEncoder};
use tiff::tags::Tag;
use tracing::info;

use geofetch_common::{AffineTransform, Crs};

use crate::dataset::ImageDataset;
use crate::error::{FetchError, FetchResult};

const GT_MODEL_TYPE_KEY: u16 = 1024;
const GT_RASTER_TYPE_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_KEY: u16 = 3072;

const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_AREA: u16 = 1;

/// GeoKeyDirectory entries for `crs`: header then (key, location, count, value).
fn geo_keys(crs: &Crs) -> Vec<u16> {
    let geographic = crs.is_geographic();
    let mut keys = vec![
        (
            GT_MODEL_TYPE_KEY,
            if geographic {
                MODEL_TYPE_GEOGRAPHIC
            } else {
                MODEL_TYPE_PROJECTED
            },
        ),
        (GT_RASTER_TYPE_KEY, RASTER_PIXEL_IS_AREA),
    ];
    if let Some(code) = crs.epsg_code().and_then(|c| u16::try_from(c).ok()) {
        let key = if geographic {
            GEOGRAPHIC_TYPE_KEY
        } else {
            PROJECTED_CS_TYPE_KEY
        };
        keys.push((key, code));
    }

    let mut directory = vec![1, 1, 0, keys.len() as u16];
    for (key, value) in keys {
        directory.extend_from_slice(&[key, 0, 1, value]);
    }
    directory
}

fn pixel_scale(transform: &AffineTransform) -> [f64; 3] {
    [transform.scale_x, transform.scale_y.abs(), 0.0]
}

fn tiepoint(transform: &AffineTransform) -> [f64; 6] {
    [0.0, 0.0, 0.0, transform.translate_x, transform.translate_y, 0.0]
}

impl ImageDataset {
    /// Write every band as one float64 page of a GeoTIFF, NaN as nodata.
    pub fn write_geotiff(&self, path: impl AsRef<Path>) -> FetchResult<()> {
        let path = path.as_ref();
        if self.bands.is_empty() {
            return Err(FetchError::config("dataset has no bands to write"));
        }
        let (height, width) = self.shape();
        let keys = geo_keys(&self.crs);
        let scale = pixel_scale(&self.transform);
        let tie = tiepoint(&self.transform);

        let file = BufWriter::new(File::create(path)?);
        let mut encoder = TiffEncoder::new(file)?;

        for band in &self.bands {
            let mut image = encoder.new_image::<Gray64Float>(width as u32, height as u32)?;
            let dir = image.encoder();
            dir.write_tag(Tag::ModelPixelScaleTag, &scale[..])?;
            dir.write_tag(Tag::ModelTiepointTag, &tie[..])?;
            dir.write_tag(Tag::GeoKeyDirectoryTag, &keys[..])?;
            dir.write_tag(Tag::GdalNodata, "nan")?;

            let data: Vec<f64> = band.data.iter().copied().collect();
            image.write_data(&data)?;
        }

        info!(path = %path.display(), bands = self.bands.len(), width, height, "Wrote GeoTIFF");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::FetchOptions;
    use geofetch_common::{BoundingBox, Domain};
    use geofetch_protocol::Band;
    use ndarray::Array2;
    use tiff::decoder::{Decoder, DecodingResult};

    fn dataset() -> ImageDataset {
        let domain =
            Domain::new(BoundingBox::new(10.0, 40.0, 13.0, 42.0), 1.0, "EPSG:4326").unwrap();
        let bands = vec![
            Band {
                name: "a".to_string(),
                data: Array2::from_shape_fn((2, 3), |(r, c)| (r * 3 + c) as f64),
            },
            Band {
                name: "b".to_string(),
                data: Array2::from_elem((2, 3), -1.5),
            },
        ];
        ImageDataset::assemble(&domain, bands, &FetchOptions::default(), "test")
    }

    #[test]
    fn test_geo_keys_for_wgs84() {
        assert_eq!(
            geo_keys(&Crs::wgs84()),
            vec![1, 1, 0, 3, 1024, 0, 1, 2, 1025, 0, 1, 1, 2048, 0, 1, 4326]
        );
        let utm = geo_keys(&Crs::new("EPSG:32633"));
        assert_eq!(&utm[12..], &[3072, 0, 1, 32633]);
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = test_utils::temp_test_dir_with_prefix("geofetch_export");
        let path = dir.path().join("out.tif");
        dataset().write_geotiff(&path).unwrap();

        let mut decoder = Decoder::new(File::open(&path).unwrap()).unwrap();
        assert_eq!(decoder.dimensions().unwrap(), (3, 2));
        let scale = decoder.get_tag_f64_vec(Tag::ModelPixelScaleTag).unwrap();
        assert_eq!(scale, vec![1.0, 1.0, 0.0]);
        let tie = decoder.get_tag_f64_vec(Tag::ModelTiepointTag).unwrap();
        assert_eq!(&tie[3..5], &[10.0, 42.0]);
        let keys = decoder.get_tag_u16_vec(Tag::GeoKeyDirectoryTag).unwrap();
        assert_eq!(keys, geo_keys(&Crs::wgs84()));
        let no_data = decoder.get_tag_ascii_string(Tag::GdalNodata).unwrap();
        assert!(no_data.starts_with("nan"));

        match decoder.read_image().unwrap() {
            DecodingResult::F64(values) => assert_eq!(values, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]),
            _ => panic!("expected f64 pixels"),
        }
        assert!(decoder.more_images());
        decoder.next_image().unwrap();
        match decoder.read_image().unwrap() {
            DecodingResult::F64(values) => assert!(values.iter().all(|&v| v == -1.5)),
            _ => panic!("expected f64 pixels"),
        }
    }

    #[test]
    fn test_empty_dataset_is_rejected() {
        let mut ds = dataset();
        ds.bands.clear();
        let dir = tempfile::tempdir().unwrap();
        assert!(ds.write_geotiff(dir.path().join("x.tif")).is_err());
    }
}

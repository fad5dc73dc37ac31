//! Subcommand implementations.

use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::info;

use geofetch_client::{timestamp_from_millis, ComputeClient, FetchOptions};
use geofetch_common::Domain;
use geofetch_protocol::{
    ComputedValue, DataFormat, Expression, FeatureCollection, Image, ImageCollection, ImagePixels,
    TIME_START_PROPERTY,
};

use crate::summary::{band_summary, BandSummary};
use crate::GridArgs;

impl GridArgs {
    fn domain(&self) -> Result<Domain> {
        Domain::new(self.bbox, self.resolution, self.crs.as_str())
            .with_context(|| format!("Invalid grid {:?} at resolution {}", self.bbox, self.resolution))
    }

    fn options(&self) -> FetchOptions {
        FetchOptions {
            bands: (!self.bands.is_empty()).then(|| self.bands.clone()),
            apply_mask: !self.no_mask,
            no_data_value: self.no_data,
            ..FetchOptions::default()
        }
    }
}

pub async fn value(client: &ComputeClient, path: &Path) -> Result<()> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let expression = Expression::from_json(&json)
        .with_context(|| format!("Invalid expression in {}", path.display()))?;
    let value = ComputedValue::from_expression(&expression, path.display().to_string())?;

    let result = client.compute_value(&value).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

pub async fn image(
    client: &ComputeClient,
    image_id: &str,
    grid: &GridArgs,
    format: DataFormat,
    output: Option<&Path>,
) -> Result<()> {
    let domain = grid.domain()?;
    let image = Image::load(image_id);
    info!(image = image_id, shape = ?domain.shape(), format = %format, "Fetching image");

    if format == DataFormat::GeoTiff {
        let Some(output) = output else {
            bail!("GEO_TIFF output requires --output");
        };
        let bands = grid.options().bands;
        let pixels = client
            .get_image(&domain, &image, bands.as_deref(), format)
            .await?;
        pixels
            .write_geotiff(output)
            .with_context(|| format!("Failed to write {}", output.display()))?;
        if let ImagePixels::GeoTiff(bytes) = &pixels {
            println!("Wrote {} bytes to {}", bytes.len(), output.display());
        }
        return Ok(());
    }

    let options = grid.options();
    let time_query = image.get(TIME_START_PROPERTY);
    let (dataset, time_start) = futures::try_join!(
        client.image_to_dataset(&domain, &image, &options),
        client.compute_value_as::<Option<f64>>(&time_query),
    )?;
    let (height, width) = dataset.shape();
    println!("{}  {}x{}  {}", image_id, width, height, dataset.crs);
    if let Some(time) = time_start.map(timestamp_from_millis).transpose()? {
        println!("acquired: {}", time.to_rfc3339());
    }
    println!("{}", BandSummary::header());
    for band in &dataset.bands {
        println!("{}", band_summary(&band.name, band.data.view().into_dyn()));
    }

    if let Some(output) = output {
        dataset
            .write_geotiff(output)
            .with_context(|| format!("Failed to write {}", output.display()))?;
        println!("Wrote {}", output.display());
    }
    Ok(())
}

pub async fn collection(
    client: &ComputeClient,
    collection_id: &str,
    grid: &GridArgs,
    verbose: bool,
) -> Result<()> {
    let domain = grid.domain()?;
    let options = FetchOptions {
        verbose,
        ..grid.options()
    };
    let series = client
        .collection_to_dataset(&domain, &ImageCollection::load(collection_id), &options)
        .await?;

    println!(
        "{}  {} images  {}x{}  {}",
        series.collection_id.as_deref().unwrap_or(collection_id),
        series.len(),
        series.x.values.len(),
        series.y.values.len(),
        series.crs
    );
    for (index, time) in series.time.iter().enumerate() {
        println!("{}", time.to_rfc3339());
        println!("  {}", BandSummary::header());
        for band in &series.bands {
            let slice = band.data.index_axis(ndarray::Axis(0), index);
            println!("  {}", band_summary(&band.name, slice.into_dyn()));
        }
    }
    Ok(())
}

pub async fn table(
    client: &ComputeClient,
    table_id: &str,
    resolution: Option<f64>,
    output: Option<&Path>,
) -> Result<()> {
    let collection = FeatureCollection::load(table_id);
    let table = client.get_table(&collection).await?;

    println!("{}  {} features", table_id, table.len());
    match table.bounds() {
        Some(b) => println!("bounds: {}, {}, {}, {}", b.min_x, b.min_y, b.max_x, b.max_y),
        None => println!("bounds: none"),
    }
    let columns: Vec<String> = table.columns().into_iter().collect();
    println!("columns: {}", columns.join(", "));

    if let Some(resolution) = resolution {
        let domain = table.domain(resolution)?;
        let (height, width) = domain.shape();
        println!(
            "domain: {}x{} at {}, {} pixels inside features",
            width,
            height,
            resolution,
            domain.masked_count()
        );
    }

    if let Some(output) = output {
        table
            .write_geojson(output)
            .with_context(|| format!("Failed to write {}", output.display()))?;
        println!("Wrote {}", output.display());
    }
    Ok(())
}

//! Response decoding against payloads shaped like real service output.

use bytes::Bytes;
use geofetch_protocol::{
    decode_image_response, decode_table_response, DataFormat, FeatureTable, ImagePixels,
    ProtocolError,
};
use ndarray::Array2;
use test_utils::{create_test_grid, fixtures, npy_plain_f32, npy_structured, temp_test_dir};

#[test]
fn test_structured_npy_bands_keep_names_and_order() {
    let red = create_test_grid(4, 3, 0.0);
    let nir = create_test_grid(4, 3, 0.25);
    let bytes = npy_structured(&[("B4", &red), ("B8", &nir)]);

    let pixels = decode_image_response(Bytes::from(bytes), DataFormat::Npy, (3, 4)).unwrap();
    let bands = pixels.into_bands().unwrap();
    assert_eq!(bands.len(), 2);
    assert_eq!(bands[0].name, "B4");
    assert_eq!(bands[1].name, "B8");
    assert_eq!(bands[0].data, red);
    assert_eq!(bands[1].data, nir);
    assert_eq!(bands[1].data[[2, 3]], 3002.25);
}

#[test]
fn test_plain_npy_is_single_default_band() {
    let values = Array2::from_shape_fn((2, 5), |(r, c)| (r * 5 + c) as f32);
    let pixels =
        decode_image_response(Bytes::from(npy_plain_f32(&values)), DataFormat::Npy, (2, 5))
            .unwrap();
    let bands = pixels.bands().unwrap();
    assert_eq!(bands.len(), 1);
    assert_eq!(bands[0].name, "b1");
    assert_eq!(bands[0].data[[1, 4]], 9.0);
}

#[test]
fn test_npy_shape_must_match_domain() {
    let band = create_test_grid(4, 3, 0.0);
    let bytes = npy_structured(&[("B1", &band)]);
    let err = decode_image_response(Bytes::from(bytes), DataFormat::Npy, (4, 3)).unwrap_err();
    match err {
        ProtocolError::ShapeMismatch { expected, actual } => {
            assert_eq!(expected, vec![4, 3]);
            assert_eq!(actual, vec![3, 4]);
        }
        other => panic!("expected ShapeMismatch, got {:?}", other),
    }
}

#[test]
fn test_tfrecord_decode_not_implemented() {
    let err = decode_image_response(Bytes::new(), DataFormat::TfRecordImage, (1, 1)).unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn test_geotiff_written_verbatim() {
    let raw = Bytes::from_static(b"II*\x00\x08\x00\x00\x00payload");
    let pixels = decode_image_response(raw.clone(), DataFormat::GeoTiff, (10, 10)).unwrap();
    let dir = temp_test_dir();
    let path = dir.path().join("out.tif");
    pixels.write_geotiff(&path).unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), raw.to_vec());
}

#[test]
fn test_npy_pixels_cannot_be_written_as_raw_geotiff() {
    let band = create_test_grid(1, 1, 0.0);
    let pixels = decode_image_response(
        Bytes::from(npy_structured(&[("B1", &band)])),
        DataFormat::Npy,
        (1, 1),
    )
    .unwrap();
    let dir = temp_test_dir();
    assert!(matches!(
        pixels.write_geotiff(dir.path().join("x.tif")),
        Err(ProtocolError::NotImplemented(_))
    ));
    assert!(matches!(pixels, ImagePixels::Bands(_)));
}

#[test]
fn test_table_geojson_file_round_trip() {
    let body = serde_json::to_vec(&fixtures::service::two_squares()).unwrap();
    let table = decode_table_response(&body).unwrap();
    assert_eq!(table.len(), 2);

    let dir = temp_test_dir();
    let path = dir.path().join("squares.geojson");
    table.write_geojson(&path).unwrap();

    let reread: FeatureTable = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(reread, table);
    assert_eq!(
        reread.bounds().map(|b| b.to_array()),
        Some([0.0, 0.0, 4.0, 4.0])
    );
}

//! Builders for `.npy` payloads like those returned by `image:computePixels`.

use ndarray::Array2;

const MAGIC: &[u8; 6] = b"\x93NUMPY";

/// Version 1.0 container around `header` (a Python dict literal) and `data`.
///
/// The header is space-padded and newline-terminated so the data starts on a
/// 64-byte boundary, as numpy writes it.
pub fn npy_v1(header: &str, data: &[u8]) -> Vec<u8> {
    let mut header = header.to_string();
    while (MAGIC.len() + 4 + header.len() + 1) % 64 != 0 {
        header.push(' ');
    }
    header.push('\n');

    let mut out = Vec::with_capacity(MAGIC.len() + 4 + header.len() + data.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&[1, 0]);
    out.extend_from_slice(&(header.len() as u16).to_le_bytes());
    out.extend_from_slice(header.as_bytes());
    out.extend_from_slice(data);
    out
}

/// Structured array with one little-endian `f8` field per band.
///
/// All bands must share a shape.
pub fn npy_structured(bands: &[(&str, &Array2<f64>)]) -> Vec<u8> {
    let (height, width) = bands.first().map(|(_, a)| a.dim()).unwrap_or((0, 0));
    let descr: Vec<String> = bands
        .iter()
        .map(|(name, _)| format!("('{}', '<f8')", name))
        .collect();
    let header = format!(
        "{{'descr': [{}], 'fortran_order': False, 'shape': ({}, {}), }}",
        descr.join(", "),
        height,
        width
    );

    let mut data = Vec::with_capacity(height * width * bands.len() * 8);
    for row in 0..height {
        for col in 0..width {
            for (_, band) in bands {
                data.extend_from_slice(&band[[row, col]].to_le_bytes());
            }
        }
    }
    npy_v1(&header, &data)
}

/// Plain little-endian `f4` array, decoded as a single band.
pub fn npy_plain_f32(values: &Array2<f32>) -> Vec<u8> {
    let (height, width) = values.dim();
    let header = format!(
        "{{'descr': '<f4', 'fortran_order': False, 'shape': ({}, {}), }}",
        height, width
    );
    let data: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
    npy_v1(&header, &data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_is_64_byte_aligned() {
        let band = Array2::zeros((2, 3));
        let bytes = npy_structured(&[("B1", &band)]);
        let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
        assert_eq!((10 + header_len) % 64, 0);
        assert_eq!(bytes.len(), 10 + header_len + 2 * 3 * 8);
    }
}

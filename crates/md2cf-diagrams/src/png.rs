//! PNG signature checks for rendered diagrams.
//!
//! A renderer that crashes half way can leave a truncated file behind, so a
//! cached image counts as valid only when it starts with the PNG signature,
//! its first chunk is `IHDR`, and it ends with the `IEND` chunk.

use std::path::Path;

/// The 8-byte PNG file signature.
pub const PNG_SIGNATURE: &[u8; 8] = b"\x89PNG\r\n\x1a\n";

/// Zero-length `IEND` chunk including its CRC.
const IEND_CHUNK: [u8; 12] = [
    0x00, 0x00, 0x00, 0x00, b'I', b'E', b'N', b'D', 0xAE, 0x42, 0x60, 0x82,
];

/// Read width and height from the `IHDR` chunk.
///
/// Returns `None` if the data does not start like a PNG file.
#[must_use]
pub fn png_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    // signature (8) + chunk length (4) + "IHDR" (4) + width (4) + height (4)
    if data.len() < 24 || !data.starts_with(PNG_SIGNATURE) || &data[12..16] != b"IHDR" {
        return None;
    }

    let width = u32::from_be_bytes([data[16], data[17], data[18], data[19]]);
    let height = u32::from_be_bytes([data[20], data[21], data[22], data[23]]);
    Some((width, height))
}

/// Whether `data` looks like a complete PNG image.
#[must_use]
pub fn is_complete_png(data: &[u8]) -> bool {
    png_dimensions(data).is_some() && data.ends_with(&IEND_CHUNK)
}

/// Whether the file at `path` is a complete PNG image.
///
/// Unreadable files are invalid.
#[must_use]
pub fn is_valid_png_file(path: &Path) -> bool {
    std::fs::read(path).is_ok_and(|data| is_complete_png(&data))
}

/// Minimal structurally valid PNG, used by tests across the crate.
#[cfg(test)]
pub(crate) fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let mut data = PNG_SIGNATURE.to_vec();
    data.extend_from_slice(&13u32.to_be_bytes());
    data.extend_from_slice(b"IHDR");
    data.extend_from_slice(&width.to_be_bytes());
    data.extend_from_slice(&height.to_be_bytes());
    data.extend_from_slice(&[8, 6, 0, 0, 0]);
    data.extend_from_slice(&[0, 0, 0, 0]);
    data.extend_from_slice(&IEND_CHUNK);
    data
}

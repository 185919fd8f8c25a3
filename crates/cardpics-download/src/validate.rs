//! Image integrity validation.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// Minimum plausible size of a real card image.
pub const MIN_IMAGE_BYTES: u64 = 1024;

const SOI: [u8; 2] = [0xFF, 0xD8];
const EOI: [u8; 2] = [0xFF, 0xD9];

/// Structural sanity check that `path` is a complete JPEG.
///
/// False if the file is unreadable, shorter than [`MIN_IMAGE_BYTES`], or
/// missing the start-of-image/end-of-image markers. No decoding happens;
/// this catches truncated and corrupted downloads, not every malformed
/// stream.
#[must_use]
pub fn is_valid_jpeg(path: &Path) -> bool {
    check_jpeg(path).unwrap_or(false)
}

fn check_jpeg(path: &Path) -> std::io::Result<bool> {
    let mut file = File::open(path)?;
    if file.metadata()?.len() < MIN_IMAGE_BYTES {
        return Ok(false);
    }

    let mut marker = [0u8; 2];
    file.read_exact(&mut marker)?;
    if marker != SOI {
        return Ok(false);
    }

    file.seek(SeekFrom::End(-2))?;
    file.read_exact(&mut marker)?;
    Ok(marker == EOI)
}

/// Minimal bytes passing the structural checks, for tests across the crate.
#[cfg(test)]
pub(crate) fn jpeg_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    bytes[..2].copy_from_slice(&SOI);
    let tail = len - 2;
    bytes[tail..].copy_from_slice(&EOI);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn accepts_well_formed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ok.jpg");
        fs::write(&path, jpeg_bytes(2048)).unwrap();
        assert!(is_valid_jpeg(&path));
    }

    #[test]
    fn accepts_exactly_minimum_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("min.jpg");
        fs::write(&path, jpeg_bytes(MIN_IMAGE_BYTES as usize)).unwrap();
        assert!(is_valid_jpeg(&path));
    }

    #[test]
    fn rejects_short_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.jpg");
        fs::write(&path, jpeg_bytes(512)).unwrap();
        assert!(!is_valid_jpeg(&path));
    }

    #[test]
    fn rejects_bad_leading_marker() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("head.jpg");
        let mut bytes = jpeg_bytes(2048);
        bytes[0] = 0x00;
        fs::write(&path, bytes).unwrap();
        assert!(!is_valid_jpeg(&path));
    }

    #[test]
    fn rejects_truncated_tail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tail.jpg");
        let mut bytes = jpeg_bytes(2048);
        let len = bytes.len();
        bytes[len - 1] = 0x00;
        fs::write(&path, bytes).unwrap();
        assert!(!is_valid_jpeg(&path));
    }

    #[test]
    fn rejects_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!is_valid_jpeg(&dir.path().join("absent.jpg")));
    }
}

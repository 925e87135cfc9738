use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{FetchError, Result};
use crate::utils::constants::{DEFAULT_BUFFER_SIZE, GZIP_SUFFIX};

/// Target of decompressing `path`: the same name without the `.gz` suffix.
pub fn decompressed_path(path: &Path) -> Result<PathBuf> {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case(GZIP_SUFFIX) => Ok(path.with_extension("")),
        _ => Err(FetchError::InvalidFormat(format!(
            "Not a .{} file: {}",
            GZIP_SUFFIX,
            path.display()
        ))),
    }
}

/// Expand a gzip file next to itself, replacing any earlier output.
/// A partially written target is removed on failure.
pub fn decompress(path: &Path) -> Result<PathBuf> {
    let target = decompressed_path(path)?;
    if target.exists() {
        fs::remove_file(&target)?;
    }

    let result = (|| -> io::Result<()> {
        let source = BufReader::with_capacity(DEFAULT_BUFFER_SIZE, File::open(path)?);
        let mut decoder = GzDecoder::new(source);
        let mut writer = BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, File::create(&target)?);
        io::copy(&mut decoder, &mut writer)?;
        writer.flush()
    })();

    match result {
        Ok(()) => Ok(target),
        Err(e) => {
            let _ = fs::remove_file(&target);
            Err(FetchError::Io(e))
        }
    }
}

/// Gzip `path` to `path.gz`. Used when publishing and by tests.
pub fn compress(path: &Path) -> Result<PathBuf> {
    let mut target = path.as_os_str().to_owned();
    target.push(".");
    target.push(GZIP_SUFFIX);
    let target = PathBuf::from(target);

    let mut source = BufReader::with_capacity(DEFAULT_BUFFER_SIZE, File::open(path)?);
    let mut encoder = GzEncoder::new(File::create(&target)?, Compression::default());
    io::copy(&mut source, &mut encoder)?;
    encoder.finish()?.flush()?;

    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_round_trip_is_byte_identical() -> Result<()> {
        let dir = TempDir::new()?;
        let payloads: [&[u8]; 3] = [
            b"",
            b"1.0           COMPACT RINEX FORMAT                    CRINEX VERS   / TYPE\n",
            &[0u8, 255, 1, 254, 0x1f, 0x8b, 10, 13],
        ];

        for (i, payload) in payloads.iter().enumerate() {
            let original = dir.path().join(format!("payload{}.crx", i));
            fs::write(&original, payload)?;

            let gz = compress(&original)?;
            fs::remove_file(&original)?;
            let restored = decompress(&gz)?;

            assert_eq!(restored, original);
            assert_eq!(fs::read(&restored)?, *payload);
        }
        Ok(())
    }

    #[test]
    fn test_existing_target_is_replaced() -> Result<()> {
        let dir = TempDir::new()?;
        let original = dir.path().join("mad2156a30.25d");
        fs::write(&original, b"fresh contents")?;
        let gz = compress(&original)?;

        fs::write(&original, b"stale contents from an earlier run that is longer")?;
        let restored = decompress(&gz)?;
        assert_eq!(fs::read(restored)?, b"fresh contents");
        Ok(())
    }

    #[test]
    fn test_corrupt_input_leaves_no_output() -> Result<()> {
        let dir = TempDir::new()?;
        let gz = dir.path().join("broken.crx.gz");
        fs::write(&gz, b"<html>login</html>")?;

        assert!(decompress(&gz).is_err());
        assert!(!dir.path().join("broken.crx").exists());
        Ok(())
    }

    #[test]
    fn test_requires_gz_suffix() {
        assert!(decompressed_path(Path::new("a.crx")).is_err());
        assert_eq!(
            decompressed_path(Path::new("/tmp/a.crx.gz")).unwrap(),
            PathBuf::from("/tmp/a.crx")
        );
    }
}

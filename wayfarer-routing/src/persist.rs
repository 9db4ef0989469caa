//! Persisted route index file format helpers.
//!
//! A route index artefact is a four-byte `WYRI` magic, a little-endian
//! `u16` format version and a `bincode` encoding of the [`RouteIndex`].

use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::{Path, PathBuf},
};

use bincode::{deserialize_from, serialize_into};
use log::info;
use serde::Serialize;
use thiserror::Error;

use crate::RouteIndex;

/// File identifier for persisted route indices.
pub(crate) const ROUTE_INDEX_MAGIC: [u8; 4] = *b"WYRI";

/// Supported version of the persisted route index format.
pub(crate) const ROUTE_INDEX_VERSION: u16 = 1;

/// Header and payload as written to disk.
#[derive(Serialize)]
struct RouteIndexFile<'a> {
    magic: [u8; 4],
    version: u16,
    index: &'a RouteIndex,
}

/// Error emitted when loading or validating a persisted route index.
#[derive(Debug, Error)]
pub enum RouteIndexError {
    /// The index file could not be read from disk.
    #[error("failed to read route index from {path}: {source}")]
    Io {
        /// Location of the artefact.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The payload could not be decoded.
    #[error("failed to decode route index from {path}: {source}")]
    Decode {
        /// Location of the artefact.
        path: PathBuf,
        /// Decoder error returned by `bincode`.
        #[source]
        source: bincode::Error,
    },
    /// The file did not start with the expected magic.
    #[error("invalid route index magic: expected {expected:?}, found {found:?}")]
    InvalidMagic {
        /// Expected byte sequence.
        expected: [u8; 4],
        /// Sequence read from the file.
        found: [u8; 4],
    },
    /// The file uses a format version this build cannot read.
    #[error("unsupported route index version {found}; supported version is {supported}")]
    UnsupportedVersion {
        /// Version present in the file header.
        found: u16,
        /// Version supported by this build.
        supported: u16,
    },
}

/// Error emitted when writing a route index to disk.
#[derive(Debug, Error)]
pub enum RouteIndexWriteError {
    /// Writing bytes to disk failed.
    #[error("failed to write route index to {path}: {source}")]
    Io {
        /// Destination file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The index could not be encoded.
    #[error("failed to encode route index for {path}: {source}")]
    Encode {
        /// Destination file path.
        path: PathBuf,
        /// Encoder failure from `bincode`.
        #[source]
        source: bincode::Error,
    },
}

/// Write `index` to `path`, truncating any existing file.
///
/// # Errors
///
/// Returns [`RouteIndexWriteError`] when the file cannot be created,
/// encoded or flushed.
pub fn write_route_index(path: &Path, index: &RouteIndex) -> Result<(), RouteIndexWriteError> {
    let io_error = |source| RouteIndexWriteError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(io_error)?;
    let mut writer = BufWriter::new(file);
    let payload = RouteIndexFile {
        magic: ROUTE_INDEX_MAGIC,
        version: ROUTE_INDEX_VERSION,
        index,
    };
    serialize_into(&mut writer, &payload).map_err(|source| RouteIndexWriteError::Encode {
        path: path.to_path_buf(),
        source,
    })?;
    writer.flush().map_err(io_error)?;
    writer.get_ref().sync_all().map_err(io_error)?;
    info!("wrote route index to {}", path.display());
    Ok(())
}

/// Load a route index written by [`write_route_index`].
///
/// # Errors
///
/// Returns [`RouteIndexError`] when the file is missing, carries the wrong
/// magic or version, or cannot be decoded.
#[expect(
    clippy::little_endian_bytes,
    reason = "the artefact header is little-endian on every host"
)]
pub fn read_route_index(path: &Path) -> Result<RouteIndex, RouteIndexError> {
    let io_error = |source| RouteIndexError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = BufReader::new(File::open(path).map_err(io_error)?);

    let mut magic = [0_u8; 4];
    reader.read_exact(&mut magic).map_err(io_error)?;
    if magic != ROUTE_INDEX_MAGIC {
        return Err(RouteIndexError::InvalidMagic {
            expected: ROUTE_INDEX_MAGIC,
            found: magic,
        });
    }

    let mut version_bytes = [0_u8; 2];
    reader.read_exact(&mut version_bytes).map_err(io_error)?;
    let version = u16::from_le_bytes(version_bytes);
    if version != ROUTE_INDEX_VERSION {
        return Err(RouteIndexError::UnsupportedVersion {
            found: version,
            supported: ROUTE_INDEX_VERSION,
        });
    }

    deserialize_from(&mut reader).map_err(|source| RouteIndexError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
#[expect(
    clippy::little_endian_bytes,
    reason = "tests forge artefact headers byte by byte"
)]
mod tests {
    use super::*;
    use crate::ContractionConfig;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;
    use wayfarer_core::test_support::sample_network;
    use wayfarer_core::{CancellationFlag, GeoPointId, TransportMode};

    #[fixture]
    fn temp_index_path() -> (TempDir, PathBuf) {
        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join("routes.wyri");
        (dir, path)
    }

    #[fixture]
    fn index() -> RouteIndex {
        let network = sample_network();
        RouteIndex::build(
            network.geo_points,
            &network.edges,
            network.grid,
            &ContractionConfig::default(),
            &CancellationFlag::new(),
        )
        .expect("not cancelled")
    }

    fn write_header(path: &Path, magic: [u8; 4], version: u16) -> File {
        let mut file = File::create(path).expect("create index file");
        file.write_all(&magic).expect("write magic");
        file.write_all(&version.to_le_bytes()).expect("write version");
        file
    }

    #[rstest]
    fn round_trips_query_results(
        #[from(temp_index_path)] (_dir, path): (TempDir, PathBuf),
        index: RouteIndex,
    ) {
        write_route_index(&path, &index).expect("persist index");
        let loaded = read_route_index(&path).expect("load index");
        assert_eq!(loaded, index);

        let cancel = CancellationFlag::new();
        let route = |index: &RouteIndex| {
            index
                .shortest_path(
                    GeoPointId::new(3),
                    GeoPointId::new(5),
                    TransportMode::Walk,
                    &cancel,
                )
                .expect("query runs")
        };
        assert_eq!(route(&loaded), route(&index));
    }

    #[rstest]
    fn missing_file_is_an_io_error() {
        let error = read_route_index(Path::new("/non-existent/routes.wyri"))
            .expect_err("missing file should error");
        assert!(matches!(error, RouteIndexError::Io { .. }));
    }

    #[rstest]
    fn rejects_foreign_magic(#[from(temp_index_path)] (_dir, path): (TempDir, PathBuf)) {
        std::fs::write(&path, b"WSPI\x01\x00").expect("write foreign header");
        let error = read_route_index(&path).expect_err("invalid magic should fail");
        assert!(matches!(
            error,
            RouteIndexError::InvalidMagic { found, .. } if &found == b"WSPI"
        ));
    }

    #[rstest]
    fn rejects_other_versions(#[from(temp_index_path)] (_dir, path): (TempDir, PathBuf)) {
        drop(write_header(&path, ROUTE_INDEX_MAGIC, ROUTE_INDEX_VERSION + 1));
        let error = read_route_index(&path).expect_err("unsupported version should fail");
        assert!(matches!(
            error,
            RouteIndexError::UnsupportedVersion { found, supported }
                if found == ROUTE_INDEX_VERSION + 1 && supported == ROUTE_INDEX_VERSION
        ));
    }

    #[rstest]
    fn truncated_payload_is_a_decode_error(
        #[from(temp_index_path)] (_dir, path): (TempDir, PathBuf),
    ) {
        drop(write_header(&path, ROUTE_INDEX_MAGIC, ROUTE_INDEX_VERSION));
        let error = read_route_index(&path).expect_err("decode should fail");
        assert!(matches!(error, RouteIndexError::Decode { .. }));
    }

    #[rstest]
    fn header_precedes_payload(
        #[from(temp_index_path)] (_dir, path): (TempDir, PathBuf),
        index: RouteIndex,
    ) {
        write_route_index(&path, &index).expect("persist index");
        let bytes = std::fs::read(&path).expect("read artefact");
        assert_eq!(bytes.get(..4), Some(ROUTE_INDEX_MAGIC.as_slice()));
        assert_eq!(
            bytes.get(4..6),
            Some(ROUTE_INDEX_VERSION.to_le_bytes().as_slice())
        );
    }
}

//! Snapshot files: a bincode body followed by a 32-byte digest of that body.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use bincode::Options;
use thiserror::Error;
use tracing::info;

use super::hashing_io::{HashingReader, HashingWriter};
use crate::domain::BookSnapshot;
use crate::ports::Digest256;

/// Refuse to decode bodies claiming to be larger than this.
const MAX_SNAPSHOT_BYTES: u64 = 1 << 30;

/// Errors from reading or writing state files.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("snapshot encoding: {0}")]
    Codec(#[from] bincode::Error),
    #[error("snapshot digest mismatch")]
    DigestMismatch,
    #[error("unexpected bytes after snapshot trailer")]
    TrailingData,
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> PersistenceError + '_ {
    move |source| PersistenceError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn codec() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_limit(MAX_SNAPSHOT_BYTES)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Write `snapshot` to `path`, replacing any previous file atomically.
pub fn save_snapshot(path: &Path, snapshot: &BookSnapshot, digest: &dyn Digest256) -> Result<(), PersistenceError> {
    let tmp = temp_path(path);
    let file = File::create(&tmp).map_err(io_error(&tmp))?;

    let mut writer = HashingWriter::new(BufWriter::new(file), digest);
    codec().serialize_into(&mut writer, snapshot)?;
    let (mut inner, sum) = writer.finish();
    inner.write_all(&sum).map_err(io_error(&tmp))?;
    let file = inner.into_inner().map_err(|e| io_error(&tmp)(e.into_error()))?;
    file.sync_all().map_err(io_error(&tmp))?;

    fs::rename(&tmp, path).map_err(io_error(path))?;
    info!(
        path = %path.display(),
        records = snapshot.records.len(),
        banned = snapshot.banned.len(),
        "snapshot saved"
    );
    Ok(())
}

/// Read a snapshot written by `save_snapshot`. A missing file is `Ok(None)`.
pub fn load_snapshot(path: &Path, digest: &dyn Digest256) -> Result<Option<BookSnapshot>, PersistenceError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(io_error(path)(e)),
    };

    let mut reader = HashingReader::new(BufReader::new(file), digest);
    let snapshot: BookSnapshot = codec().deserialize_from(&mut reader)?;
    let (mut inner, computed) = reader.finish();

    let mut stored = [0u8; 32];
    inner.read_exact(&mut stored).map_err(io_error(path))?;
    if stored != computed {
        return Err(PersistenceError::DigestMismatch);
    }
    let mut rest = [0u8; 1];
    if inner.read(&mut rest).map_err(io_error(path))? != 0 {
        return Err(PersistenceError::TrailingData);
    }

    info!(
        path = %path.display(),
        records = snapshot.records.len(),
        banned = snapshot.banned.len(),
        "snapshot loaded"
    );
    Ok(Some(snapshot))
}

//! Human-readable dump of answering peers, one per line.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use super::snapshot::PersistenceError;
use crate::domain::DumpEntry;

const HEADER: &str = "# address                                        good  lastSuccess    %(2h)   %(8h)   %(1d)   %(7d)  %(30d)  blocks      svcs  version";

/// Write `entries` in dump format.
pub fn render_dump<W: Write>(out: &mut W, entries: &[DumpEntry]) -> io::Result<()> {
    writeln!(out, "{}", HEADER)?;
    for entry in entries {
        let r = entry.reliabilities;
        writeln!(
            out,
            "{:<47}  {:>4}  {:>11}  {:>6.2}% {:>6.2}% {:>6.2}% {:>6.2}% {:>6.2}%  {:>6}  {:08x}  {:>5} \"{}\"",
            entry.endpoint.to_string(),
            u8::from(entry.good),
            entry.last_success.as_secs(),
            100.0 * r[0],
            100.0 * r[1],
            100.0 * r[2],
            100.0 * r[3],
            100.0 * r[4],
            entry.height,
            entry.services.bits(),
            entry.client_version,
            entry.sub_version.escape_debug(),
        )?;
    }
    Ok(())
}

/// Write the dump to `path` through a temporary file.
pub fn write_dump(path: &Path, entries: &[DumpEntry]) -> Result<(), PersistenceError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = Path::new(&tmp);

    let wrap = |source: io::Error| PersistenceError::Io {
        path: tmp.display().to_string(),
        source,
    };
    let file = File::create(tmp).map_err(wrap)?;
    let mut out = BufWriter::new(file);
    render_dump(&mut out, entries).map_err(wrap)?;
    out.flush().map_err(wrap)?;
    drop(out);

    fs::rename(tmp, path).map_err(|source| PersistenceError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(())
}

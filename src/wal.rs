//! Write-ahead log: a serial, durable, newline-delimited record of
//! mutating operations, replayed on open for crash recovery.
//!
//! On-disk format: one record per line, `<OP>|<PAYLOAD>\n`. `<OP>` is an
//! uppercase identifier; `<PAYLOAD>` is any byte sequence excluding `\n`
//! and `|`. Unrecognized ops are skipped with a warning; lines with no
//! `|` are skipped as corrupt. Both are logged via `tracing` rather than
//! failing recovery — a malformed tail record must not block every
//! later, well-formed one.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::{Error, Result};

/// A single recognized mutating operation.
pub const OP_ADD_VECTOR: &str = "ADD_VECTOR";

/// Durable, append-only log of mutating operations.
///
/// `append` and `checkpoint` are serialized internally by a mutex, so
/// the on-disk order always equals the order of successful return from
/// `append` — the ordering contract the engine façade relies on when it
/// nests "engine lock → WAL lock" and never the reverse.
pub struct WriteAheadLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl WriteAheadLog {
    /// Opens (or creates) the log at `path`.
    ///
    /// If the file already exists and is non-empty, every record is
    /// replayed in file order through `replay`, synchronously, before
    /// this function returns. `replay` receives `(op, payload)` for
    /// each well-formed line; malformed lines and unrecognized ops are
    /// skipped and logged rather than passed through.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::IoError`] if the file cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P, mut replay: impl FnMut(&str, &str)) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Ok(existing) = File::open(&path) {
            let reader = BufReader::new(existing);
            for (idx, line) in reader.lines().enumerate() {
                let line = line?;
                if line.is_empty() {
                    continue;
                }
                match line.split_once('|') {
                    Some((op, payload)) if !op.is_empty() => {
                        if op == OP_ADD_VECTOR {
                            replay(op, payload);
                        } else {
                            tracing::warn!(line = idx + 1, op, "skipping unrecognized WAL op");
                        }
                    }
                    _ => {
                        let err = Error::Corrupt {
                            line: idx + 1,
                            reason: "no OP|PAYLOAD separator".to_string(),
                        };
                        tracing::warn!(%err, "skipping malformed WAL record");
                    }
                }
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Serializes one record as `<op>|<payload>\n`, writes it, and
    /// forces it to durable storage before returning.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::IoError`] on any OS-level failure; on
    /// error the caller must treat the operation as not-yet-performed.
    pub fn append(&self, op: &str, payload: &str) -> Result<()> {
        let mut file = self.file.lock();
        file.write_all(op.as_bytes())?;
        file.write_all(b"|")?;
        file.write_all(payload.as_bytes())?;
        file.write_all(b"\n")?;
        file.sync_all()?;
        Ok(())
    }

    /// Truncates the log. Callers must guarantee every prior record has
    /// already been folded into durable index state.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::IoError`] on any OS-level failure.
    pub fn checkpoint(&self) -> Result<()> {
        let file = self.file.lock();
        file.set_len(0)?;
        file.sync_all()?;
        Ok(())
    }

    /// Path this log was opened at.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Renders a vector as the canonical WAL payload: `[f0, f1, …]` with
/// full `f32` round-trip precision (`{:?}` on `f32` in Rust already
/// prints the shortest string that round-trips exactly).
#[must_use]
pub fn render_vector(v: &[f32]) -> String {
    let mut s = String::with_capacity(v.len() * 8 + 2);
    s.push('[');
    for (i, x) in v.iter().enumerate() {
        if i > 0 {
            s.push_str(", ");
        }
        s.push_str(&format!("{x:?}"));
    }
    s.push(']');
    s
}

/// Parses a payload produced by [`render_vector`] back into a `Vec<f32>`.
///
/// Returns `None` on any malformed payload; the caller logs and skips.
#[must_use]
pub fn parse_vector(payload: &str) -> Option<Vec<f32>> {
    let inner = payload.strip_prefix('[')?.strip_suffix(']')?;
    if inner.trim().is_empty() {
        return Some(Vec::new());
    }
    inner
        .split(',')
        .map(|s| s.trim().parse::<f32>().ok())
        .collect()
}

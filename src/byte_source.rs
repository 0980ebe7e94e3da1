//! Byte Source — random-access reads over the canonical UTF-8 byte view of a
//! file, whatever its on-disk encoding.
//!
//! ASCII-compatible encodings are read straight from disk. UTF-16 files are
//! transcoded once, up front, into an in-memory UTF-8 shadow buffer — this
//! keeps every downstream component (Line Index, Query Engine) working in a
//! single coordinate space of UTF-8 byte offsets.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::encoding::{self, Encoding};
use crate::error::EngineError;

/// The backing store for a session's byte view.
enum Store {
    /// Read directly from the file on disk at the given path.
    Disk { path: PathBuf },
    /// Fully transcoded UTF-8 bytes held in memory (used for UTF-16 sources).
    Memory { bytes: Vec<u8> },
}

pub struct ByteSource {
    store: Store,
    encoding: Encoding,
    length: u64,
    /// Kept even for an in-memory (transcoded) store, so the watcher can
    /// stat and re-fingerprint the underlying file without needing a
    /// separate path threaded through `Session`.
    path: PathBuf,
}

impl ByteSource {
    /// Open `path`, probing its encoding and transcoding to UTF-8 if needed.
    pub fn open(path: &Path) -> Result<Self, EngineError> {
        let probe = encoding::probe(path)?;
        Self::open_with_encoding(path, probe.encoding)
    }

    pub fn open_with_encoding(path: &Path, encoding: Encoding) -> Result<Self, EngineError> {
        match encoding {
            Encoding::Utf8 | Encoding::Iso8859_1 => {
                let metadata = std::fs::metadata(path)?;
                Ok(Self {
                    store: Store::Disk { path: path.to_path_buf() },
                    encoding,
                    length: metadata.len(),
                    path: path.to_path_buf(),
                })
            }
            Encoding::Utf16Le | Encoding::Utf16Be => {
                // Stream the decode through `encoding_rs_io` rather than
                // reading the raw file and transcoding it in one pass by
                // hand — this is the same `DecodeReaderBytes` shape the
                // UTF-16-aware reference reader in the pack uses, forced to
                // the encoding the probe already settled on rather than
                // re-sniffing the BOM.
                let rs_encoding = match encoding {
                    Encoding::Utf16Le => encoding_rs::UTF_16LE,
                    Encoding::Utf16Be => encoding_rs::UTF_16BE,
                    Encoding::Utf8 | Encoding::Iso8859_1 => unreachable!("matched above"),
                };
                let file = File::open(path)?;
                let mut reader = encoding_rs_io::DecodeReaderBytesBuilder::new()
                    .encoding(Some(rs_encoding))
                    .bom_sniffing(false)
                    .strip_bom(true)
                    .build(file);
                let mut bytes = Vec::new();
                reader.read_to_end(&mut bytes)?;
                let length = bytes.len() as u64;
                Ok(Self {
                    store: Store::Memory { bytes },
                    encoding,
                    length,
                    path: path.to_path_buf(),
                })
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The file's current on-disk size, independent of `length()` (which for
    /// a transcoded in-memory store reflects the UTF-8 shadow, not the raw
    /// file). Used by the watcher to detect append/truncate on the raw bytes.
    pub fn raw_file_length(&self) -> Result<u64, EngineError> {
        Ok(std::fs::metadata(&self.path)?.len())
    }

    /// A fingerprint of the first `n` raw on-disk bytes, bypassing any
    /// transcoding — rotation can swap in different UTF-16 content of the
    /// same transcoded length, and the watcher needs to see that.
    pub fn raw_prefix_fingerprint(&self, n: u64) -> Result<blake3::Hash, EngineError> {
        use std::io::Read;
        let mut file = File::open(&self.path)?;
        let mut buf = vec![0u8; n as usize];
        let read = file.read(&mut buf)?;
        buf.truncate(read);
        Ok(blake3::hash(&buf))
    }

    /// Re-read the file from scratch with its current encoding (used by the
    /// watcher on every append or rebuild tick, to pick up the file's current
    /// size and, for a transcoded UTF-16 source, its current content).
    pub fn reopen(&self) -> Result<Self, EngineError> {
        Self::open(&self.path)
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    /// Read `[lo, hi)` of the canonical UTF-8 byte view.
    pub fn read_range(&self, lo: u64, hi: u64) -> Result<Vec<u8>, EngineError> {
        let hi = hi.min(self.length);
        if lo >= hi {
            return Ok(Vec::new());
        }
        match &self.store {
            Store::Disk { path } => {
                let mut file = File::open(path)?;
                file.seek(SeekFrom::Start(lo))?;
                let mut buf = vec![0u8; (hi - lo) as usize];
                file.read_exact(&mut buf)?;
                Ok(buf)
            }
            Store::Memory { bytes } => Ok(bytes[lo as usize..hi as usize].to_vec()),
        }
    }

    /// Read from `offset` to the current end of the byte view.
    pub fn read_tail_from(&self, offset: u64) -> Result<Vec<u8>, EngineError> {
        self.read_range(offset, self.length)
    }

    /// A short digest of the first `n` bytes, used by the watcher to detect
    /// truncation followed by different content (rotation) at the same size.
    pub fn prefix_fingerprint(&self, n: u64) -> Result<blake3::Hash, EngineError> {
        let prefix = self.read_range(0, n.min(self.length))?;
        Ok(blake3::hash(&prefix))
    }
}

#[cfg(test)]
mod byte_source_test;

//! Encoding Probe — detect the byte encoding of a file prefix and decide
//! whether the engine can treat its bytes as UTF-8 directly or must transcode.

use std::path::Path;

use serde::Serialize;

use crate::error::EngineError;

const PROBE_LEN: usize = 8192;

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];
const UTF16_LE_BOM: [u8; 2] = [0xFF, 0xFE];
const UTF16_BE_BOM: [u8; 2] = [0xFE, 0xFF];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    Utf16Le,
    Utf16Be,
    Iso8859_1,
}

impl Encoding {
    pub fn label(self) -> &'static str {
        match self {
            Self::Utf8 => "UTF-8",
            Self::Utf16Le => "UTF-16LE",
            Self::Utf16Be => "UTF-16BE",
            Self::Iso8859_1 => "ISO-8859-1",
        }
    }

    pub fn is_supported(self) -> bool {
        // ISO-8859-1 is openable but flagged unsupported; downstream treats
        // its bytes as UTF-8 and the client is expected to warn the user.
        !matches!(self, Self::Iso8859_1)
    }
}

/// Wire representation is the spec's own encoding vocabulary (§4.1: "UTF-8",
/// "UTF-16LE", ...), not the Rust variant name.
impl Serialize for Encoding {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct EncodingProbeResult {
    pub encoding: Encoding,
    pub is_supported: bool,
}

/// Inspect the first few kilobytes of `path` and return its canonical encoding.
pub fn probe(path: &Path) -> Result<EncodingProbeResult, EngineError> {
    let bytes = read_prefix(path)?;
    let encoding = classify(&bytes);
    Ok(EncodingProbeResult {
        encoding,
        is_supported: encoding.is_supported(),
    })
}

fn read_prefix(path: &Path) -> Result<Vec<u8>, EngineError> {
    use std::io::Read;

    let metadata = std::fs::metadata(path)?;
    if metadata.is_dir() {
        return Err(EngineError::Io(format!("cannot open a directory: {}", path.display())));
    }
    let mut file = std::fs::File::open(path)?;
    let mut buf = vec![0u8; PROBE_LEN];
    let read = file.read(&mut buf)?;
    buf.truncate(read);
    Ok(buf)
}

/// BOM match, then a zero-byte-density heuristic for BOM-less UTF-16, then a
/// UTF-8 validity scan, falling back to ISO-8859-1.
fn classify(prefix: &[u8]) -> Encoding {
    if prefix.starts_with(&UTF8_BOM) {
        return Encoding::Utf8;
    }
    if prefix.starts_with(&UTF16_LE_BOM) {
        return Encoding::Utf16Le;
    }
    if prefix.starts_with(&UTF16_BE_BOM) {
        return Encoding::Utf16Be;
    }

    if std::str::from_utf8(prefix).is_ok() {
        return Encoding::Utf8;
    }

    if let Some(utf16) = sniff_bomless_utf16(prefix) {
        return utf16;
    }

    Encoding::Iso8859_1
}

/// Heuristic for BOM-less UTF-16: ASCII-heavy text encoded as UTF-16 has a
/// very high density of zero bytes in one parity class of positions.
fn sniff_bomless_utf16(prefix: &[u8]) -> Option<Encoding> {
    if prefix.len() < 4 {
        return None;
    }
    let even_zeros = prefix.iter().step_by(2).filter(|&&b| b == 0).count();
    let odd_zeros = prefix.iter().skip(1).step_by(2).filter(|&&b| b == 0).count();
    let even_count = prefix.len().div_ceil(2);
    let odd_count = prefix.len() / 2;

    let even_ratio = even_zeros as f64 / even_count.max(1) as f64;
    let odd_ratio = odd_zeros as f64 / odd_count.max(1) as f64;

    const THRESHOLD: f64 = 0.4;
    if odd_ratio > THRESHOLD && odd_ratio > even_ratio {
        Some(Encoding::Utf16Be)
    } else if even_ratio > THRESHOLD && even_ratio > odd_ratio {
        Some(Encoding::Utf16Le)
    } else {
        None
    }
}

/// Decode a full byte buffer known to be `encoding` into a UTF-8 `String`,
/// transcoding UTF-16 with `encoding_rs` and passing UTF-8/ISO-8859-1 through
/// (ISO-8859-1 bytes are treated as UTF-8 with replacement, per probe policy).
pub fn transcode_to_utf8(bytes: &[u8], encoding: Encoding) -> Vec<u8> {
    match encoding {
        Encoding::Utf8 | Encoding::Iso8859_1 => strip_utf8_bom(bytes).to_vec(),
        Encoding::Utf16Le => {
            let (text, _had_errors) = encoding_rs::UTF_16LE.decode_without_bom_handling(bytes);
            text.into_owned().into_bytes()
        }
        Encoding::Utf16Be => {
            let (text, _had_errors) = encoding_rs::UTF_16BE.decode_without_bom_handling(bytes);
            text.into_owned().into_bytes()
        }
    }
}

fn strip_utf8_bom(bytes: &[u8]) -> &[u8] {
    if bytes.starts_with(&UTF8_BOM) { &bytes[3..] } else { bytes }
}

#[cfg(test)]
mod encoding_test;

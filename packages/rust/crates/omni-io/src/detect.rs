//! Binary detection and strict text decoding for store reads.

use memchr::memchr;

use crate::error::IoError;

/// Number of leading bytes inspected for NULL bytes.
pub const BINARY_SNIFF_BYTES: usize = 8192;

/// Quick binary detection over the first [`BINARY_SNIFF_BYTES`] bytes.
#[must_use]
pub fn is_binary(buffer: &[u8]) -> bool {
    let check_len = buffer.len().min(BINARY_SNIFF_BYTES);
    memchr(0, &buffer[..check_len]).is_some()
}

/// Decode the contents of `path` as UTF-8 text.
///
/// Tool output feeds back into the model verbatim, so invalid UTF-8 is an
/// error instead of being replaced with U+FFFD.
///
/// # Errors
/// `IoError::BinaryFile` for NULL bytes, `IoError::Encoding` for invalid UTF-8.
pub fn decode_text(path: &str, buffer: Vec<u8>) -> Result<String, IoError> {
    if is_binary(&buffer) {
        return Err(IoError::BinaryFile(path.to_string()));
    }
    String::from_utf8(buffer).map_err(|_| IoError::Encoding(path.to_string()))
}

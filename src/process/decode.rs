//! Decoding of the UTF-16LE log MetaEditor writes.

/// Decodes a little-endian UTF-16 buffer one code unit at a time.
///
/// Units are not paired, so surrogate halves (anything outside the BMP)
/// come out as U+FFFD rather than the original character.
pub fn decode_utf16le(bytes: &[u8]) -> Result<String, DecodeError> {
    if bytes.len() % 2 != 0 {
        return Err(DecodeError::OddLength(bytes.len()));
    }

    let mut out = String::with_capacity(bytes.len() / 2);
    for pair in bytes.chunks_exact(2) {
        let unit = u16::from_le_bytes([pair[0], pair[1]]);
        out.push(char::from_u32(u32::from(unit)).unwrap_or(char::REPLACEMENT_CHARACTER));
    }
    Ok(out)
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum DecodeError {
    #[error("UTF-16 log has odd length ({0} bytes)")]
    OddLength(usize),
}

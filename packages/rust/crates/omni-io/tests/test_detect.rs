//! Tests for detect module - binary detection and strict text decoding.
#![allow(missing_docs)]

use omni_io::{BINARY_SNIFF_BYTES, IoError, decode_text, is_binary};

#[test]
fn test_binary_detection() {
    assert!(is_binary(b"\x00\x01\x02\x03"));
    assert!(!is_binary(b"Hello, world!"));
    assert!(!is_binary(b""));
}

#[test]
fn test_null_after_sniff_window_is_text() {
    let mut buffer = vec![b'a'; BINARY_SNIFF_BYTES];
    buffer.push(0);
    assert!(!is_binary(&buffer));
}

#[test]
fn test_decode_text() -> Result<(), Box<dyn std::error::Error>> {
    let result = decode_text("greeting.txt", b"Hello, world!".to_vec())?;
    assert_eq!(result, "Hello, world!");
    Ok(())
}

#[test]
fn test_decode_binary_names_path() {
    let result = decode_text("blob.bin", b"\x00\x01\x02".to_vec());
    assert!(matches!(result, Err(IoError::BinaryFile(path)) if path == "blob.bin"));
}

#[test]
fn test_decode_invalid_utf8_is_rejected() {
    let result = decode_text("latin1.txt", vec![0x48, 0x65, 0x6c, 0xff, 0x6f]);
    assert!(matches!(result, Err(IoError::Encoding(_))));
}

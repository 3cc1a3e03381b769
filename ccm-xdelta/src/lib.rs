//! Applies XDELTA-format binary patches: a variable-length integer format
//! combined with copy/insert opcodes, reconstructing a target byte stream
//! from a source byte stream and a patch byte stream.
//!
//! This is a pure function over three byte streams; it owns no state beyond
//! the single pass it makes over `patch`.

use std::io::{Read, Seek, SeekFrom, Write};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("variable-length integer decoded more than 62 bits")]
    OverlongVlq,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

const COPY_FROM_SOURCE: u8 = 0x80;

/// Applies `patch` to `source`, writing the reconstructed bytes to `target`.
///
/// `source` must support seeking (copy opcodes address it by absolute
/// offset); `patch` is read strictly sequentially; `target` is written to in
/// the order bytes are produced.
pub fn apply<S, P, T>(source: &mut S, patch: &mut P, target: &mut T) -> Result<(), Error>
where
    S: Read + Seek,
    P: Read,
    T: Write,
{
    loop {
        let mut cmd = [0u8; 1];
        let n = read_some(patch, &mut cmd)?;
        if n == 0 {
            return Ok(());
        }
        let cmd = cmd[0];

        let copy_from_source = cmd & COPY_FROM_SOURCE != 0;
        let mut length = read_length(cmd, patch)?;

        if copy_from_source {
            let mut offset = read_offset(patch)?;
            while length != 0 {
                let mut buf = vec![0u8; length as usize];
                source.seek(SeekFrom::Start(offset))?;
                let n = read_some(source, &mut buf)? as u64;
                target.write_all(&buf[..n as usize])?;

                length -= n;
                offset += n;
            }
        } else {
            while length != 0 {
                let mut buf = vec![0u8; length as usize];
                let n = read_some(patch, &mut buf)? as u64;
                target.write_all(&buf[..n as usize])?;

                length -= n;
            }
        }
    }
}

/// Reads as many bytes as are currently available into `buf`, looping on
/// short reads, and returns the number of bytes actually read (0 at EOF).
fn read_some<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize, std::io::Error> {
    let mut total = 0;
    while total < buf.len() {
        let n = reader.read(&mut buf[total..])?;
        if n == 0 {
            break;
        }
        total += n;
    }
    Ok(total)
}

/// Decodes the length `A`: a VLQ anchored on the opcode byte's low six bits.
fn read_length<P: Read>(start: u8, patch: &mut P) -> Result<u64, Error> {
    let mut number: u64 = 0;
    let mut bit_count: u32 = 0;

    loop {
        if bit_count > 62 {
            return Err(Error::OverlongVlq);
        }

        if bit_count == 0 {
            number = (start & 0x3F) as u64;
            if start & 0x40 == 0 {
                break;
            }
            bit_count = 6;
        } else {
            let mut byte = [0u8; 1];
            read_some(patch, &mut byte)?;
            let byte = byte[0];
            number |= ((byte & 0x7F) as u64) << bit_count;
            if byte & 0x80 == 0 {
                break;
            }
            bit_count += 7;
        }
    }

    Ok(number)
}

/// Decodes the offset `B`: a VLQ of the same shape, but once 56 bits have
/// accumulated the next byte is taken whole and the sequence terminates.
fn read_offset<P: Read>(patch: &mut P) -> Result<u64, Error> {
    let mut number: u64 = 0;
    let mut bit_count: u32 = 0;

    loop {
        let mut byte = [0u8; 1];
        read_some(patch, &mut byte)?;
        let byte = byte[0];

        if bit_count == 56 {
            number |= (byte as u64) << 56;
            break;
        }

        number |= ((byte & 0x7F) as u64) << bit_count;
        if byte & 0x80 == 0 {
            break;
        }
        bit_count += 7;
    }

    Ok(number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn run(source: &[u8], patch: &[u8]) -> Vec<u8> {
        let mut source = Cursor::new(source.to_vec());
        let mut patch = Cursor::new(patch.to_vec());
        let mut target = Vec::new();
        apply(&mut source, &mut patch, &mut target).unwrap();
        target
    }

    #[test]
    fn single_copy_of_full_source_is_identity() {
        let source = b"ABCDEFGH";
        // copy opcode, length 8 fits in the low six bits (no continuation),
        // offset 0 fits in a single byte.
        let patch = [0x80 | 8, 0x00];
        assert_eq!(run(source, &patch), source);
    }

    #[test]
    fn copy_length_with_continuation_byte() {
        // length 67 = 3 | (1 << 6); low six bits = 3, continuation bit set,
        // one continuation byte contributing 1 << 6.
        let mut source = Vec::new();
        source.extend(std::iter::repeat(b'Z').take(67));
        let patch = [0x80 | 0x40 | 3, 0x01, 0x00];
        assert_eq!(run(&source, &patch), source);
    }

    #[test]
    fn insert_opcode_writes_patch_bytes() {
        let source = b"";
        // insert opcode (bit7 clear), length 5, then 5 literal bytes.
        let patch = [5, b'h', b'e', b'l', b'l', b'o'];
        assert_eq!(run(source, &patch), b"hello");
    }

    #[test]
    fn mixed_copy_and_insert() {
        let source = b"0123456789";
        let mut patch = Vec::new();
        // copy length 3 offset 2 -> "234"
        patch.push(0x80 | 3);
        patch.push(2);
        // insert "-"
        patch.push(1);
        patch.push(b'-');
        // copy length 2 offset 8 -> "89"
        patch.push(0x80 | 2);
        patch.push(8);

        assert_eq!(run(source, &patch), b"234-89");
    }

    #[test]
    fn offset_beyond_one_byte_uses_continuation() {
        let mut source = vec![0u8; 200];
        source[150] = b'X';
        source[151] = b'Y';

        // offset 150 doesn't fit in 7 bits, needs continuation.
        let low = (150u64 & 0x7F) as u8 | 0x80;
        let high = (150u64 >> 7) as u8;

        let patch = [0x80 | 2, low, high];
        assert_eq!(run(&source, &patch), b"XY");
    }

    #[test]
    fn overlong_length_vlq_is_an_error() {
        let mut patch = vec![0x40 | 0x80]; // copy, continuation set immediately
        for _ in 0..10 {
            patch.push(0xFF); // keep continuation bit set
        }
        patch.push(0x7F);

        let mut source = Cursor::new(Vec::<u8>::new());
        let mut patch_reader = Cursor::new(patch);
        let mut target = Vec::new();
        assert!(matches!(
            apply(&mut source, &mut patch_reader, &mut target),
            Err(Error::OverlongVlq)
        ));
    }
}

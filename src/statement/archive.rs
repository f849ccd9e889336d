//! Backup record stream
//!
//! Format (all integers u32 big-endian):
//!
//! ```text
//! +--------------+
//! | Record count |
//! +--------------+
//! | Key length   | \
//! | Key bytes    |  | repeated per record,
//! | Value length |  | keys and values JSON-encoded
//! | Value bytes  | /
//! +--------------+
//! ```
//!
//! Readers consume records until EOF; a stream holding fewer records than
//! its count is truncated.

use std::io::{self, Read, Write};

use serde_json::Value;

use crate::store::Entry;

fn invalid_data(e: serde_json::Error) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, e)
}

fn write_len<W: Write>(writer: &mut W, len: usize) -> io::Result<()> {
    let len = u32::try_from(len).map_err(|_| {
        io::Error::new(io::ErrorKind::InvalidInput, "record larger than 4 GiB")
    })?;
    writer.write_all(&len.to_be_bytes())
}

fn write_bytes<W: Write>(writer: &mut W, bytes: &[u8]) -> io::Result<()> {
    write_len(writer, bytes.len())?;
    writer.write_all(bytes)
}

/// Writes the count followed by every entry
pub fn write_records<W: Write>(writer: &mut W, entries: &[Entry]) -> io::Result<()> {
    write_len(writer, entries.len())?;
    for entry in entries {
        write_bytes(writer, &serde_json::to_vec(&entry.key).map_err(invalid_data)?)?;
        write_bytes(writer, &serde_json::to_vec(&entry.value).map_err(invalid_data)?)?;
    }
    writer.flush()
}

/// Reads a length prefix; `None` on a clean EOF before the first byte
fn read_len_or_eof<R: Read>(reader: &mut R) -> io::Result<Option<usize>> {
    let mut buf = [0u8; 4];
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "truncated length prefix",
                ))
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(Some(u32::from_be_bytes(buf) as usize))
}

fn read_len<R: Read>(reader: &mut R) -> io::Result<usize> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf) as usize)
}

/// Grows with the bytes actually present, so a corrupt length prefix
/// cannot force a large allocation up front
fn read_json<R: Read>(reader: &mut R, len: usize) -> io::Result<Value> {
    let mut buf = Vec::new();
    reader.by_ref().take(len as u64).read_to_end(&mut buf)?;
    if buf.len() < len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("record holds {} of {} bytes", buf.len(), len),
        ));
    }
    serde_json::from_slice(&buf).map_err(invalid_data)
}

/// Reads records until EOF, handing each to `on_record`. Returns the
/// number of records read.
pub fn read_records<R: Read>(
    reader: &mut R,
    mut on_record: impl FnMut(Value, Value) -> io::Result<()>,
) -> io::Result<usize> {
    let expected = read_len(reader)?;
    let mut read = 0;

    while let Some(key_len) = read_len_or_eof(reader)? {
        let key = read_json(reader, key_len)?;
        let value_len = read_len(reader)?;
        let value = read_json(reader, value_len)?;
        on_record(key, value)?;
        read += 1;
    }

    if read < expected {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("backup holds {} of {} records", read, expected),
        ));
    }
    Ok(read)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Vec<Entry> {
        vec![
            Entry::new(json!(1), json!({"name": "Ann"})),
            Entry::new(json!("two"), json!([1, 2])),
        ]
    }

    #[test]
    fn test_layout_is_big_endian() {
        let mut buf = Vec::new();
        write_records(&mut buf, &[Entry::new(json!(1), json!(2))]).unwrap();
        assert_eq!(&buf[..4], &[0, 0, 0, 1]);
        assert_eq!(&buf[4..8], &[0, 0, 0, 1]);
        assert_eq!(buf[8], b'1');
        assert_eq!(buf.len(), 4 + 4 + 1 + 4 + 1);
    }

    #[test]
    fn test_read_back() {
        let mut buf = Vec::new();
        write_records(&mut buf, &sample()).unwrap();

        let mut seen = Vec::new();
        let count = read_records(&mut buf.as_slice(), |k, v| {
            seen.push(Entry::new(k, v));
            Ok(())
        })
        .unwrap();

        assert_eq!(count, 2);
        assert_eq!(seen, sample());
    }

    #[test]
    fn test_truncated_stream() {
        let mut buf = Vec::new();
        write_records(&mut buf, &sample()).unwrap();

        let mid_record = &buf[..buf.len() - 2];
        assert!(read_records(&mut &mid_record[..], |_, _| Ok(())).is_err());

        let mut short = Vec::new();
        write_records(&mut short, &sample()[..1]).unwrap();
        short[3] = 2;
        let err = read_records(&mut short.as_slice(), |_, _| Ok(())).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_empty_input() {
        assert!(read_records(&mut &[][..], |_, _| Ok(())).is_err());
    }

    #[test]
    fn test_oversized_length_prefix_is_truncation() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&1u32.to_be_bytes());
        buf.extend_from_slice(&u32::MAX.to_be_bytes());
        buf.extend_from_slice(b"1");

        let err = read_records(&mut buf.as_slice(), |_, _| Ok(())).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}

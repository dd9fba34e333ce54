//! Framed `.pak` containers: a concatenation of already-formed packets, each
//! behind a little-endian u16 length prefix.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::Result;

/// Extract packet `packet_number` from the container at `path`.
///
/// Returns `Ok(None)` when the file does not exist or holds fewer packets.
/// The extracted bytes are a complete packet: header, payload, CRC.
pub fn extract(path: &Path, packet_number: u8) -> Result<Option<Vec<u8>>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let size = file.metadata()?.len();
    let mut reader = BufReader::new(file);

    let mut position: u64 = 0;
    let mut current = u64::from(packet_number);
    // A length prefix must fit before the end of the file.
    while position + 2 < size {
        let length = u64::from(reader.read_u16::<LittleEndian>()?);
        position += 2;
        if current == 0 {
            let mut packet = vec![0u8; length as usize];
            reader.read_exact(&mut packet)?;
            return Ok(Some(packet));
        }
        reader.seek_relative(length as i64)?;
        position += length;
        current -= 1;
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use byteorder::WriteBytesExt;

    use super::*;

    fn container(packets: &[&[u8]]) -> Vec<u8> {
        let mut data = Vec::new();
        for packet in packets {
            data.write_u16::<LittleEndian>(packet.len() as u16).unwrap();
            data.extend_from_slice(packet);
        }
        data
    }

    #[test]
    fn extracts_each_packet_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("000010.pak");
        let first = vec![0x01; 20];
        let second = vec![0x02; 50];
        fs::write(&path, container(&[&first, &second])).unwrap();

        assert_eq!(extract(&path, 0).unwrap().unwrap(), first);
        assert_eq!(extract(&path, 1).unwrap().unwrap(), second);
        assert!(extract(&path, 2).unwrap().is_none());
    }

    #[test]
    fn missing_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        assert!(extract(&dir.path().join("nope.pak"), 0).unwrap().is_none());
    }

    #[test]
    fn empty_file_holds_no_packets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.pak");
        fs::write(&path, []).unwrap();
        assert!(extract(&path, 0).unwrap().is_none());
    }

    #[test]
    fn trailing_length_prefix_alone_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stub.pak");
        // A bare two-byte prefix with no body behind it.
        fs::write(&path, [0x05, 0x00]).unwrap();
        assert!(extract(&path, 0).unwrap().is_none());
    }

    #[test]
    fn truncated_body_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cut.pak");
        // Prefix claims 200 bytes, only 3 present.
        fs::write(&path, [0xC8, 0x00, 0xAA, 0xBB, 0xCC]).unwrap();
        assert!(extract(&path, 0).is_err());
    }
}

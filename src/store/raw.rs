//! Raw `.nab` containers: opaque payload bytes partitioned into 991-byte
//! packets by position. Header and CRC are synthesized per slice.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::Result;
use crate::protocol::{packet, PACKET_DATA_SIZE};
use crate::types::SegmentId;

/// Slice packet `packet_number` out of the container at `path` and wrap it
/// with a header and CRC.
///
/// Returns `Ok(None)` when the file does not exist or the requested slice
/// starts at or past the end of the file.
pub fn slice(path: &Path, segment: SegmentId, packet_number: u8) -> Result<Option<Vec<u8>>> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let size = file.metadata()?.len();

    let offset = u64::from(packet_number) * PACKET_DATA_SIZE as u64;
    if offset >= size {
        return Ok(None);
    }

    file.seek(SeekFrom::Start(offset))?;
    let mut payload = Vec::with_capacity(PACKET_DATA_SIZE);
    file.take(PACKET_DATA_SIZE as u64).read_to_end(&mut payload)?;

    let last = offset + payload.len() as u64 == size;
    Ok(Some(packet::assemble_raw_packet(
        segment,
        packet_number,
        offset,
        &payload,
        last,
    )))
}

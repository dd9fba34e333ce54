//! Packet builders: header fill, raw-slice assembly, and the synthetic time
//! segment.

use byteorder::{BigEndian, ByteOrder};
use chrono::{DateTime, Datelike, Local, Timelike};

use crate::types::SegmentId;

use super::crc;
use super::{PACKET_CRC_SIZE, PACKET_HEADER_SIZE, TIME_SEGMENT_SIZE};

/// Owner byte at header offset 4.
const OWNER: u8 = 0x01;

/// Tier field at header offsets 5..9.
const TIER: u32 = 0x7FFF_FFFF;

/// Reserved pair at header offsets 9..11.
const RESERVED: [u8; 2] = [0x7F, 0x80];

/// Base packet type.
const TYPE_BASE: u8 = 0x20;

/// Bit marking the final packet of a segment.
const TYPE_LAST: u8 = 0x10;

/// Type of packet 0 when more packets follow.
const TYPE_FIRST: u8 = 0xA1;

/// First 27 bytes of the time segment; the zeroed slots are patched with
/// wall-clock fields before the CRC is appended.
const TIME_PREAMBLE: [u8; 27] = [
    0x7F, 0xFF, 0xFF, 0x00, 0x00, 0x7F, 0xFF, 0xFF, 0xFF, 0x7F, 0x80, 0x30,
    0x00, 0x00, 0x00, 0x00, 0x02, 0x02, 0x00, 0x54, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00,
];

/// Compute the header type byte for a packet.
///
/// The last packet of a segment carries the end bit whatever its number;
/// otherwise packet 0 announces the start of a segment.
pub fn packet_type(packet_number: u8, last: bool) -> u8 {
    if last {
        TYPE_BASE | TYPE_LAST
    } else if packet_number == 0 {
        TYPE_FIRST
    } else {
        TYPE_BASE
    }
}

/// Fill the 16-byte header at the front of `buf`.
///
/// `offset` is the payload's byte position within the segment file; only its
/// low 16 bits fit the header field.
pub fn populate_header(
    buf: &mut [u8],
    segment: SegmentId,
    packet_number: u8,
    offset: u64,
    last: bool,
) {
    buf[0..3].copy_from_slice(&segment.to_be_bytes());
    buf[3] = packet_number;
    buf[4] = OWNER;
    BigEndian::write_u32(&mut buf[5..9], TIER);
    buf[9..11].copy_from_slice(&RESERVED);
    buf[11] = packet_type(packet_number, last);
    buf[12] = packet_number;
    buf[13] = 0x00;
    BigEndian::write_u16(&mut buf[14..16], (offset & 0xFFFF) as u16);
}

/// Wrap a raw container slice into a wire-ready packet: header, payload,
/// CRC over both.
pub fn assemble_raw_packet(
    segment: SegmentId,
    packet_number: u8,
    offset: u64,
    payload: &[u8],
    last: bool,
) -> Vec<u8> {
    let mut buf = vec![0u8; PACKET_HEADER_SIZE + payload.len() + PACKET_CRC_SIZE];
    buf[PACKET_HEADER_SIZE..PACKET_HEADER_SIZE + payload.len()].copy_from_slice(payload);
    populate_header(&mut buf, segment, packet_number, offset, last);
    crc::write_trailer(&mut buf, PACKET_HEADER_SIZE + payload.len());
    buf
}

/// Build the 29-byte time segment for segment id `0x7FFFFF`.
///
/// Weekday is 1..=7 with Sunday first; the hour is folded onto a 12-hour
/// clock. Generated fresh for every request.
pub fn build_time_segment(now: &DateTime<Local>) -> Vec<u8> {
    let mut buf = vec![0u8; TIME_SEGMENT_SIZE];
    buf[..27].copy_from_slice(&TIME_PREAMBLE);
    buf[18] = now.weekday().num_days_from_sunday() as u8 + 1;
    buf[20] = now.month() as u8;
    buf[21] = now.day() as u8;
    buf[22] = (now.hour() % 12) as u8;
    buf[23] = now.minute() as u8;
    buf[24] = now.second() as u8;
    crc::write_trailer(&mut buf, 27);
    buf
}

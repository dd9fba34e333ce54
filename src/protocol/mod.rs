//! Wire protocol for the NABU adapter link.
//!
//! Defines the packet format, control bytes, and the byte-driven command
//! engine.
//!
//! ## Packet Format
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │ Segment id (3, BE) │ Packet # (1) │ Owner (1) │ Tier (4)       │
//! ├────────────────────────────────────────────────────────────────┤
//! │ Reserved (2) │ Type (1) │ Packet # (1) │ 0x00 (1) │ Offset (2) │
//! ├────────────────────────────────────────────────────────────────┤
//! │ Payload (0..=991) │ CRC-16 (2)                                 │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! On the wire every literal `0x10` inside the packet is doubled; a lone
//! `0x10` is the NABU's control prefix.

pub mod crc;
pub mod engine;
pub mod escape;
pub mod packet;

pub use engine::Engine;

/// Packet header size in bytes.
pub const PACKET_HEADER_SIZE: usize = 16;

/// Maximum payload bytes carried by one packet; raw containers are
/// partitioned on this stride.
pub const PACKET_DATA_SIZE: usize = 991;

/// Trailing checksum size in bytes.
pub const PACKET_CRC_SIZE: usize = 2;

/// Total size of the synthetic time segment.
pub const TIME_SEGMENT_SIZE: usize = 29;

/// Control prefix; doubled when it occurs literally in packet data.
pub const ESCAPE: u8 = 0x10;

/// Command acknowledgement pair.
pub const ACK: [u8; 2] = [0x10, 0x06];

/// Parameter-received acknowledgement.
pub const ACK_PARAM: u8 = 0xE4;

/// Pre-announcement: the requested packet is available.
pub const HAVE_PACKET: u8 = 0x91;

/// Pre-announcement: the requested packet could not be produced.
pub const NO_PACKET: u8 = 0x90;

/// End-of-transfer marker, sent as `10 E1`.
pub const END_TRANSFER: u8 = 0xE1;

/// Preamble byte of the configure-channel reply.
pub const CHANNEL_PREAMBLE: u8 = 0x1F;

// Command selector bytes, as the NABU sends them.
pub const CMD_CHANNEL_SET: u8 = 0x85;
pub const CMD_FILE_REQUEST: u8 = 0x84;
pub const CMD_STATUS_RESET: u8 = 0x83;
pub const CMD_CONFIGURE_CHANNEL: u8 = 0x82;
pub const CMD_STATUS_REQUEST: u8 = 0x81;
/// Answered with `10 E1`.
pub const CMD_EOT_ACK: u8 = 0x1E;
/// Answered with a bare parameter ack.
pub const CMD_PING: u8 = 0x05;
/// Absorbed silently.
pub const CMD_IDLE: u8 = 0x0F;

//! Command dispatcher and stage state machine.
//!
//! Bytes arrive one at a time with no framing. The first byte after a reset
//! selects a command; each later byte is consumed by that command's handler
//! at its current stage. A handler either advances its stage, possibly
//! emitting acknowledgement bytes, or completes and resets the engine.
//!
//! The engine is pure with respect to the serial link: [`Engine::feed`]
//! returns the bytes to transmit and the caller owns the I/O. Packet lookup
//! goes through a [`PacketSource`], which may block on disk or HTTP; the
//! NABU's protocol timeouts tolerate the stall.

use chrono::Local;
use tracing::{debug, info, warn};

use crate::store::PacketSource;
use crate::types::{Channel, SegmentId};

use super::{escape, packet};
use super::{
    ACK, ACK_PARAM, CHANNEL_PREAMBLE, CMD_CHANNEL_SET, CMD_CONFIGURE_CHANNEL, CMD_EOT_ACK,
    CMD_FILE_REQUEST, CMD_IDLE, CMD_PING, CMD_STATUS_REQUEST, CMD_STATUS_RESET, END_TRANSFER,
    ESCAPE, HAVE_PACKET, NO_PACKET,
};

/// Segment or packet value that signals a NABU-side reset mid-request.
const RESET_PATTERN: u8 = 0x83;

/// Parameters of an in-flight file request.
///
/// Stage numbering follows the handshake: the command byte completes stage 0
/// (the ack), stages 1..=4 assemble packet and segment numbers, 5..=6 absorb
/// the client's reaction to "no packet", 7..=8 gate the actual transfer.
#[derive(Debug, Default)]
struct FileRequest {
    stage: u8,
    packet_number: u8,
    segment: u32,
}

/// The command currently consuming inbound bytes.
#[derive(Debug)]
enum Active {
    ChannelSet { stage: u8, channel: u16 },
    FileRequest(FileRequest),
    ConfigureChannel,
    StatusRequest { stage: u8 },
}

/// Byte-driven protocol engine.
///
/// Holds at most one loaded packet at a time; the buffer is released on
/// every reset and on the completion of a transfer.
pub struct Engine<S> {
    store: S,
    active: Option<Active>,
    /// Most recent command-position byte.
    latched: Option<u8>,
    /// Command-position byte before `latched`; replayed after an unknown
    /// command so that noise between commands does not desynchronize us.
    last: Option<u8>,
    loaded: Option<Vec<u8>>,
}

impl<S: PacketSource> Engine<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            active: None,
            latched: None,
            last: None,
            loaded: None,
        }
    }

    /// True when no command is mid-flight.
    pub fn is_idle(&self) -> bool {
        self.active.is_none()
    }

    /// Consume one inbound byte and return the bytes to transmit.
    pub fn feed(&mut self, byte: u8) -> Vec<u8> {
        let mut out = Vec::new();
        match self.active.take() {
            Some(active) => self.advance(active, byte, &mut out),
            None => self.begin(byte, true, &mut out),
        }
        out
    }

    /// Dispatch `byte` as a command selector.
    fn begin(&mut self, byte: u8, allow_replay: bool, out: &mut Vec<u8>) {
        self.last = self.latched.replace(byte);
        match byte {
            CMD_CHANNEL_SET => {
                out.extend_from_slice(&ACK);
                self.active = Some(Active::ChannelSet { stage: 1, channel: 0 });
            }
            CMD_FILE_REQUEST => {
                debug!("file request");
                out.extend_from_slice(&ACK);
                self.active = Some(Active::FileRequest(FileRequest {
                    stage: 1,
                    ..FileRequest::default()
                }));
            }
            CMD_STATUS_RESET => {
                out.extend_from_slice(&ACK);
                out.push(ACK_PARAM);
                self.reset();
            }
            CMD_CONFIGURE_CHANNEL => {
                info!("configure channel");
                out.extend_from_slice(&ACK);
                self.active = Some(Active::ConfigureChannel);
            }
            CMD_STATUS_REQUEST => {
                out.extend_from_slice(&ACK);
                self.active = Some(Active::StatusRequest { stage: 1 });
            }
            CMD_EOT_ACK => {
                out.extend_from_slice(&[ESCAPE, END_TRANSFER]);
                self.reset();
            }
            CMD_PING => {
                out.push(ACK_PARAM);
                self.reset();
            }
            CMD_IDLE => self.reset(),
            unknown => {
                warn!("unrecognized command {unknown:#04X}");
                self.reset();
                // The byte may have been mid-stream noise from a NABU reset;
                // retry the previous command selector once.
                if allow_replay {
                    if let Some(previous) = self.last {
                        self.begin(previous, false, out);
                    }
                }
            }
        }
    }

    /// Feed `byte` to the in-flight command.
    fn advance(&mut self, active: Active, byte: u8, out: &mut Vec<u8>) {
        match active {
            Active::ChannelSet { stage: 1, .. } => {
                self.active = Some(Active::ChannelSet {
                    stage: 2,
                    channel: u16::from(byte),
                });
            }
            Active::ChannelSet { channel, .. } => {
                let channel = Channel(channel | (u16::from(byte) << 8));
                info!(%channel, "channel set");
                out.push(ACK_PARAM);
                self.reset();
            }
            Active::ConfigureChannel => {
                out.extend_from_slice(&[CHANNEL_PREAMBLE, ESCAPE, END_TRANSFER]);
                self.reset();
            }
            Active::StatusRequest { stage: 1 } => {
                self.active = Some(Active::StatusRequest { stage: 2 });
            }
            Active::StatusRequest { .. } => {
                out.push(ACK_PARAM);
                self.reset();
            }
            Active::FileRequest(request) => self.advance_file_request(request, byte, out),
        }
    }

    fn advance_file_request(&mut self, mut request: FileRequest, byte: u8, out: &mut Vec<u8>) {
        match request.stage {
            1 => {
                request.packet_number = byte;
                request.stage = 2;
                self.active = Some(Active::FileRequest(request));
            }
            2 => {
                request.segment = u32::from(byte);
                request.stage = 3;
                self.active = Some(Active::FileRequest(request));
            }
            3 => {
                request.segment |= u32::from(byte) << 8;
                request.stage = 4;
                self.active = Some(Active::FileRequest(request));
            }
            4 => {
                request.segment |= u32::from(byte) << 16;
                self.decide(request, out);
            }
            // Absorb the first byte of the client's "no packet" reaction.
            5 => {
                if byte == ESCAPE {
                    request.stage = 6;
                    self.active = Some(Active::FileRequest(request));
                } else {
                    self.reset();
                }
            }
            // Absorb the second byte, then we are done.
            6 => self.reset(),
            // The client acks the pre-announcement with `10 06` before the
            // transfer proper.
            7 => {
                if byte == ESCAPE {
                    request.stage = 8;
                    self.active = Some(Active::FileRequest(request));
                } else {
                    out.extend_from_slice(&ACK);
                    out.push(ACK_PARAM);
                    self.reset();
                }
            }
            8 => {
                if byte == ACK[1] {
                    if let Some(loaded) = self.loaded.take() {
                        out.extend_from_slice(&escape::escape(&loaded));
                    }
                    out.extend_from_slice(&[ESCAPE, END_TRANSFER]);
                }
                self.reset();
            }
            _ => self.reset(),
        }
    }

    /// All request parameters are in: locate or build the packet and
    /// pre-announce the outcome.
    fn decide(&mut self, mut request: FileRequest, out: &mut Vec<u8>) {
        let segment = SegmentId::new(request.segment);
        info!(%segment, packet = request.packet_number, "segment requested");
        out.push(ACK_PARAM);
        self.loaded = None;

        if segment == SegmentId::TIME {
            self.loaded = Some(packet::build_time_segment(&Local::now()));
            out.push(HAVE_PACKET);
            request.stage = 7;
            self.active = Some(Active::FileRequest(request));
            return;
        }

        if request.segment == u32::from(RESET_PATTERN) || request.packet_number == RESET_PATTERN {
            info!("NABU reset detected");
            self.reset();
            return;
        }

        match self.store.fetch(segment, request.packet_number) {
            Ok(Some(loaded)) => {
                self.loaded = Some(loaded);
                out.push(HAVE_PACKET);
                request.stage = 7;
                self.active = Some(Active::FileRequest(request));
            }
            Ok(None) => {
                warn!(%segment, packet = request.packet_number, "packet not found");
                out.push(NO_PACKET);
                request.stage = 5;
                self.active = Some(Active::FileRequest(request));
            }
            Err(error) => {
                warn!(%segment, %error, "packet lookup failed");
                self.reset();
            }
        }
    }

    /// Drop the in-flight command and any loaded packet.
    fn reset(&mut self) {
        self.active = None;
        self.loaded = None;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::error::{Error, Result};
    use crate::protocol::crc::crc16;
    use crate::protocol::escape::unescape;
    use crate::protocol::TIME_SEGMENT_SIZE;

    #[derive(Default)]
    struct StubStore {
        packets: HashMap<(u32, u8), Vec<u8>>,
        fail: bool,
    }

    impl PacketSource for StubStore {
        fn fetch(&mut self, segment: SegmentId, packet_number: u8) -> Result<Option<Vec<u8>>> {
            if self.fail {
                return Err(Error::Internal("store offline".into()));
            }
            Ok(self.packets.get(&(segment.as_u32(), packet_number)).cloned())
        }
    }

    fn engine() -> Engine<StubStore> {
        Engine::new(StubStore::default())
    }

    fn feed_all(engine: &mut Engine<StubStore>, bytes: &[u8]) -> Vec<u8> {
        bytes.iter().flat_map(|&b| engine.feed(b)).collect()
    }

    #[test]
    fn channel_set() {
        let mut engine = engine();
        let out = feed_all(&mut engine, &[0x85, 0x07, 0x00]);
        assert_eq!(out, [0x10, 0x06, 0xE4]);
        assert!(engine.is_idle());
    }

    #[test]
    fn unknown_then_known() {
        let mut engine = engine();
        // First unknown byte has no predecessor to replay.
        assert!(engine.feed(0x77).is_empty());
        assert!(engine.is_idle());

        let out = feed_all(&mut engine, &[0x85, 0x01, 0x00]);
        assert_eq!(out, [0x10, 0x06, 0xE4]);
        assert!(engine.is_idle());
    }

    #[test]
    fn unknown_replays_previous_command() {
        let mut engine = engine();
        feed_all(&mut engine, &[0x85, 0x07, 0x00]);

        // Noise after a completed command restarts that command.
        let out = engine.feed(0x77);
        assert_eq!(out, [0x10, 0x06]);
        let out = feed_all(&mut engine, &[0x02, 0x00]);
        assert_eq!(out, [0xE4]);
        assert!(engine.is_idle());
    }

    #[test]
    fn consecutive_unknown_bytes_do_not_recurse() {
        let mut engine = engine();
        assert!(engine.feed(0x77).is_empty());
        // Replaying the previous unknown byte is cut off after one attempt.
        assert!(engine.feed(0x78).is_empty());
        assert!(engine.is_idle());
    }

    #[test]
    fn status_reset_acks_immediately() {
        let mut engine = engine();
        assert_eq!(engine.feed(0x83), [0x10, 0x06, 0xE4]);
        assert!(engine.is_idle());
    }

    #[test]
    fn configure_channel() {
        let mut engine = engine();
        assert_eq!(engine.feed(0x82), [0x10, 0x06]);
        assert_eq!(engine.feed(0x00), [0x1F, 0x10, 0xE1]);
        assert!(engine.is_idle());
    }

    #[test]
    fn status_request_absorbs_one_byte() {
        let mut engine = engine();
        assert_eq!(engine.feed(0x81), [0x10, 0x06]);
        assert!(engine.feed(0x00).is_empty());
        assert_eq!(engine.feed(0x00), [0xE4]);
        assert!(engine.is_idle());
    }

    #[test]
    fn short_commands() {
        let mut engine = engine();
        assert_eq!(engine.feed(0x1E), [0x10, 0xE1]);
        assert_eq!(engine.feed(0x05), [0xE4]);
        assert!(engine.feed(0x0F).is_empty());
        assert!(engine.is_idle());
    }

    #[test]
    fn time_segment_request() {
        let mut engine = engine();
        let out = feed_all(&mut engine, &[0x84, 0x01, 0xFF, 0xFF, 0x7F]);
        assert_eq!(out, [0x10, 0x06, 0xE4, 0x91]);

        // Client acks with `10 06`, gating the transfer.
        assert!(engine.feed(0x10).is_empty());
        let out = engine.feed(0x06);

        // Trailer is `10 E1`; everything before it is the escaped segment.
        assert_eq!(&out[out.len() - 2..], &[0x10, 0xE1]);
        let segment = unescape(&out[..out.len() - 2]);
        assert_eq!(segment.len(), TIME_SEGMENT_SIZE);
        assert_eq!(&segment[0..3], &[0x7F, 0xFF, 0xFF]);
        let stored = (u16::from(segment[27]) << 8) | u16::from(segment[28]);
        assert_eq!(stored, crc16(&segment[..27]));
        assert!(engine.is_idle());
    }

    #[test]
    fn packet_not_found_absorbs_two_bytes() {
        let mut engine = engine();
        let out = feed_all(&mut engine, &[0x84, 0x00, 0xAA, 0xAA, 0xAA]);
        assert_eq!(out, [0x10, 0x06, 0xE4, 0x90]);

        assert!(engine.feed(0x10).is_empty());
        assert!(!engine.is_idle());
        assert!(engine.feed(0x06).is_empty());
        assert!(engine.is_idle());
    }

    #[test]
    fn not_found_resets_on_unexpected_byte() {
        let mut engine = engine();
        feed_all(&mut engine, &[0x84, 0x00, 0xAA, 0xAA, 0xAA]);
        assert!(engine.feed(0x42).is_empty());
        assert!(engine.is_idle());
    }

    #[test]
    fn stored_packet_is_escaped_and_bracketed() {
        let mut engine = engine();
        let payload = vec![0x01, 0x10, 0x02];
        engine.store.packets.insert((0x20, 1), payload.clone());

        let out = feed_all(&mut engine, &[0x84, 0x01, 0x20, 0x00, 0x00]);
        assert_eq!(out, [0x10, 0x06, 0xE4, 0x91]);

        assert!(engine.feed(0x10).is_empty());
        let out = engine.feed(0x06);
        assert_eq!(out, [0x01, 0x10, 0x10, 0x02, 0x10, 0xE1]);
        assert!(engine.is_idle());
    }

    #[test]
    fn transfer_gate_rejects_wrong_first_ack_byte() {
        let mut engine = engine();
        engine.store.packets.insert((0x20, 0), vec![0xAA]);

        feed_all(&mut engine, &[0x84, 0x00, 0x20, 0x00, 0x00]);
        let out = engine.feed(0x42);
        assert_eq!(out, [0x10, 0x06, 0xE4]);
        assert!(engine.is_idle());
    }

    #[test]
    fn transfer_gate_rejects_wrong_second_ack_byte() {
        let mut engine = engine();
        engine.store.packets.insert((0x20, 0), vec![0xAA]);

        feed_all(&mut engine, &[0x84, 0x00, 0x20, 0x00, 0x00, 0x10]);
        assert!(engine.feed(0x42).is_empty());
        assert!(engine.is_idle());
    }

    #[test]
    fn reset_pattern_inside_file_request_is_silent() {
        let mut engine = engine();

        // Packet number 0x83.
        let out = feed_all(&mut engine, &[0x84, 0x83, 0x01, 0x00, 0x00]);
        assert_eq!(out, [0x10, 0x06, 0xE4]);
        assert!(engine.is_idle());

        // Segment number 0x000083.
        let out = feed_all(&mut engine, &[0x84, 0x00, 0x83, 0x00, 0x00]);
        assert_eq!(out, [0x10, 0x06, 0xE4]);
        assert!(engine.is_idle());
    }

    #[test]
    fn store_failure_aborts_request() {
        let mut engine = engine();
        engine.store.fail = true;

        let out = feed_all(&mut engine, &[0x84, 0x00, 0x20, 0x00, 0x00]);
        assert_eq!(out, [0x10, 0x06, 0xE4]);
        assert!(engine.is_idle());
    }
}

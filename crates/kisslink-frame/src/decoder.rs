use std::time::{Duration, Instant};

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::{debug, trace, warn};

use crate::ax25::HEADER_SIZE;
use crate::kiss::{command_name, CMD_DATA, CMD_READY, CMD_UNKNOWN, FEND, FESC, TFEND, TFESC};

/// Default maximum payload size per frame, excluding the address header.
pub const DEFAULT_MTU: usize = 564;

/// Events produced while decoding the inbound byte stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeEvent {
    /// A complete data frame, with the 16-byte address header stripped.
    Packet(Bytes),
    /// The device signalled it is ready for the next frame.
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    InFrame,
    Escaped,
}

/// Byte-at-a-time KISS frame decoder.
///
/// Frame boundaries are not known in advance and the transport may deliver
/// partial frames across reads, so decoding never operates on a whole
/// buffer: feed one byte at a time with [`Decoder::push`]. Garbage between
/// frames is ignored, oversized frames are truncated, and a stalled partial
/// frame is discarded via [`Decoder::expire_idle`].
#[derive(Debug)]
pub struct Decoder {
    state: State,
    command: u8,
    buf: BytesMut,
    cap: usize,
    dropped: usize,
    last_byte_at: Option<Instant>,
}

impl Decoder {
    /// Create a decoder accepting payloads up to `mtu` bytes plus the
    /// address header.
    pub fn new(mtu: usize) -> Self {
        let cap = mtu + HEADER_SIZE;
        Self {
            state: State::Idle,
            command: CMD_UNKNOWN,
            buf: BytesMut::with_capacity(cap),
            cap,
            dropped: 0,
            last_byte_at: None,
        }
    }

    /// Consume one byte from the stream at time `now`.
    pub fn push(&mut self, byte: u8, now: Instant) -> Option<DecodeEvent> {
        self.last_byte_at = Some(now);

        // FEND handling comes first, even mid-escape: a delimiter always
        // either completes a data frame or resynchronizes the stream.
        if self.state != State::Idle && byte == FEND && self.command == CMD_DATA {
            let event = self.finish_frame();
            self.state = State::Idle;
            self.command = CMD_UNKNOWN;
            return event;
        }
        if byte == FEND {
            self.state = State::InFrame;
            self.command = CMD_UNKNOWN;
            self.buf.clear();
            self.dropped = 0;
            return None;
        }
        if self.state == State::Idle {
            // Noise between frames.
            return None;
        }
        if self.buf.len() >= self.cap {
            self.dropped += 1;
            return None;
        }
        if self.command == CMD_UNKNOWN {
            // First byte after the delimiter. The high nibble selects a
            // hardware HDLC port; single-port assumption, so ignore it.
            self.command = byte & 0x0F;
            trace!(command = command_name(self.command), "frame opened");
            return None;
        }

        match self.command {
            CMD_DATA => {
                if self.state == State::Escaped {
                    let mapped = match byte {
                        TFEND => FEND,
                        TFESC => FESC,
                        other => other,
                    };
                    self.buf.put_u8(mapped);
                    self.state = State::InFrame;
                } else if byte == FESC {
                    self.state = State::Escaped;
                } else {
                    self.buf.put_u8(byte);
                }
                None
            }
            CMD_READY => Some(DecodeEvent::Ready),
            _ => None,
        }
    }

    /// Consume a run of bytes received at the same time, collecting events.
    pub fn feed(&mut self, bytes: &[u8], now: Instant) -> Vec<DecodeEvent> {
        bytes.iter().filter_map(|&b| self.push(b, now)).collect()
    }

    /// Discard a partial frame if no byte has arrived for `timeout`.
    ///
    /// Guards against a transport glitch leaving the parser stuck
    /// mid-frame. Returns true if a partial frame was discarded.
    pub fn expire_idle(&mut self, now: Instant, timeout: Duration) -> bool {
        if self.buf.is_empty() {
            return false;
        }
        match self.last_byte_at {
            Some(last) if now.duration_since(last) > timeout => {
                debug!(
                    buffered = self.buf.len(),
                    "discarding stalled partial frame"
                );
                self.reset();
                true
            }
            _ => false,
        }
    }

    /// Return to the initial state, dropping any buffered bytes.
    pub fn reset(&mut self) {
        self.state = State::Idle;
        self.command = CMD_UNKNOWN;
        self.buf.clear();
        self.dropped = 0;
        self.last_byte_at = None;
    }

    /// Whether a frame is currently being accumulated.
    pub fn has_partial(&self) -> bool {
        !self.buf.is_empty()
    }

    fn finish_frame(&mut self) -> Option<DecodeEvent> {
        if self.dropped > 0 {
            warn!(
                dropped = self.dropped,
                cap = self.cap,
                "oversized frame truncated"
            );
            self.dropped = 0;
        }
        if self.buf.len() <= HEADER_SIZE {
            // Nothing beyond the address header; not a deliverable packet.
            trace!(len = self.buf.len(), "discarding undersized frame");
            self.buf.clear();
            return None;
        }
        let mut frame = self.buf.split();
        frame.advance(HEADER_SIZE);
        Some(DecodeEvent::Packet(frame.freeze()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ax25::{encode_header, Ax25Address};
    use crate::kiss::data_frame;

    fn body_for(payload: &[u8]) -> Vec<u8> {
        let dst = Ax25Address::new("APZRNS", 0).unwrap();
        let src = Ax25Address::new("ABCDE", 1).unwrap();
        let mut body = encode_header(&dst, &src);
        body.extend_from_slice(payload);
        body
    }

    fn decode_all(decoder: &mut Decoder, bytes: &[u8]) -> Vec<DecodeEvent> {
        decoder.feed(bytes, Instant::now())
    }

    #[test]
    fn roundtrip_through_build_and_parse() {
        // Payload exercising both reserved bytes and plain data.
        let payload = [0x01, FEND, 0x02, FESC, TFEND, TFESC, 0xFF, 0x00];
        let wire = data_frame(CMD_DATA, &body_for(&payload));

        let mut decoder = Decoder::new(DEFAULT_MTU);
        let events = decode_all(&mut decoder, &wire);

        assert_eq!(events, vec![DecodeEvent::Packet(Bytes::copy_from_slice(&payload))]);
    }

    #[test]
    fn delivers_exactly_one_packet_per_frame() {
        let wire = data_frame(CMD_DATA, &body_for(b"hi"));

        let mut decoder = Decoder::new(DEFAULT_MTU);
        let events = decode_all(&mut decoder, &wire);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0], DecodeEvent::Packet(Bytes::from_static(b"hi")));
    }

    #[test]
    fn strips_address_header() {
        let wire = data_frame(CMD_DATA, &body_for(b"payload"));
        let mut decoder = Decoder::new(DEFAULT_MTU);

        let events = decode_all(&mut decoder, &wire);
        match &events[0] {
            DecodeEvent::Packet(p) => assert_eq!(p.as_ref(), b"payload"),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn header_only_frame_is_not_delivered() {
        let wire = data_frame(CMD_DATA, &body_for(b""));
        let mut decoder = Decoder::new(DEFAULT_MTU);
        assert!(decode_all(&mut decoder, &wire).is_empty());
    }

    #[test]
    fn ignores_noise_between_frames() {
        let mut wire = vec![0x55, 0xAA, 0x13];
        wire.extend_from_slice(&data_frame(CMD_DATA, &body_for(b"ok")));
        wire.extend_from_slice(&[0x99, 0x11]);

        let mut decoder = Decoder::new(DEFAULT_MTU);
        let events = decode_all(&mut decoder, &wire);
        assert_eq!(events, vec![DecodeEvent::Packet(Bytes::from_static(b"ok"))]);
    }

    #[test]
    fn tolerates_split_delivery() {
        let wire = data_frame(CMD_DATA, &body_for(b"split"));
        let (a, b) = wire.split_at(wire.len() / 2);

        let mut decoder = Decoder::new(DEFAULT_MTU);
        let now = Instant::now();
        let mut events = decoder.feed(a, now);
        events.extend(decoder.feed(b, now));

        assert_eq!(events, vec![DecodeEvent::Packet(Bytes::from_static(b"split"))]);
    }

    #[test]
    fn back_to_back_frames_share_a_delimiter_boundary() {
        let mut wire = data_frame(CMD_DATA, &body_for(b"one")).to_vec();
        wire.extend_from_slice(&data_frame(CMD_DATA, &body_for(b"two")));

        let mut decoder = Decoder::new(DEFAULT_MTU);
        let events = decode_all(&mut decoder, &wire);

        assert_eq!(
            events,
            vec![
                DecodeEvent::Packet(Bytes::from_static(b"one")),
                DecodeEvent::Packet(Bytes::from_static(b"two")),
            ]
        );
    }

    #[test]
    fn ready_command_emits_one_event_per_signal() {
        let wire = [FEND, CMD_READY, 0x01, FEND];
        let mut decoder = Decoder::new(DEFAULT_MTU);
        let events = decode_all(&mut decoder, &wire);
        assert_eq!(events, vec![DecodeEvent::Ready]);
    }

    #[test]
    fn port_nibble_is_ignored() {
        // Command byte 0x90: port 9, command 0 (data).
        let body = body_for(b"port");
        let mut wire = vec![FEND, 0x90];
        wire.extend_from_slice(&crate::kiss::escape(&body));
        wire.push(FEND);

        let mut decoder = Decoder::new(DEFAULT_MTU);
        let events = decode_all(&mut decoder, &wire);
        assert_eq!(events, vec![DecodeEvent::Packet(Bytes::from_static(b"port"))]);
    }

    #[test]
    fn config_command_frames_produce_no_events() {
        let wire = [FEND, 0x01, 0x23, FEND, FEND, 0x05, 0x01, FEND];
        let mut decoder = Decoder::new(DEFAULT_MTU);
        assert!(decode_all(&mut decoder, &wire).is_empty());
    }

    #[test]
    fn oversized_frame_is_truncated_not_overflowed() {
        let mtu = 8;
        let payload = vec![0x42u8; 64];
        let wire = data_frame(CMD_DATA, &body_for(&payload));

        let mut decoder = Decoder::new(mtu);
        let events = decode_all(&mut decoder, &wire);

        assert_eq!(events.len(), 1);
        match &events[0] {
            DecodeEvent::Packet(p) => {
                assert_eq!(p.len(), mtu);
                assert!(p.iter().all(|&b| b == 0x42));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn idle_timeout_discards_partial_frame() {
        let wire = data_frame(CMD_DATA, &body_for(b"stuck"));
        let start = Instant::now();

        let mut decoder = Decoder::new(DEFAULT_MTU);
        // Feed all but the closing delimiter.
        decoder.feed(&wire[..wire.len() - 1], start);
        assert!(decoder.has_partial());

        // Not yet expired.
        assert!(!decoder.expire_idle(start + Duration::from_millis(50), Duration::from_millis(100)));
        assert!(decoder.has_partial());

        // Expired; buffer discarded and parser back to idle.
        assert!(decoder.expire_idle(start + Duration::from_millis(200), Duration::from_millis(100)));
        assert!(!decoder.has_partial());

        // A fresh frame decodes cleanly afterwards.
        let events = decoder.feed(&wire, start + Duration::from_millis(300));
        assert_eq!(events, vec![DecodeEvent::Packet(Bytes::from_static(b"stuck"))]);
    }

    #[test]
    fn expire_idle_is_inert_with_empty_buffer() {
        let mut decoder = Decoder::new(DEFAULT_MTU);
        assert!(!decoder.expire_idle(Instant::now(), Duration::from_millis(100)));
    }

    #[test]
    fn truncated_frame_never_reaches_the_owner() {
        // A frame cut off mid-header is terminated by the next delimiter
        // and silently discarded; the stream resynchronizes on the frame
        // after that.
        let broken = &data_frame(CMD_DATA, &body_for(b"broken"))[..10];
        let good = data_frame(CMD_DATA, &body_for(b"good"));

        let mut decoder = Decoder::new(DEFAULT_MTU);
        let now = Instant::now();
        let mut events = decoder.feed(broken, now);
        events.extend(decoder.feed(&good, now));
        events.extend(decoder.feed(&good, now));

        assert_eq!(events, vec![DecodeEvent::Packet(Bytes::from_static(b"good"))]);
    }
}

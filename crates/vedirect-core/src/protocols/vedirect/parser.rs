use log::{debug, trace};
use serde::{Deserialize, Serialize};

use super::error::FrameError;
use super::frame::Frame;
use super::layout;
use super::reader::{ByteSum, FieldBuffer, is_hex_marker};

/// Position of the decoder within the byte grammar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DecoderState {
    #[default]
    WaitHeader,
    InKey,
    InValue,
    InChecksum,
    Hex,
}

/// Counters describing what the decoder has seen so far.
///
/// Checksum failures never reach the frame stream; this is where they show up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoderStats {
    /// Bytes fed, including HEX traffic.
    pub bytes: u64,
    /// Frames returned to the caller.
    pub frames: u64,
    /// `Checksum` fields whose byte sum validated.
    pub checksum_groups: u64,
    /// Cycles abandoned: `Checksum` fields whose byte sum did not validate,
    /// plus fields that overran the length limit.
    pub checksum_failures: u64,
    /// Number of times the HEX marker switched the decoder into HEX mode.
    pub hex_segments: u64,
    /// Pending fields dropped because their cycle was abandoned.
    pub discarded_fields: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum Anchor {
    #[default]
    Unset,
    Key(Vec<u8>),
    CycleComplete,
}

/// Streaming decoder for the VE.Direct text protocol.
///
/// Feed it one byte at a time; it returns a [`Frame`] whenever the leading
/// field name of a block recurs and the checksum that follows validates.
/// Blocks that validate before the leading field recurs are merged into the
/// same pending frame. A failed checksum silently drops everything pending.
///
/// # Examples
/// ```
/// use vedirect_core::FrameDecoder;
///
/// let mut body = b"\r\nV\t13580\r\nI\t6900\r\nV\t13580\r\nI\t6900\r\nChecksum\t".to_vec();
/// let sum = body.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
/// body.push(0u8.wrapping_sub(sum));
///
/// let mut decoder = FrameDecoder::new();
/// let frames: Vec<_> = body.iter().filter_map(|b| decoder.feed(*b)).collect();
/// assert_eq!(frames.len(), 1);
/// assert_eq!(frames[0].get("V"), Some("13580"));
/// assert_eq!(frames[0].get("I"), Some("6900"));
/// ```
#[derive(Debug, Default)]
pub struct FrameDecoder {
    state: DecoderState,
    key: FieldBuffer,
    value: FieldBuffer,
    anchor: Anchor,
    sum: ByteSum,
    pending: Frame,
    stats: DecoderStats,
    last_error: Option<FrameError>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DecoderState {
        self.state
    }

    pub fn stats(&self) -> &DecoderStats {
        &self.stats
    }

    /// Most recent abandoned cycle, if any.
    pub fn last_error(&self) -> Option<&FrameError> {
        self.last_error.as_ref()
    }

    /// Drops all in-progress data and returns to `WaitHeader`. Stats are kept.
    pub fn reset(&mut self) {
        self.state = DecoderState::WaitHeader;
        self.key.clear();
        self.value.clear();
        self.anchor = Anchor::Unset;
        self.sum.reset();
        self.pending = Frame::new();
    }

    pub fn feed_all(&mut self, bytes: &[u8]) -> Vec<Frame> {
        bytes.iter().filter_map(|byte| self.feed(*byte)).collect()
    }

    pub fn feed(&mut self, byte: u8) -> Option<Frame> {
        self.stats.bytes += 1;

        if is_hex_marker(byte) && self.state != DecoderState::InChecksum {
            if self.state != DecoderState::Hex {
                self.stats.hex_segments += 1;
                trace!("hex segment started in state {:?}", self.state);
                // A field cut short by HEX traffic is abandoned.
                self.key.clear();
                self.value.clear();
            }
            self.state = DecoderState::Hex;
        }

        match self.state {
            DecoderState::WaitHeader => {
                self.sum.add(byte);
                if byte == layout::HEADER_LF {
                    self.state = DecoderState::InKey;
                }
                None
            }
            DecoderState::InKey => {
                self.sum.add(byte);
                if byte == layout::DELIMITER {
                    self.end_key();
                } else if self.key.is_full() {
                    self.end_overlong_field();
                } else {
                    self.key.push(byte);
                }
                None
            }
            DecoderState::InValue => {
                self.sum.add(byte);
                if byte == layout::HEADER_CR {
                    let key = self.key.take_string();
                    let value = self.value.take_string();
                    self.pending.insert(key, value);
                    self.state = DecoderState::WaitHeader;
                } else if self.value.is_full() {
                    self.end_overlong_field();
                } else {
                    self.value.push(byte);
                }
                None
            }
            DecoderState::InChecksum => {
                self.sum.add(byte);
                self.key.clear();
                self.value.clear();
                self.state = DecoderState::WaitHeader;
                self.end_checksum()
            }
            DecoderState::Hex => {
                self.sum.reset();
                if byte == layout::HEADER_LF {
                    self.state = DecoderState::WaitHeader;
                }
                None
            }
        }
    }

    fn end_key(&mut self) {
        match &self.anchor {
            Anchor::Key(anchor) if anchor.as_slice() == self.key.as_bytes() => {
                self.anchor = Anchor::CycleComplete;
            }
            Anchor::Unset => {
                self.anchor = Anchor::Key(self.key.as_bytes().to_vec());
            }
            Anchor::Key(_) | Anchor::CycleComplete => {}
        }

        self.state = if self.key.is_checksum_key() {
            DecoderState::InChecksum
        } else {
            DecoderState::InValue
        };
    }

    fn end_checksum(&mut self) -> Option<Frame> {
        if !self.sum.is_valid() {
            self.abandon_cycle(FrameError::ChecksumMismatch {
                sum: self.sum.value(),
                discarded_fields: self.pending.len(),
            });
            return None;
        }

        self.sum.reset();
        self.stats.checksum_groups += 1;
        if self.anchor != Anchor::CycleComplete {
            return None;
        }

        self.anchor = Anchor::Unset;
        self.stats.frames += 1;
        let frame = std::mem::take(&mut self.pending);
        trace!("frame complete with {} fields", frame.len());
        Some(frame)
    }

    /// No real field gets this long; resync on the next header.
    fn end_overlong_field(&mut self) {
        self.key.clear();
        self.value.clear();
        self.state = DecoderState::WaitHeader;
        self.abandon_cycle(FrameError::FieldTooLong {
            limit: layout::MAX_FIELD_LEN,
            discarded_fields: self.pending.len(),
        });
    }

    fn abandon_cycle(&mut self, err: FrameError) {
        debug!("{err}");
        self.stats.checksum_failures += 1;
        self.stats.discarded_fields += self.pending.len() as u64;
        self.last_error = Some(err);
        self.sum.reset();
        self.anchor = Anchor::Unset;
        self.pending = Frame::new();
    }
}

#[cfg(test)]
mod tests {
    use super::{DecoderState, FrameDecoder};
    use crate::protocols::vedirect::error::FrameError;
    use crate::protocols::vedirect::layout;

    fn with_checksum(body: &[u8]) -> Vec<u8> {
        let mut bytes = body.to_vec();
        let sum = bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
        bytes.push(0u8.wrapping_sub(sum));
        bytes
    }

    fn block(fields: &[(&str, &str)]) -> Vec<u8> {
        let mut body = Vec::new();
        for (key, value) in fields {
            body.extend_from_slice(b"\r\n");
            body.extend_from_slice(key.as_bytes());
            body.push(b'\t');
            body.extend_from_slice(value.as_bytes());
        }
        body.extend_from_slice(b"\r\nChecksum\t");
        with_checksum(&body)
    }

    #[test]
    fn decodes_repeated_anchor_cycle() {
        let bytes = with_checksum(b"\r\nV\t13580\r\nI\t6900\r\nV\t13580\r\nI\t6900\r\nChecksum\t");
        let mut decoder = FrameDecoder::new();

        let frames = decoder.feed_all(&bytes);

        assert_eq!(frames.len(), 1);
        let frame = &frames[0];
        assert_eq!(frame.keys().collect::<Vec<_>>(), vec!["V", "I"]);
        assert_eq!(frame.get("V"), Some("13580"));
        assert_eq!(frame.get("I"), Some("6900"));
        assert!(!frame.contains_key("Checksum"));
        assert_eq!(decoder.state(), DecoderState::WaitHeader);
    }

    #[test]
    fn frame_is_returned_on_checksum_byte() {
        let bytes = with_checksum(b"\r\nV\t1\r\nV\t1\r\nChecksum\t");
        let (last, head) = bytes.split_last().unwrap();
        let mut decoder = FrameDecoder::new();

        assert!(decoder.feed_all(head).is_empty());
        assert_eq!(decoder.state(), DecoderState::InChecksum);
        assert!(decoder.feed(*last).is_some());
    }

    #[test]
    fn single_block_is_held_until_anchor_recurs() {
        let first = block(&[("PID", "0xA053"), ("V", "12800")]);
        let second = block(&[("PID", "0xA053"), ("V", "12810"), ("I", "-40")]);
        let mut decoder = FrameDecoder::new();

        assert!(decoder.feed_all(&first).is_empty());
        assert_eq!(decoder.stats().checksum_groups, 1);

        let frames = decoder.feed_all(&second);
        assert_eq!(frames.len(), 1);
        let frame = &frames[0];
        assert_eq!(frame.keys().collect::<Vec<_>>(), vec!["PID", "V", "I"]);
        assert_eq!(frame.get("V"), Some("12810"));
        assert_eq!(frame.get("I"), Some("-40"));
    }

    #[test]
    fn steady_stream_emits_every_second_block() {
        let fields = [("V", "13580"), ("I", "6900"), ("CS", "3")];
        let mut decoder = FrameDecoder::new();
        let mut frames = Vec::new();
        for _ in 0..6 {
            frames.extend(decoder.feed_all(&block(&fields)));
        }

        assert_eq!(frames.len(), 3);
        for frame in &frames {
            assert_eq!(frame.len(), 3);
            assert_eq!(frame.get("CS"), Some("3"));
        }
    }

    #[test]
    fn corrupted_checksum_drops_frame_and_recovers() {
        let mut bad = with_checksum(b"\r\nV\t13580\r\nI\t6900\r\nV\t13580\r\nI\t6900\r\nChecksum\t");
        let last = bad.len() - 1;
        bad[last] = bad[last].wrapping_add(1);
        let good = with_checksum(b"\r\nV\t12000\r\nI\t100\r\nV\t12000\r\nI\t100\r\nChecksum\t");
        let mut decoder = FrameDecoder::new();

        assert!(decoder.feed_all(&bad).is_empty());
        assert_eq!(decoder.stats().checksum_failures, 1);
        assert_eq!(decoder.stats().discarded_fields, 2);
        assert_eq!(
            decoder.last_error(),
            Some(&FrameError::ChecksumMismatch {
                sum: 1,
                discarded_fields: 2
            })
        );

        let frames = decoder.feed_all(&good);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].get("V"), Some("12000"));
        assert_eq!(frames[0].get("I"), Some("100"));
    }

    #[test]
    fn checksum_failure_discards_merged_groups() {
        let first = block(&[("V", "1"), ("I", "2")]);
        let mut second = block(&[("V", "1"), ("I", "2")]);
        let last = second.len() - 1;
        second[last] ^= 0x01;
        let mut decoder = FrameDecoder::new();

        assert!(decoder.feed_all(&first).is_empty());
        assert!(decoder.feed_all(&second).is_empty());
        assert_eq!(decoder.stats().discarded_fields, 2);

        // The anchor was cleared, so two more good blocks are needed.
        assert!(decoder.feed_all(&first).is_empty());
        assert_eq!(decoder.feed_all(&first).len(), 1);
    }

    #[test]
    fn hex_segment_does_not_touch_text_frames() {
        let text = with_checksum(b"\r\nV\t13580\r\nI\t6900\r\nV\t13580\r\nI\t6900\r\nChecksum\t");
        let mut stream = text.clone();
        stream.extend_from_slice(b":A0102000543\n");
        stream.extend_from_slice(&text);
        let mut decoder = FrameDecoder::new();

        let frames = decoder.feed_all(&stream);

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], frames[1]);
        assert_eq!(decoder.stats().hex_segments, 1);
        assert_eq!(decoder.stats().checksum_failures, 0);
    }

    #[test]
    fn hex_marker_in_value_abandons_text_field() {
        let mut decoder = FrameDecoder::new();
        decoder.feed_all(b"\r\nV\t12:");
        assert_eq!(decoder.state(), DecoderState::Hex);
        decoder.feed_all(b"7F0ED0071\n");
        assert_eq!(decoder.state(), DecoderState::WaitHeader);

        let frames = decoder.feed_all(&with_checksum(b"\r\nV\t5\r\nV\t5\r\nChecksum\t"));
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].get("V"), Some("5"));
    }

    #[test]
    fn hex_marker_is_a_valid_checksum_byte() {
        let mut bytes = b"\r\nV\t1\r\nI\tbZ\r\nV\t1\r\nChecksum\t".to_vec();
        bytes.push(b':');
        let mut decoder = FrameDecoder::new();

        let frames = decoder.feed_all(&bytes);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].get("I"), Some("bZ"));
        assert_eq!(decoder.stats().hex_segments, 0);
    }

    #[test]
    fn noise_before_first_header_is_ignored_after_resync() {
        let mut stream = b"\x00\xffgarbage".to_vec();
        stream.extend_from_slice(&with_checksum(b"\r\nV\t1\r\nV\t1\r\nChecksum\t"));
        let mut decoder = FrameDecoder::new();

        // Garbage is summed into the first group, which fails.
        assert!(decoder.feed_all(&stream).is_empty());
        assert_eq!(decoder.stats().checksum_failures, 1);

        let frames = decoder.feed_all(&with_checksum(b"\r\nV\t1\r\nV\t1\r\nChecksum\t"));
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn endless_key_is_capped_and_decoder_resyncs() {
        let mut stream = b"\r\n".to_vec();
        stream.resize(2 + 1_000_000, b'A');
        let mut decoder = FrameDecoder::new();

        assert!(decoder.feed_all(&stream).is_empty());
        assert!(decoder.key.as_bytes().is_empty());
        assert_eq!(decoder.state(), DecoderState::WaitHeader);
        assert_eq!(decoder.stats().checksum_failures, 1);
        assert_eq!(
            decoder.last_error(),
            Some(&FrameError::FieldTooLong {
                limit: layout::MAX_FIELD_LEN,
                discarded_fields: 0
            })
        );

        // Trailing noise spoils the next group; the one after decodes.
        let cycle = with_checksum(b"\r\nV\t1\r\nV\t1\r\nChecksum\t");
        assert!(decoder.feed_all(&cycle).is_empty());
        assert_eq!(decoder.feed_all(&cycle).len(), 1);
    }

    #[test]
    fn overlong_value_drops_pending_fields() {
        let mut stream = block(&[("PID", "0xA053")]);
        stream.extend_from_slice(b"\r\nV\t");
        stream.resize(stream.len() + layout::MAX_FIELD_LEN + 1, b'9');
        let mut decoder = FrameDecoder::new();

        assert!(decoder.feed_all(&stream).is_empty());
        assert!(decoder.value.as_bytes().is_empty());
        assert_eq!(decoder.stats().checksum_failures, 1);
        assert_eq!(decoder.stats().discarded_fields, 1);
    }

    #[test]
    fn reset_clears_pending_but_keeps_stats() {
        let mut decoder = FrameDecoder::new();
        decoder.feed_all(&block(&[("V", "1")]));
        decoder.feed_all(b"\r\nV\t2");
        decoder.reset();

        assert_eq!(decoder.state(), DecoderState::WaitHeader);
        assert_eq!(decoder.stats().checksum_groups, 1);
        assert!(decoder.feed_all(&block(&[("V", "3")])).is_empty());
        let frames = decoder.feed_all(&block(&[("V", "4")]));
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].get("V"), Some("4"));
    }

    #[test]
    fn independent_decoders_agree() {
        let mut stream = block(&[("V", "1"), ("I", "2")]);
        stream.extend_from_slice(b":154\n");
        stream.extend(block(&[("V", "1"), ("I", "3")]));
        stream.extend(block(&[("V", "9"), ("I", "9")]));
        stream.extend(block(&[("V", "9"), ("I", "8")]));

        let first = FrameDecoder::new().feed_all(&stream);
        let second = FrameDecoder::new().feed_all(&stream);
        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
    }
}

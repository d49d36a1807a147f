use tracing::debug;

use crate::HEADER_SIZE;

/// Default capacity of each inbound buffer.
pub const DEFAULT_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy)]
enum Phase {
    /// Collecting the 4-byte length header.
    Header,
    /// Collecting a body with `left` bytes still missing.
    Body { left: usize },
}

/// Reassembles chunked input into complete length-prefixed messages.
///
/// Two fixed-capacity buffers are kept: writes land in `primary` at
/// `consumed % capacity`, so a message longer than the buffer overwrites
/// earlier bytes of itself and is dropped on completion. Bytes of the
/// *next* message that arrived in the same chunk are carried over through
/// `alternate`, which is then promoted to be the new primary. Swapping is
/// a buffer swap, never a content copy beyond that carry.
pub struct InboundAssembly {
    primary: Box<[u8]>,
    alternate: Box<[u8]>,
    capacity: usize,
    /// Bytes of the current logical message accepted so far (header
    /// included). Monotone per message, never wrapped.
    consumed: usize,
    phase: Phase,
}

impl Default for InboundAssembly {
    fn default() -> Self {
        Self::new()
    }
}

impl InboundAssembly {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > HEADER_SIZE, "capacity must exceed the header");
        Self {
            primary: vec![0; capacity].into_boxed_slice(),
            alternate: vec![0; capacity].into_boxed_slice(),
            capacity,
            consumed: 0,
            phase: Phase::Header,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Feed a chunk of raw input. `handle` is invoked exactly once per
    /// completed message with the payload (header stripped); the view
    /// aliases the internal buffer and is only valid during the call.
    pub fn feed<F>(&mut self, mut chunk: &[u8], mut handle: F)
    where
        F: FnMut(&[u8]),
    {
        while !chunk.is_empty() {
            let dst = self.writable();
            let n = chunk.len().min(dst.len());
            dst[..n].copy_from_slice(&chunk[..n]);
            self.commit(n, &mut handle);
            chunk = &chunk[n..];
        }
    }

    /// Contiguous writable tail of the active buffer.
    fn writable(&mut self) -> &mut [u8] {
        let pos = self.consumed % self.capacity;
        &mut self.primary[pos..]
    }

    /// Run the state machine over `len` bytes just written via
    /// [`Self::writable`].
    fn commit<F>(&mut self, mut len: usize, handle: &mut F)
    where
        F: FnMut(&[u8]),
    {
        loop {
            match self.phase {
                Phase::Header => {
                    if len == 0 {
                        return;
                    }
                    if self.consumed + len < HEADER_SIZE {
                        self.consumed += len;
                        return;
                    }
                    len -= HEADER_SIZE - self.consumed;
                    self.consumed = HEADER_SIZE;
                    let declared = u32::from_ne_bytes(
                        self.primary[..HEADER_SIZE].try_into().unwrap(),
                    ) as usize;
                    self.phase = Phase::Body { left: declared };
                }
                Phase::Body { left } => {
                    if len < left {
                        self.consumed += len;
                        self.phase = Phase::Body { left: left - len };
                        return;
                    }
                    self.consumed += left;
                    len -= left;
                    if self.consumed <= self.capacity {
                        if len > 0 {
                            // Carry the head of the next message over.
                            self.alternate[..len].copy_from_slice(
                                &self.primary[self.consumed..self.consumed + len],
                            );
                        }
                        handle(&self.primary[HEADER_SIZE..self.consumed]);
                        std::mem::swap(&mut self.primary, &mut self.alternate);
                    } else {
                        debug!(
                            declared = self.consumed - HEADER_SIZE,
                            capacity = self.capacity,
                            "dropping message larger than inbound buffer"
                        );
                        if len > 0 {
                            let start = self.consumed % self.capacity;
                            self.alternate[..len]
                                .copy_from_slice(&self.primary[start..start + len]);
                            std::mem::swap(&mut self.primary, &mut self.alternate);
                        }
                    }
                    self.phase = Phase::Header;
                    self.consumed = 0;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(payload: &[u8]) -> Vec<u8> {
        let mut wire = (payload.len() as u32).to_ne_bytes().to_vec();
        wire.extend_from_slice(payload);
        wire
    }

    fn collect(assembly: &mut InboundAssembly, chunks: &[&[u8]]) -> Vec<Vec<u8>> {
        let mut messages = Vec::new();
        for chunk in chunks {
            assembly.feed(chunk, |payload| messages.push(payload.to_vec()));
        }
        messages
    }

    #[test]
    fn single_frame_single_chunk() {
        let mut assembly = InboundAssembly::new();
        let wire = frame(b"[\"1\",[\"version\"]]");
        let messages = collect(&mut assembly, &[&wire]);
        assert_eq!(messages, vec![b"[\"1\",[\"version\"]]".to_vec()]);
    }

    #[test]
    fn every_split_point_yields_identical_message() {
        let payload = b"[\"7\",[\"serial_list\"]]";
        let wire = frame(payload);
        for split in 1..wire.len() {
            let mut assembly = InboundAssembly::new();
            let messages = collect(&mut assembly, &[&wire[..split], &wire[split..]]);
            assert_eq!(messages.len(), 1, "split at {split}");
            assert_eq!(messages[0], payload, "split at {split}");
        }
    }

    #[test]
    fn byte_by_byte_feed() {
        let payload = b"{\"k\":1}";
        let wire = frame(payload);
        let mut assembly = InboundAssembly::new();
        let mut messages = Vec::new();
        for &b in &wire {
            assembly.feed(&[b], |payload| messages.push(payload.to_vec()));
        }
        assert_eq!(messages, vec![payload.to_vec()]);
    }

    #[test]
    fn two_frames_in_one_chunk() {
        let mut wire = frame(b"first");
        wire.extend_from_slice(&frame(b"second"));
        let mut assembly = InboundAssembly::new();
        let messages = collect(&mut assembly, &[&wire]);
        assert_eq!(messages, vec![b"first".to_vec(), b"second".to_vec()]);
    }

    #[test]
    fn frame_tail_and_next_head_in_same_chunk() {
        let first = frame(b"alpha");
        let second = frame(b"bravo");
        // Chunk boundary in the middle of the second frame's header.
        let mut joined = first.clone();
        joined.extend_from_slice(&second[..2]);
        let mut assembly = InboundAssembly::new();
        let messages = collect(&mut assembly, &[&joined, &second[2..]]);
        assert_eq!(messages, vec![b"alpha".to_vec(), b"bravo".to_vec()]);
    }

    #[test]
    fn empty_payload_is_delivered() {
        let mut assembly = InboundAssembly::new();
        let mut wire = frame(b"");
        wire.extend_from_slice(&frame(b"after"));
        let messages = collect(&mut assembly, &[&wire]);
        assert_eq!(messages, vec![Vec::new(), b"after".to_vec()]);
    }

    #[test]
    fn oversized_message_is_dropped_silently() {
        let mut assembly = InboundAssembly::with_capacity(16);
        let wire = frame(&[0xAA; 64]);
        let messages = collect(&mut assembly, &[&wire]);
        assert!(messages.is_empty());
    }

    #[test]
    fn valid_message_after_oversized_in_same_chunk_survives() {
        let mut assembly = InboundAssembly::with_capacity(16);
        let mut wire = frame(&[0xAA; 64]);
        wire.extend_from_slice(&frame(b"ok"));
        let messages = collect(&mut assembly, &[&wire]);
        assert_eq!(messages, vec![b"ok".to_vec()]);
    }

    #[test]
    fn oversized_spanning_chunks_then_valid() {
        let mut assembly = InboundAssembly::with_capacity(16);
        let big = frame(&[0x55; 40]);
        let good = frame(b"later");
        let mut tail = big[30..].to_vec();
        tail.extend_from_slice(&good);
        let messages = collect(&mut assembly, &[&big[..30], &tail]);
        assert_eq!(messages, vec![b"later".to_vec()]);
    }

    #[test]
    fn message_filling_buffer_exactly_is_delivered() {
        let mut assembly = InboundAssembly::with_capacity(16);
        let payload = [0x42u8; 12]; // 4 header + 12 body == capacity
        let wire = frame(&payload);
        let messages = collect(&mut assembly, &[&wire]);
        assert_eq!(messages, vec![payload.to_vec()]);
    }

    #[test]
    fn message_one_byte_over_capacity_is_dropped() {
        let mut assembly = InboundAssembly::with_capacity(16);
        let mut wire = frame(&[0x42u8; 13]);
        wire.extend_from_slice(&frame(b"next"));
        let messages = collect(&mut assembly, &[&wire]);
        assert_eq!(messages, vec![b"next".to_vec()]);
    }

    #[test]
    fn split_points_across_oversized_recovery() {
        let big = frame(&[0x77; 32]);
        let good = frame(b"x");
        let mut wire = big.clone();
        wire.extend_from_slice(&good);
        for split in 1..wire.len() {
            let mut assembly = InboundAssembly::with_capacity(16);
            let messages = collect(&mut assembly, &[&wire[..split], &wire[split..]]);
            assert_eq!(messages, vec![b"x".to_vec()], "split at {split}");
        }
    }
}

use std::collections::VecDeque;

/// 512 samples at 16 kHz = 32 ms, the fixed analysis window the VAD model
/// consumes.
pub const WINDOW_SAMPLES: usize = 512;
pub const WINDOW_BYTES: usize = WINDOW_SAMPLES * 2;

/// Accumulates inbound bytes and slices off fixed-size windows as soon as
/// enough bytes are available. Never drops a byte: anything shorter than one
/// window persists across calls.
#[derive(Default)]
pub struct Framer {
    buffer: VecDeque<u8>,
}

impl Framer {
    pub fn new() -> Self {
        Self { buffer: VecDeque::new() }
    }

    /// Appends `bytes` and returns every complete window that can now be
    /// extracted, in arrival order. Leftover tail bytes remain buffered.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Vec<i16>> {
        self.buffer.extend(bytes);

        let mut windows = Vec::new();
        while self.buffer.len() >= WINDOW_BYTES {
            let samples = (0..WINDOW_SAMPLES)
                .map(|_| {
                    let lo = self.buffer.pop_front().unwrap();
                    let hi = self.buffer.pop_front().unwrap();
                    i16::from_le_bytes([lo, hi])
                })
                .collect();
            windows.push(samples);
        }
        windows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn silence_bytes(samples: usize) -> Vec<u8> {
        vec![0u8; samples * 2]
    }

    #[test]
    fn tail_bytes_persist_across_calls() {
        let mut framer = Framer::new();
        assert!(framer.push(&silence_bytes(100)).is_empty());
        let windows = framer.push(&silence_bytes(WINDOW_SAMPLES - 100));
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].len(), WINDOW_SAMPLES);
    }

    #[test]
    fn framing_is_associative_over_arbitrary_chunking() {
        // Same total bytes split into one chunk vs many small chunks must
        // yield the same sequence of windows.
        let total_samples = WINDOW_SAMPLES * 3 + 17;
        let bytes: Vec<u8> = (0..total_samples * 2).map(|i| (i % 251) as u8).collect();

        let mut whole = Framer::new();
        let whole_windows = whole.push(&bytes);

        let mut piecemeal = Framer::new();
        let mut piecemeal_windows = Vec::new();
        for chunk in bytes.chunks(7) {
            piecemeal_windows.extend(piecemeal.push(chunk));
        }

        assert_eq!(whole_windows, piecemeal_windows);
    }

    proptest::proptest! {
        #[test]
        fn prop_framing_is_associative(
            bytes in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..4096),
            split_sizes in proptest::collection::vec(1usize..37, 1..64),
        ) {
            let mut whole = Framer::new();
            let whole_windows = whole.push(&bytes);

            let mut piecemeal = Framer::new();
            let mut piecemeal_windows = Vec::new();
            let mut pos = 0;
            let mut split_idx = 0;
            while pos < bytes.len() {
                let take = split_sizes[split_idx % split_sizes.len()].min(bytes.len() - pos);
                piecemeal_windows.extend(piecemeal.push(&bytes[pos..pos + take]));
                pos += take;
                split_idx += 1;
            }

            proptest::prop_assert_eq!(whole_windows, piecemeal_windows);
        }
    }
}

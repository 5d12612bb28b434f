//! Events: emitted audio→control, carrying phase reports and buffer-read
//! responses (spec §3, §4.D).

/// A message pushed onto the outbound (audio→control) channel.
#[derive(Debug, Clone)]
pub enum Event {
    /// A quantised phase report for `voice` (0-based), in seconds.
    Phase { voice: usize, position_s: f32 },
    /// The response to a `BufferRead` command: an owned copy of
    /// `[start_sample, start_sample + samples.len())` from `buffer`.
    BufferData { buffer: usize, start_sample: usize, samples: Vec<f32> },
}

//! The sample engine: owns the two PCM buffers and the six voices,
//! processes a block of frames per audio callback, drains the command
//! queue, and emits phase/buffer-data events (spec §4.C).

use crate::buffer::{seconds_to_samples, Buffers, MAX_DURATION_S, SAMPLE_RATE};
use crate::channel::{channel_pair, AudioEndpoint, ControlEndpoint, DEFAULT_COMMAND_CAPACITY, DEFAULT_EVENT_CAPACITY};
use crate::command::Command;
use crate::event::Event;
use crate::voice::{Voice, NUM_VOICES};

/// Construction-time configuration, matching §4.C's ambient addition: tests
/// build a much smaller arena than the full ~350 s buffers production code
/// uses.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Length of each of the two PCM buffers, in samples.
    pub buffer_len: usize,
    pub command_capacity: usize,
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            buffer_len: (MAX_DURATION_S * SAMPLE_RATE as f32) as usize,
            command_capacity: DEFAULT_COMMAND_CAPACITY,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl EngineConfig {
    /// A small configuration suitable for unit and integration tests: one
    /// second of buffer instead of the full ~67 MB arena.
    pub fn for_tests() -> Self {
        Self { buffer_len: SAMPLE_RATE as usize, ..Self::default() }
    }
}

/// Owns the buffers and the six voices; the sole mutator of either during
/// `process`. Must not allocate, lock, or perform blocking I/O from
/// `process` (spec §4.C, §5).
pub struct Engine {
    buffers: Buffers,
    voices: [Voice; NUM_VOICES],
    endpoint: AudioEndpoint,
    phase_poll_enabled: bool,
}

impl Engine {
    /// Builds an engine plus its control-side handle (command sender, event
    /// receiver), per the config's capacities.
    pub fn new(config: &EngineConfig) -> (Self, ControlEndpoint) {
        let (control, audio) = channel_pair(config.command_capacity, config.event_capacity);

        let voices = std::array::from_fn(Voice::new);

        let engine = Self {
            buffers: Buffers::new(config.buffer_len),
            voices,
            endpoint: audio,
            phase_poll_enabled: false,
        };

        (engine, control)
    }

    /// The real-time entry point. Contract: clear outputs, drain pending
    /// commands in arrival order, run the voice kernel for each enabled
    /// voice over the block, and emit events as they're produced. Must not
    /// allocate, lock, or perform blocking I/O.
    pub fn process(&mut self, input: &[f32], output_l: &mut [f32], output_r: &mut [f32]) {
        debug_assert_eq!(input.len(), output_l.len());
        debug_assert_eq!(input.len(), output_r.len());

        output_l.fill(0.0);
        output_r.fill(0.0);

        self.drain_commands();

        let endpoint = &self.endpoint;
        let poll_enabled = self.phase_poll_enabled;

        for voice in &mut self.voices {
            if !voice.enabled {
                continue;
            }

            let buf = self.buffers.get_mut(voice.buffer_id);
            let voice_index = voice.index();

            for i in 0..input.len() {
                let (left, right) = voice.process_frame(buf, input[i], poll_enabled, |position_s| {
                    // Phase events are allowed to drop silently on overflow
                    // (spec §5); the next quantum supersedes a missed one.
                    let _ = endpoint.events.try_send(Event::Phase { voice: voice_index, position_s });
                });
                output_l[i] += left;
                output_r[i] += right;
            }
        }
    }

    fn drain_commands(&mut self) {
        while let Ok(command) = self.endpoint.commands.try_recv() {
            self.dispatch(command);
        }
    }

    fn dispatch(&mut self, command: Command) {
        match command {
            Command::Enable { voice, on } => self.with_voice(voice, |v| v.enabled = on),
            Command::Play { voice, on } => self.with_voice(voice, |v| v.playing = on),
            Command::Rec { voice, on } => self.with_voice(voice, |v| v.recording = on),
            Command::BufferSelect { voice, buffer } => self.with_voice(voice, |v| v.buffer_id = buffer),
            Command::Rate { voice, rate } => self.with_voice(voice, |v| v.rate = rate),
            Command::Level { voice, level } => self.with_voice(voice, |v| {
                v.level_target = level;
                if v.level_slew_s <= 0.0 {
                    v.level = level;
                }
            }),
            Command::LevelSlewTime { voice, seconds } => {
                self.with_voice(voice, |v| v.level_slew_s = seconds);
            }
            Command::Pan { voice, pan } => self.with_voice(voice, |v| v.pan = pan),
            Command::Position { voice, position_s } => {
                self.with_voice(voice, |v| v.phase = position_s * f64::from(SAMPLE_RATE));
            }
            Command::Loop { voice, on } => self.with_voice(voice, |v| v.loop_on = on),
            Command::LoopStart { voice, seconds } => self.with_voice(voice, |v| v.loop_start_s = seconds),
            Command::LoopEnd { voice, seconds } => self.with_voice(voice, |v| v.loop_end_s = seconds),
            Command::FadeTime { voice, seconds } => self.with_voice(voice, |v| v.fade_time_s = seconds),
            Command::RecLevel { voice, level } => self.with_voice(voice, |v| v.rec_level = level),
            Command::PreLevel { voice, level } => self.with_voice(voice, |v| v.pre_level = level),
            Command::PhaseQuant { voice, seconds } => {
                self.with_voice(voice, |v| v.phase_quant_s = seconds);
            }

            Command::PollStartPhase => self.phase_poll_enabled = true,
            Command::PollStopPhase => self.phase_poll_enabled = false,

            Command::BufferClear => self.buffers.clear_all(),
            Command::BufferClearChannel { buffer } => self.buffers.clear_channel(buffer),
            Command::BufferClearRegion { start_s, dur_s } => self.buffers.clear_region(start_s, dur_s),
            Command::BufferLoad { buffer, start_s, data } => {
                if let Some(buf) = self.buffer_mut(buffer) {
                    buf.load(seconds_to_samples(start_s), &data);
                }
            }
            Command::BufferRead { buffer, start_s, dur_s } => self.handle_buffer_read(buffer, start_s, dur_s),

            Command::Reset => self.reset(),
        }
    }

    fn handle_buffer_read(&mut self, buffer: usize, start_s: f64, dur_s: f64) {
        let Some(buf) = self.buffers_get(buffer) else { return };
        let start_sample = seconds_to_samples(start_s);
        let samples = buf.read(start_sample, seconds_to_samples(dur_s));

        // Best-effort: the control side is expected to have checked event
        // queue headroom before submitting `BufferRead` (see `api::Api`);
        // if it still doesn't fit, the read is silently dropped rather than
        // panicking or blocking the audio thread.
        let _ = self.endpoint.events.try_send(Event::BufferData { buffer, start_sample, samples });
    }

    fn buffers_get(&self, buffer: usize) -> Option<&crate::buffer::Buffer> {
        if buffer < crate::buffer::NUM_BUFFERS {
            Some(self.buffers.get(buffer))
        } else {
            None
        }
    }

    fn buffer_mut(&mut self, buffer: usize) -> Option<&mut crate::buffer::Buffer> {
        if buffer < crate::buffer::NUM_BUFFERS {
            Some(self.buffers.get_mut(buffer))
        } else {
            None
        }
    }

    fn with_voice(&mut self, voice: usize, f: impl FnOnce(&mut Voice)) {
        if let Some(v) = self.voices.get_mut(voice) {
            f(v);
        }
    }

    /// Re-initialises all voice state to documented defaults and zeros both
    /// buffers (spec §4.C).
    fn reset(&mut self) {
        for voice in &mut self.voices {
            voice.reset_to_defaults();
        }
        self.buffers.clear_all();
        self.phase_poll_enabled = false;
    }
}

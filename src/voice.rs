//! Per-voice state and the per-frame kernel that produces one frame of
//! stereo output and optionally writes one frame of recording (spec §4.B).

use std::f32::consts::FRAC_PI_2;

use crate::buffer::{Buffer, SAMPLE_RATE};

/// Fixed voice count. Voices are created at engine construction and never
/// destroyed (§3 lifecycle).
pub const NUM_VOICES: usize = 6;

/// A single playback/record head sharing one of the two PCM buffers.
///
/// Field groups mirror §3 exactly: topology, transport, loop, fade,
/// amplitude, pan, record, phase reporting.
#[derive(Debug, Clone)]
pub struct Voice {
    index: usize,
    sample_rate: f32,

    // Topology
    pub buffer_id: usize,
    pub enabled: bool,
    pub playing: bool,
    pub recording: bool,

    // Transport
    pub phase: f64,
    pub rate: f64,

    // Loop
    pub loop_on: bool,
    pub loop_start_s: f64,
    pub loop_end_s: f64,

    // Fade
    pub fade_time_s: f32,

    // Amplitude
    pub level: f32,
    pub level_target: f32,
    pub level_slew_s: f32,

    // Pan
    pub pan: f32,

    // Record
    pub rec_level: f32,
    pub pre_level: f32,

    // Phase reporting
    pub phase_quant_s: f32,
    phase_accum: f32,
}

impl Voice {
    /// Creates voice `index` (0-based) with documented factory defaults.
    pub fn new(index: usize) -> Self {
        let mut v = Self {
            index,
            sample_rate: SAMPLE_RATE as f32,
            buffer_id: 0,
            enabled: false,
            playing: false,
            recording: false,
            phase: 0.0,
            rate: 1.0,
            loop_on: false,
            loop_start_s: 0.0,
            loop_end_s: 0.0,
            fade_time_s: 0.01,
            level: 1.0,
            level_target: 1.0,
            level_slew_s: 0.0,
            pan: 0.0,
            rec_level: 0.0,
            pre_level: 0.0,
            phase_quant_s: 0.0,
            phase_accum: 0.0,
        };
        v.reset_to_defaults();
        v
    }

    /// Re-initialises this voice to the factory defaults enumerated in
    /// spec §4.C / §6: `buffer = 0` for voices 0–2, `1` for voices 3–5;
    /// `rate = 1`; `level = level_target = 1`; `pan = 0`; loop off,
    /// spanning the full buffer; `fade_time = 0.01`; everything else
    /// zero/false.
    pub fn reset_to_defaults(&mut self) {
        let index = self.index;
        let sample_rate = self.sample_rate;

        *self = Self {
            index,
            sample_rate,
            buffer_id: usize::from(index >= 3),
            enabled: false,
            playing: false,
            recording: false,
            phase: 0.0,
            rate: 1.0,
            loop_on: false,
            loop_start_s: 0.0,
            loop_end_s: f64::from(crate::buffer::MAX_DURATION_S),
            fade_time_s: 0.01,
            level: 1.0,
            level_target: 1.0,
            level_slew_s: 0.0,
            pan: 0.0,
            rec_level: 0.0,
            pre_level: 0.0,
            phase_quant_s: 0.0,
            phase_accum: 0.0,
        };
    }

    #[inline]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Processes one frame against `buf`, writing at most one recorded
    /// sample into it. `input` is this frame's input sample; `poll_enabled`
    /// is the engine-wide phase-polling gate (§9 open question 3: reporting
    /// is gated globally but quantised per voice).
    ///
    /// `on_phase_event` is invoked (possibly more than once, in the rare
    /// case of a very small quantum relative to `rate`) with the reported
    /// position in seconds.
    ///
    /// Returns `(left, right)`, the voice's contribution to this frame's
    /// stereo output. Callers accumulate additively across voices.
    pub fn process_frame(
        &mut self,
        buf: &mut Buffer,
        input: f32,
        poll_enabled: bool,
        mut on_phase_event: impl FnMut(f32),
    ) -> (f32, f32) {
        self.apply_level_slew();

        if !self.playing {
            return (0.0, 0.0);
        }

        let sample = self.read_interpolated(buf);
        let fade_gain = self.fade_gain();
        let (gain_l, gain_r) = self.pan_gains();

        let out = sample * self.level * fade_gain;
        let left = out * gain_l;
        let right = out * gain_r;

        if self.recording {
            self.write_record(buf, input);
        }

        self.phase += self.rate;
        self.apply_boundary(buf.len());
        self.report_phase(poll_enabled, &mut on_phase_event);

        (left, right)
    }

    /// Step 1: advance `level` toward `level_target` linearly over
    /// `level_slew_s`. A zero slew time snaps instantly; the kernel
    /// tolerates `level == level_target` as a no-op either way.
    fn apply_level_slew(&mut self) {
        if (self.level - self.level_target).abs() <= f32::EPSILON {
            self.level = self.level_target;
            return;
        }

        if self.level_slew_s <= 0.0 {
            self.level = self.level_target;
            return;
        }

        let step = 1.0 / (self.level_slew_s * self.sample_rate);
        if self.level < self.level_target {
            self.level = (self.level + step).min(self.level_target);
        } else {
            self.level = (self.level - step).max(self.level_target);
        }
    }

    /// Step 3: linear-interpolated read at the current fractional phase.
    fn read_interpolated(&self, buf: &Buffer) -> f32 {
        let p = self.phase;
        let i0 = p.floor();
        let frac = (p - i0) as f32;
        let i0 = i0 as isize;
        let len = buf.len() as isize;

        if i0 >= 0 && i0 + 1 < len {
            buf.get(i0) * (1.0 - frac) + buf.get(i0 + 1) * frac
        } else if i0 >= 0 && i0 < len {
            buf.get(i0)
        } else {
            0.0
        }
    }

    /// Step 4: crossfade gain near loop boundaries.
    fn fade_gain(&self) -> f32 {
        let loop_len = self.loop_end_s - self.loop_start_s;
        if !self.loop_on || self.fade_time_s <= 0.0 || loop_len <= 0.0 {
            return 1.0;
        }

        let fade_samples = f64::from(self.fade_time_s) * f64::from(SAMPLE_RATE);
        let loop_start_samples = self.loop_start_s * f64::from(SAMPLE_RATE);
        let loop_end_samples = self.loop_end_s * f64::from(SAMPLE_RATE);

        let d_start = self.phase - loop_start_samples;
        let d_end = loop_end_samples - self.phase;

        if d_start >= 0.0 && d_start < fade_samples {
            (d_start / fade_samples) as f32
        } else if d_end >= 0.0 && d_end < fade_samples {
            (d_end / fade_samples) as f32
        } else {
            1.0
        }
    }

    /// Step 5: equal-power pan gains from `pan ∈ [-1, 1]`.
    fn pan_gains(&self) -> (f32, f32) {
        let pan_norm = (self.pan.clamp(-1.0, 1.0) + 1.0) * 0.5;
        let (gain_r, gain_l) = (pan_norm * FRAC_PI_2).sin_cos();
        (gain_l, gain_r)
    }

    /// Step 7: mixes `input` into the buffer at the (pre-advance) phase.
    fn write_record(&self, buf: &mut Buffer, input: f32) {
        let ri = self.phase.floor() as isize;
        if ri >= 0 && (ri as usize) < buf.len() {
            let prev = buf.get(ri);
            buf.set(ri, self.rec_level * input + self.pre_level * prev);
        }
    }

    /// Step 9: single-step loop wrap or one-shot stop.
    fn apply_boundary(&mut self, buf_len: usize) {
        if self.loop_on {
            let loop_start_samples = self.loop_start_s * f64::from(SAMPLE_RATE);
            let loop_end_samples = self.loop_end_s * f64::from(SAMPLE_RATE);

            if self.rate > 0.0 && self.phase >= loop_end_samples {
                self.phase = loop_start_samples + (self.phase - loop_end_samples);
            } else if self.rate < 0.0 && self.phase < loop_start_samples {
                self.phase = loop_end_samples - (loop_start_samples - self.phase);
            }
        } else if self.phase >= buf_len as f64 || self.phase < 0.0 {
            self.playing = false;
        }
    }

    /// Step 10: quantised phase reporting. `phase_quant_s == 0.0` disables
    /// reporting for this voice regardless of the engine-wide gate.
    fn report_phase(&mut self, poll_enabled: bool, on_phase_event: &mut impl FnMut(f32)) {
        if !poll_enabled || self.phase_quant_s <= 0.0 {
            return;
        }

        self.phase_accum += self.rate.abs() as f32;
        let quantum = self.phase_quant_s * self.sample_rate;

        while self.phase_accum >= quantum {
            self.phase_accum -= quantum;
            on_phase_event((self.phase / f64::from(self.sample_rate)) as f32);
        }
    }
}

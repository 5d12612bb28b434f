//! The lock-free command/event channel pair connecting the control zone to
//! the audio zone (spec §4.D).
//!
//! Both directions are single-producer/single-consumer `crossbeam_channel`
//! queues, the same channel crate and non-blocking `try_recv` discipline the
//! teacher crate already used for its control→audio note-event queue (see
//! `Audio::note_receiver` in the teacher's `audio/mod.rs`, drained with
//! `try_recv` inside the render callback). The audio side only ever calls
//! `try_recv`/`try_send`; it must never block.

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::command::Command;
use crate::event::Event;

/// Default command queue capacity. Overflow here is a programming error on
/// the control side (spec §5 backpressure); callers should treat a full
/// queue as fatal rather than silently dropping a command.
pub const DEFAULT_COMMAND_CAPACITY: usize = 256;

/// Default event queue capacity. `Phase` events may be dropped on overflow
/// (the oldest is redundant with the next quantum); `BufferData` never is —
/// a refused `buffer_read` surfaces as `EngineError::Capacity` instead.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// The control-side handle to a command/event channel pair.
#[derive(Debug, Clone)]
pub struct ControlEndpoint {
    pub commands: Sender<Command>,
    pub events: Receiver<Event>,
}

/// The audio-side handle to a command/event channel pair.
#[derive(Debug)]
pub struct AudioEndpoint {
    pub commands: Receiver<Command>,
    pub events: Sender<Event>,
}

/// Builds a connected command/event channel pair at the given capacities.
pub fn channel_pair(
    command_capacity: usize,
    event_capacity: usize,
) -> (ControlEndpoint, AudioEndpoint) {
    let (cmd_tx, cmd_rx) = bounded(command_capacity);
    let (evt_tx, evt_rx) = bounded(event_capacity);

    (
        ControlEndpoint { commands: cmd_tx, events: evt_rx },
        AudioEndpoint { commands: cmd_rx, events: evt_tx },
    )
}

//! Common re-exports for consumers of this crate.

pub use crate::api::Api;
pub use crate::buffer::{seconds_to_samples, Buffer, Buffers, MAX_DURATION_S, NUM_BUFFERS, SAMPLE_RATE};
pub use crate::channel::{channel_pair, AudioEndpoint, ControlEndpoint};
pub use crate::clock::{TaskContext, TaskId, TempoClock};
pub use crate::command::Command;
pub use crate::engine::{Engine, EngineConfig};
pub use crate::error::{ApiError, ApiResult, ClockError, ClockResult, EngineError, EngineResult};
pub use crate::event::Event;
pub use crate::voice::{Voice, NUM_VOICES};

pub use parking_lot::Mutex;

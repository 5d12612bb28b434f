//! Error types for the engine, the public façade, and the tempo clock.

use thiserror::Error;

/// Errors surfaced by the sample engine's command/event path.
///
/// These never originate from inside [`crate::engine::Engine::process`] —
/// the audio thread clamps to a safe value instead of failing (§7 of the
/// design doc). They surface from the control-thread side of a command
/// submission.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A `buffer_read` could not be posted because the event queue had no
    /// free slot. Unlike `Phase` events, `BufferData` is never dropped
    /// silently.
    #[error("event queue is full, no slot available for buffer read")]
    Capacity,

    /// The command queue's receiver was dropped (engine no longer running).
    #[error("engine is no longer reachable")]
    Disconnected,
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced by the public control façade (§6/§7).
#[derive(Error, Debug)]
pub enum ApiError {
    /// A voice index, buffer index, or numeric argument was outside its
    /// documented range. The call is rejected before any command is
    /// enqueued.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The façade was used before an engine was attached, or after it was
    /// torn down.
    #[error("engine not ready")]
    NotReady,

    #[error(transparent)]
    Engine(#[from] EngineError),
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Errors surfaced by the tempo clock.
#[derive(Error, Debug)]
pub enum ClockError {
    /// The sentinel a suspended task observes when [`cancel`] wakes it.
    /// Task runners recognise this variant and treat it as clean
    /// termination rather than a logged failure.
    ///
    /// [`cancel`]: crate::clock::TempoClock::cancel
    #[error("task cancelled")]
    Cancelled,

    /// A tempo, beat, or duration argument was outside its documented
    /// range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

pub type ClockResult<T> = Result<T, ClockError>;

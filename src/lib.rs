//! A real-time sample-playback/recording engine: six voices sharing two
//! mono PCM buffers, driven by a lock-free command/event channel pair, plus
//! a tempo-synced cooperative clock for scheduling control-thread tasks.
//!
//! The crate is split along the same audio/control boundary the engine
//! itself enforces:
//!
//! - [`buffer`], [`voice`], [`command`], [`event`], [`channel`], [`engine`]
//!   make up the real-time audio zone and the message types that cross into
//!   it. [`engine::Engine::process`] is the only function on this side of
//!   the boundary; it must never allocate, lock, or block.
//! - [`api`] and [`clock`] make up the control zone: the public façade and
//!   the tempo clock's cooperative task scheduler.
//! - [`error`] holds the `thiserror` error enums returned by the control
//!   zone's fallible operations.

pub mod api;
pub mod buffer;
pub mod channel;
pub mod clock;
pub mod command;
pub mod engine;
pub mod error;
pub mod event;
pub mod prelude;
pub mod voice;

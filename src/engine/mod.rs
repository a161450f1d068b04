//! The execution engine and its control plane.

pub mod audio_engine;
pub mod buffer_pool;
pub mod channels;
pub mod commands;

pub use audio_engine::Engine;
pub use buffer_pool::BufferPool;
pub use channels::{command_channel, command_channel_default, CommandReceiver, CommandSender};
pub use commands::EngineCommand;

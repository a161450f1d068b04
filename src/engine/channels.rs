//! Lock-free command transport between a controlling thread and the engine.
//!
//! A single rtrb ring buffer carries [`EngineCommand`]s one way. The engine
//! drains the consumer between rendered blocks, so the producer side can
//! mutate the graph without a lock anywhere near the render path.

use rtrb::{Consumer, Producer, RingBuffer};

use super::commands::EngineCommand;

/// Default capacity of the command queue.
pub const DEFAULT_COMMAND_CAPACITY: usize = 1024;

/// Creates a connected sender/receiver pair.
pub fn command_channel(capacity: usize) -> (CommandSender, CommandReceiver) {
    let (tx, rx) = RingBuffer::new(capacity);
    (CommandSender { tx }, CommandReceiver { rx })
}

/// Creates a pair with the default capacity.
pub fn command_channel_default() -> (CommandSender, CommandReceiver) {
    command_channel(DEFAULT_COMMAND_CAPACITY)
}

/// Control-plane side of the queue.
pub struct CommandSender {
    tx: Producer<EngineCommand>,
}

impl CommandSender {
    /// Queues a command. Returns it back if the buffer is full; never
    /// blocks.
    pub fn send(&mut self, command: EngineCommand) -> Result<(), EngineCommand> {
        self.tx
            .push(command)
            .map_err(|rtrb::PushError::Full(command)| command)
    }

    /// Queues a command, dropping it silently when the buffer is full.
    pub fn send_lossy(&mut self, command: EngineCommand) {
        let _ = self.tx.push(command);
    }

    /// How many commands can still be queued.
    pub fn slots_available(&self) -> usize {
        self.tx.slots()
    }

    /// Returns true if the queue is full.
    pub fn is_full(&self) -> bool {
        self.tx.is_full()
    }
}

/// Engine side of the queue. Non-blocking and allocation-free.
pub struct CommandReceiver {
    rx: Consumer<EngineCommand>,
}

impl CommandReceiver {
    /// Takes the next pending command, if any.
    pub fn recv(&mut self) -> Option<EngineCommand> {
        self.rx.pop().ok()
    }

    /// Number of commands waiting.
    pub fn pending(&self) -> usize {
        self.rx.slots()
    }
}

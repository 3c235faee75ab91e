//! Connection and server commands.

use redstone_core::Result;
use redstone_storage::{Backend, Command};

use super::Redstone;
use crate::convert;

impl<B: Backend> Redstone<B> {
    // =========================================================================
    // Server Operations (4)
    // =========================================================================

    /// Check the connection. Returns `"PONG"`.
    pub fn ping(&self) -> Result<String> {
        convert::status("PING", self.call(Command::Ping { message: None })?)
    }

    /// Round-trip `message` through the store.
    pub fn echo(&self, message: impl AsRef<[u8]>) -> Result<Vec<u8>> {
        let cmd = Command::Echo {
            message: message.as_ref().to_vec(),
        };
        convert::bulk("ECHO", self.call(cmd)?)
    }

    /// Number of live keys in the whole store.
    ///
    /// Not scoped to the namespace prefix.
    pub fn dbsize(&self) -> Result<i64> {
        convert::int("DBSIZE", self.call(Command::DbSize)?)
    }

    /// Remove every key in the store, including keys outside the namespace.
    pub fn flushdb(&self) -> Result<()> {
        convert::ok("FLUSHDB", self.call(Command::FlushDb)?)
    }
}

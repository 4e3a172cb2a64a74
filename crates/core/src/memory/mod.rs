//! Memory backends for the profiler.
//!
//! Every backend exposes the same byte-addressable contract over a 16-bit
//! logical address space, keeps a 64-bit access counter per underlying
//! *physical* byte, and supports snapshot/restore of its mutable state so a
//! test harness can roll the machine back between sub-cases. Counters are
//! deliberately excluded from snapshots.

pub mod banked;
pub mod mmu;
pub mod tracksector;
pub mod wrapper;

pub use banked::BankSwitchedMemory;
pub use mmu::MmuMemory;
pub use tracksector::TrackSectorMemory;
pub use wrapper::{MultiplierSink, TrapHandler, TrapMemory, TrapSink, WriteSink};

use thiserror::Error;

/// Errors raised by memory backends and write sinks.
#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("address {addr:#06X} outside the {size}-byte address space")]
    OutOfRange { addr: u16, size: usize },
    #[error("restore without a prior snapshot")]
    NoSnapshot,
    #[error("trap {code} ({id}) failed: {reason}")]
    TrapFailed {
        code: u8,
        id: String,
        reason: String,
    },
    #[error("I/O failure in write sink")]
    Io(#[from] std::io::Error),
}

/// Byte-addressable memory with per-physical-byte access counting.
///
/// `load` takes `&mut self` because counting the access is part of the
/// access itself; the counter bump and the data operation happen atomically
/// within one call in this single-threaded model.
pub trait Memory {
    /// Read the byte at `addr`, bumping the counter of the resolved
    /// physical byte.
    fn load(&mut self, addr: u16) -> Result<u8, MemoryError>;

    /// Write the byte at `addr`, bumping the counter of the resolved
    /// physical byte.
    fn store(&mut self, addr: u16, value: u8) -> Result<(), MemoryError>;

    /// Access count of the physical byte `addr` currently resolves to.
    /// Unresolvable addresses report 0.
    fn access_count(&self, addr: u16) -> u64;

    /// Capture all mutable state (bytes and bank/control registers, never
    /// counters). A later snapshot replaces the previous one.
    fn take_snapshot(&mut self);

    /// Roll back to the last snapshot. The snapshot stays valid, so a
    /// harness can restore repeatedly between sub-cases.
    fn restore_snapshot(&mut self) -> Result<(), MemoryError>;

    /// Release any held resources. Backends are plain buffers and default
    /// to a no-op; wrappers forward this to their sinks.
    fn close(&mut self) -> Result<(), MemoryError> {
        Ok(())
    }
}

impl Memory for Box<dyn Memory> {
    fn load(&mut self, addr: u16) -> Result<u8, MemoryError> {
        (**self).load(addr)
    }

    fn store(&mut self, addr: u16, value: u8) -> Result<(), MemoryError> {
        (**self).store(addr, value)
    }

    fn access_count(&self, addr: u16) -> u64 {
        (**self).access_count(addr)
    }

    fn take_snapshot(&mut self) {
        (**self).take_snapshot()
    }

    fn restore_snapshot(&mut self) -> Result<(), MemoryError> {
        (**self).restore_snapshot()
    }

    fn close(&mut self) -> Result<(), MemoryError> {
        (**self).close()
    }
}

/// Flat RAM: the logical address is the physical index.
#[derive(Debug)]
pub struct LinearMemory {
    data: Vec<u8>,
    counts: Vec<u64>,
    snapshot: Option<Vec<u8>>,
}

impl LinearMemory {
    /// Create a linear space of `size` bytes, clamped to the 64 KiB the
    /// 6502 can address.
    pub fn new(size: usize) -> Self {
        let size = size.min(0x1_0000);
        Self {
            data: vec![0; size],
            counts: vec![0; size],
            snapshot: None,
        }
    }

    fn index(&self, addr: u16) -> Result<usize, MemoryError> {
        let idx = addr as usize;
        if idx < self.data.len() {
            Ok(idx)
        } else {
            Err(MemoryError::OutOfRange {
                addr,
                size: self.data.len(),
            })
        }
    }
}

impl Default for LinearMemory {
    fn default() -> Self {
        Self::new(0x1_0000)
    }
}

impl Memory for LinearMemory {
    fn load(&mut self, addr: u16) -> Result<u8, MemoryError> {
        let idx = self.index(addr)?;
        self.counts[idx] += 1;
        Ok(self.data[idx])
    }

    fn store(&mut self, addr: u16, value: u8) -> Result<(), MemoryError> {
        let idx = self.index(addr)?;
        self.counts[idx] += 1;
        self.data[idx] = value;
        Ok(())
    }

    fn access_count(&self, addr: u16) -> u64 {
        self.counts.get(addr as usize).copied().unwrap_or(0)
    }

    fn take_snapshot(&mut self) {
        self.snapshot = Some(self.data.clone());
    }

    fn restore_snapshot(&mut self) -> Result<(), MemoryError> {
        let snap = self.snapshot.as_ref().ok_or(MemoryError::NoSnapshot)?;
        self.data.copy_from_slice(snap);
        Ok(())
    }
}

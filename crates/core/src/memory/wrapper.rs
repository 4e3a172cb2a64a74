//! Write-trap wrapper for attaching memory-mapped peripherals.
//!
//! `TrapMemory` wraps any backend and redirects stores to registered
//! addresses into a [`WriteSink`] instead of memory; the sink decides
//! where, or whether, the byte finally lands. Loads always pass straight
//! through, so read-side peripheral effects (a status register that
//! changes on read, say) cannot be modeled through this seam. That
//! limitation is part of the contract.

use std::collections::BTreeMap;

use super::{Memory, MemoryError};

/// A memory-mapped peripheral fed one byte per trapped store.
///
/// `mem` is the wrapped backend, passed in so sinks that publish results
/// or read shared state (the multiplier below) can reach it without
/// holding their own handle.
pub trait WriteSink {
    fn write(&mut self, value: u8, mem: &mut dyn Memory) -> Result<(), MemoryError>;

    /// Flush and release whatever the sink holds. Called from the
    /// wrapper's `close`, on success and failure paths alike.
    fn close(&mut self) -> Result<(), MemoryError> {
        Ok(())
    }
}

/// Script-defined logic behind a [`TrapSink`], identified by the numeric
/// code written to the trap address plus the sink's identifier string.
pub trait TrapHandler {
    fn trap(&mut self, code: u8, id: &str, mem: &mut dyn Memory) -> Result<(), MemoryError>;
}

/// Wraps a backend and intercepts stores to registered addresses.
pub struct TrapMemory<M: Memory> {
    inner: M,
    sinks: BTreeMap<u16, Box<dyn WriteSink>>,
}

impl<M: Memory> TrapMemory<M> {
    pub fn new(inner: M) -> Self {
        Self {
            inner,
            sinks: BTreeMap::new(),
        }
    }

    /// Attach `sink` at `addr`, replacing any sink already there.
    pub fn register_sink(&mut self, addr: u16, sink: Box<dyn WriteSink>) {
        self.sinks.insert(addr, sink);
    }

    pub fn inner(&self) -> &M {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut M {
        &mut self.inner
    }
}

impl<M: Memory> Memory for TrapMemory<M> {
    /// Reads never trap.
    fn load(&mut self, addr: u16) -> Result<u8, MemoryError> {
        self.inner.load(addr)
    }

    fn store(&mut self, addr: u16, value: u8) -> Result<(), MemoryError> {
        if let Some(sink) = self.sinks.get_mut(&addr) {
            sink.write(value, &mut self.inner)
        } else {
            self.inner.store(addr, value)
        }
    }

    fn access_count(&self, addr: u16) -> u64 {
        self.inner.access_count(addr)
    }

    fn take_snapshot(&mut self) {
        self.inner.take_snapshot()
    }

    fn restore_snapshot(&mut self) -> Result<(), MemoryError> {
        self.inner.restore_snapshot()
    }

    fn close(&mut self) -> Result<(), MemoryError> {
        // Close every sink even if one fails; report the first failure.
        let mut first_err = None;
        for sink in self.sinks.values_mut() {
            if let Err(e) = sink.close() {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => self.inner.close(),
        }
    }
}

/// Unsigned-multiply co-processor.
///
/// Consumes four injected bytes (two little-endian 16-bit factors) and
/// publishes their 32-bit product little-endian at a fixed output address.
pub struct MultiplierSink {
    out_addr: u16,
    operands: [u8; 4],
    pending: usize,
}

impl MultiplierSink {
    pub fn new(out_addr: u16) -> Self {
        Self {
            out_addr,
            operands: [0; 4],
            pending: 0,
        }
    }
}

impl WriteSink for MultiplierSink {
    fn write(&mut self, value: u8, mem: &mut dyn Memory) -> Result<(), MemoryError> {
        self.operands[self.pending] = value;
        self.pending += 1;
        if self.pending < 4 {
            return Ok(());
        }
        self.pending = 0;
        let a = u16::from_le_bytes([self.operands[0], self.operands[1]]);
        let b = u16::from_le_bytes([self.operands[2], self.operands[3]]);
        let product = (a as u32) * (b as u32);
        for (i, byte) in product.to_le_bytes().iter().enumerate() {
            mem.store(self.out_addr.wrapping_add(i as u16), *byte)?;
        }
        Ok(())
    }
}

/// Routes trapped bytes into script-defined logic. A handler failure is
/// fatal to the run.
pub struct TrapSink<H: TrapHandler> {
    id: String,
    handler: H,
}

impl<H: TrapHandler> TrapSink<H> {
    pub fn new(id: impl Into<String>, handler: H) -> Self {
        Self {
            id: id.into(),
            handler,
        }
    }
}

impl<H: TrapHandler> WriteSink for TrapSink<H> {
    fn write(&mut self, value: u8, mem: &mut dyn Memory) -> Result<(), MemoryError> {
        self.handler.trap(value, &self.id, mem)
    }
}

//! Hardware boundary. Everything the real MIPS CPU simulator and the
//! simulated device register bus are responsible for — state save/load,
//! TLB primitives, the timers, and the byte-addressable device bus — sits
//! behind these two traits. Nothing above this module knows or cares
//! whether it's talking to real UMPS3 privileged instructions or to
//! [`sim`]'s in-memory model.

pub mod sim;
pub mod state;

pub use state::{Cause, ExceptionContext, ProcessorState, Status};

/// A single 32-entry TLB slot as the CPU understands it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TlbEntry {
    pub entry_hi: u32,
    pub entry_lo: u32,
}

/// Privileged primitives a real build backs with UMPS3 instructions
/// (`TLBP`, `TLBWR`, `TLBWI`, `LDST`, `setTIMER`, `HALT`/`WAIT`/`PANIC`) and
/// the test harness backs with [`sim::SimCpu`].
pub trait Cpu {
    /// Loads `state` into the live CPU registers and never returns; the
    /// simulator instead records it as "resumed" for test inspection.
    fn load_state(&mut self, state: &ProcessorState);

    /// Probes the TLB for an entry matching `entry_hi`'s VPN/ASID fields.
    fn tlb_probe(&self, entry_hi: u32) -> Option<usize>;
    fn tlb_read(&self, index: usize) -> TlbEntry;
    fn tlb_write_index(&mut self, index: usize, entry: TlbEntry);
    fn tlb_write_random(&mut self, entry: TlbEntry);

    /// Programs the processor local timer with a microsecond count.
    fn set_plt(&mut self, microseconds: u32);
    /// Remaining time on the processor local timer, in microseconds.
    fn plt_remaining(&self) -> u32;
    /// Programs the interval (pseudo-clock) timer.
    fn set_interval_timer(&mut self, microseconds: u32);

    /// Halts the machine: no more processes exist to run.
    fn halt(&mut self);
    /// Enters a low-power wait with interrupts unmasked.
    fn wait(&mut self);
    /// Fatal kernel invariant violation: processes exist but none runnable.
    fn panic(&mut self, reason: &'static str);
}

/// The byte-addressable device register bus: four 32-bit words per device
/// slot (status, command, data0, data1), laid out per
/// [`crate::config::DEVICE_REG_BASE`].
pub trait DeviceBus {
    fn read_status(&self, addr: u32) -> u32;
    fn write_command(&mut self, addr: u32, command: u32);
    fn read_data0(&self, addr: u32) -> u32;
    fn write_data0(&mut self, addr: u32, value: u32);

    /// Register addresses for external device `dev` (0-7) on `line` (3-7).
    fn device_addr(line: u8, dev: u8) -> u32
    where
        Self: Sized,
    {
        crate::config::DEVICE_REG_BASE
            + crate::config::DEVICE_REG_LINE_STRIDE * (line - crate::config::LINE_DEVICE_FIRST) as u32
            + crate::config::DEVICE_REG_DEV_STRIDE * dev as u32
    }

    /// Terminal devices expose a transmit quadlet followed by a receive
    /// quadlet at the same per-device slot.
    fn terminal_transmit_addr(dev: u8) -> u32
    where
        Self: Sized,
    {
        Self::device_addr(crate::config::LINE_TERMINAL, dev)
    }

    fn terminal_receive_addr(dev: u8) -> u32
    where
        Self: Sized,
    {
        Self::device_addr(crate::config::LINE_TERMINAL, dev) + 2 * crate::config::WORD_LEN as u32
    }
}

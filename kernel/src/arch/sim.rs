//! Deterministic in-memory backend for [`super::Cpu`] and
//! [`super::DeviceBus`]. This is the only piece of the crate that would
//! need replacing with real UMPS3 privileged instructions and MMIO on
//! actual hardware; everything else talks to the traits only.

use super::{Cpu, DeviceBus, ProcessorState, TlbEntry};

const TLB_SIZE: usize = 32;
const DEVICE_SPACE: usize = 0x2000;

pub struct SimCpu {
    pub tlb: [TlbEntry; TLB_SIZE],
    pub last_loaded: Option<ProcessorState>,
    pub plt_us: u32,
    pub interval_us: u32,
    pub halted: bool,
    pub waiting: bool,
    pub panicked: Option<&'static str>,
    tlb_cursor: usize,
}

impl Default for SimCpu {
    fn default() -> Self {
        SimCpu {
            tlb: [TlbEntry::default(); TLB_SIZE],
            last_loaded: None,
            plt_us: 0,
            interval_us: 0,
            halted: false,
            waiting: false,
            panicked: None,
            tlb_cursor: 0,
        }
    }
}

impl Cpu for SimCpu {
    fn load_state(&mut self, state: &ProcessorState) {
        self.last_loaded = Some(*state);
    }

    fn tlb_probe(&self, entry_hi: u32) -> Option<usize> {
        self.tlb.iter().position(|e| e.entry_hi == entry_hi)
    }

    fn tlb_read(&self, index: usize) -> TlbEntry {
        self.tlb[index]
    }

    fn tlb_write_index(&mut self, index: usize, entry: TlbEntry) {
        self.tlb[index] = entry;
    }

    fn tlb_write_random(&mut self, entry: TlbEntry) {
        self.tlb[self.tlb_cursor] = entry;
        self.tlb_cursor = (self.tlb_cursor + 1) % TLB_SIZE;
    }

    fn set_plt(&mut self, microseconds: u32) {
        self.plt_us = microseconds;
    }

    fn plt_remaining(&self) -> u32 {
        self.plt_us
    }

    fn set_interval_timer(&mut self, microseconds: u32) {
        self.interval_us = microseconds;
    }

    fn halt(&mut self) {
        self.halted = true;
    }

    fn wait(&mut self) {
        self.waiting = true;
    }

    fn panic(&mut self, reason: &'static str) {
        self.panicked = Some(reason);
    }
}

/// One device register quadlet: status, command, data0, data1.
#[derive(Clone, Copy, Default)]
struct Regs {
    status: u32,
    data0: u32,
    data1: u32,
}

/// Address-indexed device bus. Sized generously over the device register
/// window; only the slots used by the configured lines are ever touched.
pub struct SimBus {
    regs: [Regs; DEVICE_SPACE / 16],
}

impl Default for SimBus {
    fn default() -> Self {
        SimBus { regs: [Regs::default(); DEVICE_SPACE / 16] }
    }
}

impl SimBus {
    fn slot(addr: u32) -> usize {
        let offset = addr.wrapping_sub(crate::config::DEVICE_REG_BASE);
        (offset / 16) as usize
    }

    /// Test hook: latch a status value as though a device interrupt fired.
    pub fn latch_status(&mut self, addr: u32, status: u32) {
        self.regs[Self::slot(addr)].status = status;
    }

    pub fn data0_of(&self, addr: u32) -> u32 {
        self.regs[Self::slot(addr)].data0
    }
}

impl DeviceBus for SimBus {
    fn read_status(&self, addr: u32) -> u32 {
        self.regs[Self::slot(addr)].status
    }

    fn write_command(&mut self, addr: u32, command: u32) {
        // Commands are recorded as the latched data1 word for test
        // inspection; a real bus would kick off the async device op here.
        self.regs[Self::slot(addr)].data1 = command;
    }

    fn read_data0(&self, addr: u32) -> u32 {
        self.regs[Self::slot(addr)].data0
    }

    fn write_data0(&mut self, addr: u32, value: u32) {
        self.regs[Self::slot(addr)].data0 = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tlb_write_random_cycles_through_slots() {
        let mut cpu = SimCpu::default();
        for i in 0..3 {
            cpu.tlb_write_random(TlbEntry { entry_hi: i, entry_lo: 0 });
        }
        assert_eq!(cpu.tlb[0].entry_hi, 0);
        assert_eq!(cpu.tlb[1].entry_hi, 1);
        assert_eq!(cpu.tlb[2].entry_hi, 2);
    }

    #[test]
    fn bus_round_trips_command_and_status() {
        let mut bus = SimBus::default();
        let addr = SimBus::device_addr(crate::config::LINE_DEVICE_FIRST, 0);
        bus.write_command(addr, crate::config::CMD_FLASH_READ);
        bus.latch_status(addr, crate::config::STATUS_FLASH_READY);
        assert_eq!(bus.read_status(addr), crate::config::STATUS_FLASH_READY);
    }
}

//! Per-user-process support descriptor: the original's `support_t`. Holds
//! the ASID, the two pass-up exception slots (page-fault, general), and
//! the process's private page table.

use bitflags::bitflags;

use crate::arch::{Cause, ExceptionContext, ProcessorState};
use crate::config::USER_PGTBL_SIZE;

/// A pass-up slot: page-fault exceptions use slot 0, every other
/// exception uses slot 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassUpSlot {
    PageFault = 0,
    General = 1,
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct EntryLoFlags: u32 {
        const DIRTY = 1 << 10;
        const VALID = 1 << 9;
        const GLOBAL = 1 << 8;
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PageTableEntry {
    pub entry_hi: u32,
    pub entry_lo: u32,
}

impl PageTableEntry {
    pub fn flags(self) -> EntryLoFlags {
        EntryLoFlags::from_bits_truncate(self.entry_lo & 0xFFF)
    }

    pub fn frame(self) -> u32 {
        self.entry_lo >> 12
    }

    pub fn set_frame_and_flags(&mut self, frame: u32, flags: EntryLoFlags) {
        self.entry_lo = (frame << 12) | flags.bits();
    }
}

#[derive(Clone, Copy)]
pub struct SupportDescriptor {
    pub asid: u8,
    pub exception_state: [ProcessorState; 2],
    pub exception_context: [ExceptionContext; 2],
    pub page_table: [PageTableEntry; USER_PGTBL_SIZE],
}

impl SupportDescriptor {
    pub fn new(asid: u8) -> Self {
        let mut page_table = [PageTableEntry::default(); USER_PGTBL_SIZE];
        for (vpn, pte) in page_table.iter_mut().enumerate() {
            pte.entry_hi = (vpn as u32) << 12 | asid as u32;
            // Every page starts dirty so a first write never page-faults
            // on the dirty bit; only presence (valid) gates the fault.
            pte.set_frame_and_flags(0, EntryLoFlags::DIRTY);
        }
        SupportDescriptor {
            asid,
            exception_state: [ProcessorState::default(); 2],
            exception_context: [ExceptionContext::default(); 2],
            page_table,
        }
    }

    pub fn slot(&self, slot: PassUpSlot) -> &ProcessorState {
        &self.exception_state[slot as usize]
    }

    pub fn record_exception(&mut self, slot: PassUpSlot, state: ProcessorState) {
        self.exception_state[slot as usize] = state;
    }

    pub fn context(&self, slot: PassUpSlot) -> &ExceptionContext {
        &self.exception_context[slot as usize]
    }

    pub fn cause_of(&self, slot: PassUpSlot) -> Cause {
        self.exception_state[slot as usize].cause
    }
}

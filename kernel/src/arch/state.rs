//! Saved processor state and the status/cause bit layouts. Mirrors the
//! register set an exception handler saves and restores: general-purpose
//! registers, HI/LO, the program counter, and the status/cause control
//! registers.

use bitflags::bitflags;

bitflags! {
    /// Status-register bits relevant above the `Cpu` boundary.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Status: u32 {
        /// Previous (pre-exception) user/kernel mode bit.
        const USER_PREVIOUS = 1 << 2;
        /// Current kernel-mode-on bit.
        const KERNEL_CURRENT = 1 << 1;
        /// Interrupts-enabled-previous bit.
        const IE_PREVIOUS = 1 << 2 | 1 << 1;
        /// Interrupts enabled (current).
        const IE_CURRENT = 1 << 0;
        /// Interrupt mask, all eight lines enabled.
        const IM_ALL = 0xFF << 8;
        /// Processor-local-timer-enabled bit.
        const TIMER_ENABLED = 1 << 27;
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Cause: u32 {
        const EXC_CODE_MASK = 0b11111 << 2;
    }
}

impl Cause {
    pub const SHIFT: u32 = 2;

    /// Decodes the exception code field with the standard shift and mask.
    /// (The original source's pager compared the raw cause word to a small
    /// integer in one branch; every call site here goes through this
    /// helper instead, so that mistake cannot recur.)
    pub fn exc_code(self) -> u32 {
        (self.bits() & Self::EXC_CODE_MASK.bits()) >> Self::SHIFT
    }

    pub fn from_exc_code(code: u32) -> Self {
        Cause::from_bits_truncate((code << Self::SHIFT) & Self::EXC_CODE_MASK.bits())
    }
}

/// Full saved state for one process: the original's `state_t`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProcessorState {
    pub entry_hi: u32,
    pub cause: Cause,
    pub status: Status,
    pub pc: u32,
    pub gpr: [u32; 29],
    pub hi: u32,
    pub lo: u32,
}

impl ProcessorState {
    pub const SP: usize = 28;

    pub fn advance_pc(&mut self) {
        self.pc = self.pc.wrapping_add(crate::config::WORD_LEN as u32);
    }

    /// Result register written by SEND/RECEIVE and SSI replies (`v0`).
    pub fn result_mut(&mut self) -> &mut u32 {
        &mut self.gpr[1]
    }

    pub fn result(&self) -> u32 {
        self.gpr[1]
    }
}

/// Saved execution context used by the pass-up mechanism: stack pointer,
/// status, and entry PC for the handler that will run next.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExceptionContext {
    pub stack_ptr: u32,
    pub status: Status,
    pub pc: u32,
}

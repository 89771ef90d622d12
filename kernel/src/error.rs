//! Kernel-wide error/status taxonomy. Mirrors the original ABI's small set
//! of negative result codes, but as a typed enum so handlers can match on it
//! and propagate with `?` instead of passing magic integers around
//! internally. The magic integers only reappear at the syscall/SSI-reply
//! boundary via [`KernelError::as_raw`].

use core::fmt;

use crate::config;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// SEND targeted a PCB handle that is not currently allocated.
    DestNotExist,
    /// The message pool is exhausted.
    MsgNoGood,
    /// The PCB pool is exhausted.
    NoProc,
    /// An SSI request named a service code the dispatcher does not know.
    BadService,
    /// A syscall instruction trapped from user mode.
    UserPrivInstr,
    /// Flash device reported a non-ready status after an I/O command.
    DeviceNotReady,
    /// The address book on the device bus did not match any known device.
    UnknownDevice,
    /// A page fault or TLB refill trapped for a process with no installed
    /// support descriptor.
    NoSupport,
}

impl KernelError {
    /// The value written to a process's result register, matching the
    /// original negative-sentinel ABI.
    pub const fn as_raw(self) -> i32 {
        match self {
            KernelError::DestNotExist => config::DEST_NOT_EXIST,
            KernelError::MsgNoGood => config::MSGNOGOOD,
            KernelError::NoProc => config::NOPROC,
            KernelError::BadService => config::NOPROC,
            KernelError::UserPrivInstr => config::NOPROC,
            KernelError::DeviceNotReady => config::NOPROC,
            KernelError::UnknownDevice => config::NOPROC,
            KernelError::NoSupport => config::NOPROC,
        }
    }
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            KernelError::DestNotExist => "destination process does not exist",
            KernelError::MsgNoGood => "message pool exhausted",
            KernelError::NoProc => "pcb pool exhausted",
            KernelError::BadService => "unrecognised service code",
            KernelError::UserPrivInstr => "privileged syscall attempted from user mode",
            KernelError::DeviceNotReady => "device reported not-ready after command",
            KernelError::UnknownDevice => "command register address matched no device",
            KernelError::NoSupport => "process has no support descriptor",
        };
        f.write_str(msg)
    }
}

pub type Result<T> = core::result::Result<T, KernelError>;

//! Exception dispatch: decode `cause.exc_code()` and route to the
//! interrupt handler, the kernel syscall handler, or pass-up-or-die.

pub mod interrupt;
pub mod syscall;

use crate::arch::{Cause, Cpu, DeviceBus, Status};
use crate::config::{ANYMESSAGE, EXC_INT, EXC_RI, EXC_SYS, SYS_RECEIVE, SYS_SEND};
use crate::error::KernelError;
use crate::kernel::Kernel;
use crate::process::PcbId;
use crate::support::descriptor::PassUpSlot;

/// Which pass-up slot an exception routes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassUpTarget {
    PageFault,
    General,
}

impl From<PassUpTarget> for PassUpSlot {
    fn from(t: PassUpTarget) -> Self {
        match t {
            PassUpTarget::PageFault => PassUpSlot::PageFault,
            PassUpTarget::General => PassUpSlot::General,
        }
    }
}

/// Classifies a cause code the way the original's exception table does.
pub fn classify(code: u32) -> Classification {
    match code {
        EXC_INT => Classification::Interrupt,
        1..=3 => Classification::PassUp(PassUpTarget::PageFault),
        4..=7 => Classification::PassUp(PassUpTarget::General),
        c if c == EXC_SYS => Classification::Syscall,
        9..=12 => Classification::PassUp(PassUpTarget::General),
        _ => Classification::PassUp(PassUpTarget::General),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Interrupt,
    Syscall,
    PassUp(PassUpTarget),
}

impl<C: Cpu, B: DeviceBus> Kernel<C, B> {
    /// Pass-up-or-die for `id`'s most recent exception. If `id` has a
    /// support descriptor, copies the exception state into the named slot
    /// and switches to the associated context; otherwise destroys `id`
    /// and its whole subtree.
    pub fn pass_up_or_die(&mut self, id: PcbId, target: PassUpTarget) {
        let slot: PassUpSlot = target.into();
        let state = self.pcb(id).state;
        let support = self.pcb(id).support;
        match support {
            Some(handle) => {
                let desc = self.support_mut(handle);
                desc.record_exception(slot, state);
                let ctx = *desc.context(slot);
                let p = self.pcb_mut(id);
                p.state.pc = ctx.pc;
                p.state.status = ctx.status;
                p.state.gpr[crate::arch::ProcessorState::SP] = ctx.stack_ptr;
            }
            None => self.terminate_process(id),
        }
    }

    /// Entry point the dispatcher hands a trapped exception's cause word
    /// to. Returns the classification so callers (and tests) can see what
    /// happened without re-decoding the cause register themselves.
    pub fn dispatch_exception(&mut self, id: PcbId, cause: Cause) -> Classification {
        let class = classify(cause.exc_code());
        match class {
            Classification::PassUp(target) => {
                self.pass_up_or_die(id, target);
                class
            }
            Classification::Syscall => match self.relay_kernel_syscall(id) {
                Ok(()) => class,
                Err(KernelError::UserPrivInstr) => {
                    // A SYSCALL trapped from user mode: not a kernel syscall
                    // at all, so rewrite the cause the same way the
                    // original's exception handler does and hand it to the
                    // general pass-up path rather than servicing it.
                    self.pcb_mut(id).state.cause = Cause::from_exc_code(EXC_RI);
                    self.pass_up_or_die(id, PassUpTarget::General);
                    Classification::PassUp(PassUpTarget::General)
                }
                Err(_) => unreachable!("relay_kernel_syscall only ever returns UserPrivInstr"),
            },
            Classification::Interrupt => class,
        }
    }

    /// Decodes and services SYS1 (`SEND`)/SYS2 (`RECEIVE`) out of `a0..a2`
    /// for a syscall trapped in kernel mode. Rejects the call with
    /// [`KernelError::UserPrivInstr`] without touching the selector if the
    /// trap's previous mode was user, per the kernel-mode-only gate on the
    /// two privileged syscalls.
    fn relay_kernel_syscall(&mut self, id: PcbId) -> Result<(), KernelError> {
        if self.pcb(id).state.status.contains(Status::USER_PREVIOUS) {
            return Err(KernelError::UserPrivInstr);
        }
        let state = self.pcb(id).state;
        let selector = state.gpr[3] as i32;
        let arg1 = state.gpr[4];
        let arg2 = state.gpr[5];
        match selector {
            SYS_SEND => {
                let receiver = arg1 as PcbId;
                self.send(id, receiver, arg2);
            }
            SYS_RECEIVE => {
                let filter = if arg1 == ANYMESSAGE { None } else { Some(arg1 as PcbId) };
                self.receive(id, filter);
            }
            _ => self.terminate_process(id),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::sim::{SimBus, SimCpu};
    use crate::arch::ProcessorState;
    use crate::config::USYS_SENDMSG;
    use crate::exception::syscall::ReceiveOutcome;
    use crate::process::Role;

    fn fresh() -> Kernel<SimCpu, SimBus> {
        Kernel::new(SimCpu::default(), SimBus::default())
    }

    #[test]
    fn classifies_table_correctly() {
        assert_eq!(classify(0), Classification::Interrupt);
        assert_eq!(classify(2), Classification::PassUp(PassUpTarget::PageFault));
        assert_eq!(classify(5), Classification::PassUp(PassUpTarget::General));
        assert_eq!(classify(8), Classification::Syscall);
        assert_eq!(classify(10), Classification::PassUp(PassUpTarget::General));
    }

    #[test]
    fn kernel_mode_send_trap_is_relayed() {
        let mut k = fresh();
        let a = k.spawn(None, Role::User, Default::default()).unwrap();
        let b = k.spawn(None, Role::User, Default::default()).unwrap();
        k.evict_from_queue(b);
        k.pcb_mut(b).location = crate::process::Location::BlockedOnInbox;

        let mut state = ProcessorState::default();
        state.gpr[3] = SYS_SEND as u32;
        state.gpr[4] = b as u32;
        state.gpr[5] = USYS_SENDMSG;
        k.pcb_mut(a).state = state;

        let class = k.dispatch_exception(a, Cause::from_exc_code(EXC_SYS));
        assert_eq!(class, Classification::Syscall);
        assert_eq!(k.receive(b, Some(a)), ReceiveOutcome::Completed { sender: a, payload: USYS_SENDMSG });
    }

    #[test]
    fn user_mode_syscall_trap_is_rewritten_and_passed_up() {
        let mut k = fresh();
        let id = k.spawn(None, Role::User, Default::default()).unwrap();
        let mut state = ProcessorState::default();
        state.status = Status::USER_PREVIOUS;
        k.pcb_mut(id).state = state;

        let class = k.dispatch_exception(id, Cause::from_exc_code(EXC_SYS));
        assert_eq!(class, Classification::PassUp(PassUpTarget::General));
        // No support descriptor installed: pass-up-or-die terminates it.
        assert_eq!(k.pcb(id).location, crate::process::Location::Free);
    }
}

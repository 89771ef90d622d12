//! Support-level general exception handler: the second half of the
//! pass-up-or-die mechanism. Installed in every support descriptor's
//! `General` slot, it either relays a user-level SEND/RECEIVE request
//! (the only "syscalls" a process running outside kernel mode may issue)
//! or treats the exception as fatal and tears the process down.
//!
//! Register conventions mirror the calling ABI a real SYSCALL trap would
//! leave behind: `gpr[3]` (`$a0`) carries the user syscall selector,
//! `gpr[4]` (`$a1`) the target/source process id (`PARENT` redirects to
//! the caller's parent), `gpr[5]` (`$a2`) the payload.

use crate::arch::{Cpu, DeviceBus};
use crate::config::{ANYMESSAGE, EXC_SYS, PARENT, SVC_TERMPROCESS, USYS_RECEIVEMSG, USYS_SENDMSG};
use crate::kernel::Kernel;
use crate::process::PcbId;
use crate::ssi::SsiArg;
use crate::support::descriptor::PassUpSlot;

const A0: usize = 3;
const A1: usize = 4;
const A2: usize = 5;

impl<C: Cpu, B: DeviceBus> Kernel<C, B> {
    /// Handles the `General` pass-up exception currently recorded for
    /// `id`. `ssi`/`mutex` are the two always-resident service processes
    /// this handler may need to hand off to.
    pub fn support_exception_handler(&mut self, ssi: PcbId, mutex: PcbId, id: PcbId) {
        let support = match self.pcb(id).support {
            Some(h) => h,
            None => {
                self.terminate_process(id);
                return;
            }
        };
        let cause = self.support(support).cause_of(PassUpSlot::General);

        if cause.exc_code() == EXC_SYS {
            self.relay_user_syscall(id);
        } else {
            self.support_trap(ssi, mutex, id);
        }
    }

    /// `USYS_SENDMSG`/`USYS_RECEIVEMSG`: the only two operations a process
    /// running outside kernel mode is allowed to trigger via SYSCALL. Both
    /// are relayed straight onto the ordinary kernel SEND/RECEIVE path,
    /// running as `id` itself, since this crate doesn't give the support
    /// level a separate register file to act through.
    fn relay_user_syscall(&mut self, id: PcbId) {
        let gpr = self.pcb(id).state.gpr;
        match gpr[A0] {
            USYS_SENDMSG => {
                let target = if gpr[A1] == PARENT {
                    self.pcb(id).parent.unwrap_or(id)
                } else {
                    gpr[A1] as PcbId
                };
                self.send(id, target, gpr[A2]);
            }
            USYS_RECEIVEMSG => {
                let filter = if gpr[A1] == ANYMESSAGE { None } else { Some(gpr[A1] as PcbId) };
                self.receive(id, filter);
            }
            _ => self.terminate_process(id),
        }
    }

    /// Every other General-slot exception is unrecoverable at user level:
    /// release the swap mutex if this process was mid-fault holding it,
    /// then ask the SSI to tear it down.
    fn support_trap(&mut self, ssi: PcbId, mutex: PcbId, id: PcbId) {
        if self.swap_mutex_holder == Some(id) {
            self.swap_mutex_release(mutex, id);
        }
        self.ssi_dispatch(ssi, id, SVC_TERMPROCESS, SsiArg::TermProcess { target: None });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::sim::{SimBus, SimCpu};
    use crate::arch::{Cause, ProcessorState};
    use crate::config::EXC_RI;
    use crate::process::Role;
    use crate::support::descriptor::SupportDescriptor;

    fn fresh() -> Kernel<SimCpu, SimBus> {
        Kernel::new(SimCpu::default(), SimBus::default())
    }

    #[test]
    fn sendmsg_relay_delivers_to_target() {
        let mut k = fresh();
        let ssi = k.spawn(None, Role::Ssi, Default::default()).unwrap();
        let mutex = k.spawn(None, Role::SwapMutex, Default::default()).unwrap();
        let a = k.spawn(Some(ssi), Role::User, Default::default()).unwrap();
        let b = k.spawn(Some(ssi), Role::User, Default::default()).unwrap();
        let support = k.install_support(SupportDescriptor::new(1)).unwrap();
        k.pcb_mut(a).support = Some(support);

        let mut gpr = [0u32; 29];
        gpr[A0] = USYS_SENDMSG;
        gpr[A1] = b as u32;
        gpr[A2] = 7;
        k.pcb_mut(a).state.gpr = gpr;
        k.support_mut(support).record_exception(
            PassUpSlot::General,
            ProcessorState { cause: Cause::from_exc_code(EXC_SYS), ..Default::default() },
        );

        k.support_exception_handler(ssi, mutex, a);

        assert_eq!(
            k.receive(b, Some(a)),
            crate::exception::syscall::ReceiveOutcome::Completed { sender: a, payload: 7 }
        );
    }

    #[test]
    fn unrecognised_exception_terminates_the_process() {
        let mut k = fresh();
        let ssi = k.spawn(None, Role::Ssi, Default::default()).unwrap();
        let mutex = k.spawn(None, Role::SwapMutex, Default::default()).unwrap();
        let a = k.spawn(Some(ssi), Role::User, Default::default()).unwrap();
        let support = k.install_support(SupportDescriptor::new(1)).unwrap();
        k.pcb_mut(a).support = Some(support);

        k.support_mut(support).record_exception(
            PassUpSlot::General,
            ProcessorState { cause: Cause::from_exc_code(EXC_RI), ..Default::default() },
        );

        let before = k.process_count;
        k.support_exception_handler(ssi, mutex, a);
        assert_eq!(k.process_count, before - 1);
    }
}

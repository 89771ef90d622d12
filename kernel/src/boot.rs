//! Bootstrap sequence: brings the two always-resident kernel processes —
//! the SSI and the swap-pool mutex server — into existence before any user
//! process runs, mirroring the original's `main`/`initProc` ordering.
//! Pool and queue initialization itself already happened in
//! [`Kernel::new`]; this only seeds the service processes every other
//! module depends on and arms the pseudo-clock.

use crate::arch::{Cpu, DeviceBus, ProcessorState};
use crate::config::PSECOND_US;
use crate::kernel::Kernel;
use crate::process::{PcbId, Role};
use crate::support::descriptor::SupportDescriptor;

/// Handles to the two service processes every kernel instance needs,
/// returned together so a caller can't forget to register one.
#[derive(Debug, Clone, Copy)]
pub struct ServiceProcesses {
    pub ssi: PcbId,
    pub swap_mutex: PcbId,
}

/// Handles to a user process and the SST spawned to broker its SSI
/// requests, returned together so a caller always has both: a U-proc with
/// no SST to route `GETTOD`/`TERMINATE`/printer-or-terminal writes through
/// is not something the original ever produces.
#[derive(Debug, Clone, Copy)]
pub struct UserHandles {
    pub uproc: PcbId,
    pub sst: PcbId,
}

impl<C: Cpu, B: DeviceBus> Kernel<C, B> {
    /// Spawns the SSI and swap-mutex server and arms the interval timer.
    /// Panics only if the PCB pool can't hold two processes, which would
    /// mean `N_PROC` was configured below the minimum viable size.
    pub fn boot(&mut self) -> ServiceProcesses {
        let ssi = self.spawn(None, Role::Ssi, ProcessorState::default()).expect("pool has room for the SSI at boot");
        self.ssi = Some(ssi);
        let swap_mutex =
            self.spawn(None, Role::SwapMutex, ProcessorState::default()).expect("pool has room for the swap-mutex server at boot");
        self.cpu.set_interval_timer(PSECOND_US);
        ServiceProcesses { ssi, swap_mutex }
    }

    /// Spawns the SST that brokers a user process's `GETTOD`/`TERMINATE`/
    /// printer-and-terminal requests to the SSI, then spawns the user
    /// process itself as the SST's child (not `parent`'s, conventionally
    /// the SSI's) and installs a fresh support descriptor for its ASID.
    /// The SST is the U-proc's creator exactly as in the original, so that
    /// `SST_TERMINATE` terminating the SST takes its U-proc down with it
    /// through the ordinary recursive-subtree path in
    /// [`Kernel::terminate_process`] rather than needing its own teardown
    /// logic. Returns `None` if the PCB pool or the support-descriptor pool
    /// is exhausted at any step; no partial state is left behind.
    pub fn spawn_user(&mut self, parent: PcbId, asid: u8, entry: ProcessorState) -> Option<UserHandles> {
        let support = self.install_support(SupportDescriptor::new(asid))?;
        let sst = match self.spawn(Some(parent), Role::Sst, ProcessorState::default()) {
            Some(id) => id,
            None => {
                self.free_support(support);
                return None;
            }
        };
        let uproc = match self.spawn(Some(sst), Role::User, entry) {
            Some(id) => id,
            None => {
                self.free_support(support);
                self.terminate_process(sst);
                return None;
            }
        };
        self.pcb_mut(uproc).support = Some(support);
        Some(UserHandles { uproc, sst })
    }

    /// Spawns a plain process with no support descriptor — the driver/test
    /// processes in these scenarios, and ordinary user processes that never
    /// fault, have no need of one. Exposed alongside [`Kernel::spawn_user`]
    /// rather than through the crate-private [`Kernel::spawn`] directly so
    /// host-side test harnesses never need pool internals.
    pub fn spawn_plain(&mut self, parent: Option<PcbId>, role: Role, state: ProcessorState) -> Option<PcbId> {
        self.spawn(parent, role, state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::sim::{SimBus, SimCpu};

    #[test]
    fn boot_seeds_ssi_and_swap_mutex() {
        let mut k = Kernel::new(SimCpu::default(), SimBus::default());
        let procs = k.boot();
        assert_eq!(k.ssi, Some(procs.ssi));
        assert_eq!(k.process_count, 2);
        assert_eq!(k.cpu.interval_us, PSECOND_US);
    }

    #[test]
    fn spawn_user_wires_up_a_support_descriptor() {
        let mut k = Kernel::new(SimCpu::default(), SimBus::default());
        let procs = k.boot();
        let handles = k.spawn_user(procs.ssi, 1, ProcessorState::default()).unwrap();
        let support = k.pcb(handles.uproc).support.unwrap();
        assert_eq!(k.support(support).asid, 1);
        assert_eq!(k.pcb(handles.sst).role, Role::Sst);
    }
}

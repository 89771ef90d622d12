//! Round-robin dispatch with a fixed time slice, and the three
//! termination predicates that decide what happens when the ready queue
//! runs dry: HALT, WAIT, or PANIC.

use crate::arch::Cpu;
use crate::arch::DeviceBus;
use crate::config::TIME_SLICE_US;
use crate::kernel::Kernel;
use crate::process::{Location, PcbId};

/// What the scheduler did, so tests can assert on it without inspecting
/// `cpu`/`bus` state directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
    Dispatched,
    Halted,
    Waiting,
    Panicked,
}

impl<C: Cpu, B: DeviceBus> Kernel<C, B> {
    /// Pops the ready queue and dispatches, or applies the halt/wait/panic
    /// predicate if nothing is runnable.
    pub fn schedule(&mut self) -> ScheduleOutcome {
        let next = {
            let arena = self.pcbs.arena();
            self.ready_queue.pop_front(arena, crate::process::pcb::queue_link_of)
        };

        if let Some(id) = next {
            self.pcb_mut(id).location = Location::Running;
            self.current = Some(id);
            self.cpu.set_plt(TIME_SLICE_US);
            let state = self.pcb(id).state;
            self.cpu.load_state(&state);
            return ScheduleOutcome::Dispatched;
        }

        if self.process_count == 1 {
            self.cpu.halt();
            ScheduleOutcome::Halted
        } else if self.process_count > 0 && self.waiting_count > 0 {
            self.cpu.wait();
            ScheduleOutcome::Waiting
        } else {
            self.cpu.panic("scheduler: live processes but nothing waiting");
            ScheduleOutcome::Panicked
        }
    }

    /// Marks `id` as the currently running process, evicting it from
    /// whatever queue it was linked into first. Lets a host-side harness
    /// hand a freshly spawned process straight to a syscall handler without
    /// draining the ready queue through repeated `schedule()` calls to get
    /// there, the same eviction [`Kernel::schedule`] itself does on dispatch.
    pub fn dispatch_specific(&mut self, id: PcbId) {
        self.evict_from_queue(id);
        self.pcb_mut(id).location = Location::Running;
        self.current = Some(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::sim::{SimBus, SimCpu};
    use crate::process::Role;

    fn fresh() -> Kernel<SimCpu, SimBus> {
        Kernel::new(SimCpu::default(), SimBus::default())
    }

    #[test]
    fn halts_when_only_process_remains() {
        let mut k = fresh();
        let id = k.spawn(None, Role::Ssi, Default::default()).unwrap();
        k.evict_from_queue(id);
        k.pcb_mut(id).location = Location::Running;
        k.current = Some(id);
        // only the SSI is left and it isn't ready: halt.
        assert_eq!(k.schedule(), ScheduleOutcome::Halted);
        assert!(k.cpu.halted);
    }

    #[test]
    fn panics_on_deadlock() {
        let mut k = fresh();
        let ssi = k.spawn(None, Role::Ssi, Default::default()).unwrap();
        let user = k.spawn(None, Role::User, Default::default()).unwrap();
        k.evict_from_queue(ssi);
        k.evict_from_queue(user);
        k.pcb_mut(ssi).location = Location::Running;
        assert_eq!(k.schedule(), ScheduleOutcome::Panicked);
        assert!(k.cpu.panicked.is_some());
    }

    #[test]
    fn waits_when_something_is_blocked() {
        let mut k = fresh();
        let ssi = k.spawn(None, Role::Ssi, Default::default()).unwrap();
        let blocked = k.spawn(None, Role::User, Default::default()).unwrap();
        k.evict_from_queue(ssi);
        k.pcb_mut(ssi).location = Location::Running;
        k.evict_from_queue(blocked);
        k.pcb_mut(blocked).location = Location::PseudoClock;
        k.waiting_count = 1;
        assert_eq!(k.schedule(), ScheduleOutcome::Waiting);
        assert!(k.cpu.waiting);
    }

    #[test]
    fn dispatches_ready_head() {
        let mut k = fresh();
        let id = k.spawn(None, Role::User, Default::default()).unwrap();
        assert_eq!(k.schedule(), ScheduleOutcome::Dispatched);
        assert_eq!(k.current, Some(id));
        assert_eq!(k.cpu.plt_us, TIME_SLICE_US);
    }
}

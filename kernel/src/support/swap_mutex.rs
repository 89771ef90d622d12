//! Swap-pool mutual exclusion, modeled as a single server process granting
//! admission strictly in the order requests arrive. Mutual exclusion and
//! FIFO fairness both fall out of the ordinary SEND/RECEIVE machinery —
//! the mutex server's "queue" is just its own inbox — so the only extra
//! state this module needs is which PCB currently holds the mutex (used
//! by the support-level trap handler to auto-release on a crashing
//! holder).

use crate::arch::{Cpu, DeviceBus};
use crate::exception::syscall::ReceiveOutcome;
use crate::kernel::Kernel;
use crate::process::PcbId;

impl<C: Cpu, B: DeviceBus> Kernel<C, B> {
    /// Requests the mutex on `requester`'s behalf (a plain SEND to the
    /// mutex server).
    pub fn swap_mutex_request(&mut self, mutex: PcbId, requester: PcbId) {
        self.send(requester, mutex, 0);
    }

    /// Releases the mutex `requester` currently holds.
    pub fn swap_mutex_release_msg(&mut self, mutex: PcbId, requester: PcbId) {
        self.send(requester, mutex, 0);
    }

    /// One iteration of the mutex server's own loop: if free, grants the
    /// mutex to the oldest queued requester; if held, checks whether the
    /// holder has sent the matching release, and if so immediately offers
    /// the mutex to the next FIFO waiter.
    pub fn swap_mutex_dispatch(&mut self, mutex: PcbId) {
        match self.swap_mutex_holder {
            None => {
                if let ReceiveOutcome::Completed { sender, .. } = self.receive(mutex, None) {
                    self.swap_mutex_holder = Some(sender);
                    self.send(mutex, sender, 0);
                }
            }
            Some(holder) => {
                if let ReceiveOutcome::Completed { .. } = self.receive(mutex, Some(holder)) {
                    self.swap_mutex_holder = None;
                    self.swap_mutex_dispatch(mutex);
                }
            }
        }
    }

    /// Drives a full acquire round trip for `requester` against `mutex`
    /// synchronously: request, run the server's dispatch until granted,
    /// consume the grant. Used by the pager, which never interleaves with
    /// another process mid-fault in this crate's single-threaded model.
    pub fn swap_mutex_acquire(&mut self, mutex: PcbId, requester: PcbId) {
        if self.swap_mutex_holder == Some(requester) {
            return;
        }
        self.swap_mutex_request(mutex, requester);
        self.swap_mutex_dispatch(mutex);
        self.receive(requester, Some(mutex));
    }

    pub fn swap_mutex_release(&mut self, mutex: PcbId, requester: PcbId) {
        self.swap_mutex_release_msg(mutex, requester);
        self.swap_mutex_dispatch(mutex);
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
    fn second_requester_waits_for_first_release() {
        let mut k = fresh();
        let mutex = k.spawn(None, Role::SwapMutex, Default::default()).unwrap();
        let a = k.spawn(None, Role::User, Default::default()).unwrap();
        let b = k.spawn(None, Role::User, Default::default()).unwrap();

        k.swap_mutex_acquire(mutex, a);
        assert_eq!(k.swap_mutex_holder, Some(a));

        k.swap_mutex_request(mutex, b);
        k.swap_mutex_dispatch(mutex);
        // b's request is queued behind a; holder is still a.
        assert_eq!(k.swap_mutex_holder, Some(a));

        k.swap_mutex_release(mutex, a);
        assert_eq!(k.swap_mutex_holder, Some(b));
    }
}

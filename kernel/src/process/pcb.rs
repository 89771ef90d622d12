//! Process Control Block: the kernel's per-process descriptor. Ported from
//! the original's `pcb_t` as a fixed-pool arena record addressed by a
//! stable `u16` handle instead of a pointer.

use crate::arch::ProcessorState;
use crate::util::Link;

pub type PcbId = u16;

/// Which terminal sub-queue a process is blocked on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TermBank {
    Transmit,
    Receive,
}

/// Where a PCB currently sits. Replaces an O(queues) membership scan (the
/// original's `isInList` walks every wait queue) with an O(1) tag kept in
/// sync by whoever moves the PCB.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Location {
    Free,
    Ready,
    Running,
    /// Blocked in `RECEIVE` with no matching message yet. Reachable only
    /// through some other process's SEND, not through any queue.
    BlockedOnInbox,
    Device { line: u8, dev: u8 },
    Terminal { bank: TermBank, dev: u8 },
    PseudoClock,
}

impl Location {
    /// True for the three queue kinds [`crate::scheduler`] counts in
    /// `waiting_count`.
    pub fn counts_as_waiting(self) -> bool {
        matches!(self, Location::Device { .. } | Location::Terminal { .. } | Location::PseudoClock)
    }
}

/// Distinguishes kernel-resident service processes (dispatched as pure
/// message-handler state machines, see `ssi`/`support`) from ordinary user
/// processes (driven externally through the [`crate::workload::Workload`]
/// trait). Purely a dispatch tag — every `Role` is scheduled identically.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    User,
    Ssi,
    Sst,
    SwapMutex,
}

#[derive(Clone, Copy)]
pub struct Pcb {
    /// Linkage for whichever single list currently owns this PCB: the
    /// pool's free list, the ready queue, a device/terminal/pseudo-clock
    /// queue. Never meaningful while `location` is `Running` or
    /// `BlockedOnInbox`.
    pub(crate) queue_link: Link,
    pub location: Location,

    pub parent: Option<PcbId>,
    /// Head of this PCB's children, linked through each child's
    /// `sibling_link`.
    pub(crate) children: crate::util::List,
    pub(crate) sibling_link: Link,

    pub state: ProcessorState,
    pub time_us: u32,
    /// Pending messages, linked through each message's own link field.
    pub(crate) inbox: crate::util::List,

    pub support: Option<u16>,
    pub role: Role,
    pub pid: u32,
}

impl Default for Pcb {
    fn default() -> Self {
        Pcb {
            queue_link: Link::empty(),
            location: Location::Free,
            parent: None,
            children: crate::util::List::new(),
            sibling_link: Link::empty(),
            state: ProcessorState::default(),
            time_us: 0,
            inbox: crate::util::List::new(),
            support: None,
            role: Role::User,
            pid: 0,
        }
    }
}

pub(crate) fn queue_link_of(p: &mut Pcb) -> &mut Link {
    &mut p.queue_link
}

pub(crate) fn sibling_link_of(p: &mut Pcb) -> &mut Link {
    &mut p.sibling_link
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_pcb_is_free_and_has_no_relatives() {
        let pcb = Pcb::default();
        assert_eq!(pcb.location, Location::Free);
        assert!(pcb.parent.is_none());
        assert!(pcb.children.is_empty());
        assert!(pcb.inbox.is_empty());
    }

    #[test]
    fn waiting_classification() {
        assert!(Location::PseudoClock.counts_as_waiting());
        assert!(Location::Device { line: 3, dev: 0 }.counts_as_waiting());
        assert!(!Location::Ready.counts_as_waiting());
        assert!(!Location::BlockedOnInbox.counts_as_waiting());
    }
}

//! PCB destruction and the process-tree surgery `TERMPROCESS` needs:
//! detach-from-parent, recursive descendant teardown, and queue eviction
//! driven by the O(1) `Location` tag rather than a scan over every wait
//! queue (the original's `isInList` approach).

use crate::arch::{Cpu, DeviceBus};
use crate::kernel::Kernel;
use crate::message;
use crate::process::pcb::{self, Location, TermBank};
use crate::process::PcbId;

impl<C: Cpu, B: DeviceBus> Kernel<C, B> {
    /// Evicts `id` from whichever queue its `Location` says it's on.
    /// Leaves `Running`/`BlockedOnInbox` processes untouched (no queue to
    /// evict from).
    pub(crate) fn evict_from_queue(&mut self, id: PcbId) {
        let location = self.pcb(id).location;
        match location {
            Location::Free | Location::Running | Location::BlockedOnInbox => {}
            Location::Ready => {
                let arena = self.pcbs.arena();
                self.ready_queue.remove(arena, id, pcb::queue_link_of);
            }
            Location::Device { line, dev } => {
                let arena = self.pcbs.arena();
                self.device_queues[(line - crate::config::LINE_DEVICE_FIRST) as usize][dev as usize]
                    .remove(arena, id, pcb::queue_link_of);
                self.waiting_count -= 1;
            }
            Location::Terminal { bank, dev } => {
                let bank_idx = match bank {
                    TermBank::Transmit => 0,
                    TermBank::Receive => 1,
                };
                let arena = self.pcbs.arena();
                self.terminal_queues[bank_idx][dev as usize].remove(arena, id, pcb::queue_link_of);
                self.waiting_count -= 1;
            }
            Location::PseudoClock => {
                let arena = self.pcbs.arena();
                self.pseudo_clock_queue.remove(arena, id, pcb::queue_link_of);
                self.waiting_count -= 1;
            }
        }
        self.pcb_mut(id).location = Location::Free;
    }

    /// Unlinks `id` from its parent's child list. Root processes (no
    /// parent) are left as-is.
    fn detach_from_parent(&mut self, id: PcbId) {
        if let Some(parent) = self.pcb(id).parent {
            let arena = self.pcbs.arena();
            let mut children = arena[parent as usize].children;
            children.remove(arena, id, pcb::sibling_link_of);
            arena[parent as usize].children = children;
        }
        self.pcb_mut(id).parent = None;
    }

    /// Drains every message record on `id`'s inbox back to the message
    /// free pool. Run eagerly at destruction time rather than left for
    /// lazy recycling on next reuse of the PCB slot (see the design notes
    /// on this choice): without it a freed-then-reused PCB could briefly
    /// appear to have stale mail.
    fn drain_inbox(&mut self, id: PcbId) {
        let mut inbox = self.pcb(id).inbox;
        loop {
            let popped = {
                let arena = self.msgs.arena();
                inbox.pop_front(arena, message::link_of)
            };
            match popped {
                Some(m) => self.msgs.dealloc(m, message::link_of),
                None => break,
            }
        }
        self.pcb_mut(id).inbox = inbox;
    }

    /// Destroys exactly `id`: evicts from its queue, frees its inbox
    /// messages, returns the PCB to the free pool, and decrements
    /// `process_count`. Does not touch children — callers must have
    /// already reparented or destroyed them.
    fn destroy_one(&mut self, id: PcbId) {
        self.evict_from_queue(id);
        self.detach_from_parent(id);
        self.drain_inbox(id);

        self.pcbs.dealloc(id, pcb::queue_link_of);
        self.process_count -= 1;
        if self.current == Some(id) {
            self.current = None;
        }
    }

    /// `TERMPROCESS`: destroys `id` and its entire descendant subtree,
    /// depth first, matching the original's "terminate progeny before
    /// self" ordering.
    pub fn terminate_process(&mut self, id: PcbId) {
        loop {
            let child = self.pcb(id).children.front();
            match child {
                Some(c) => self.terminate_process(c),
                None => break,
            }
        }
        self.destroy_one(id);
    }
}

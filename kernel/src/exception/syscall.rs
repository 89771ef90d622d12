//! The two kernel syscalls, SEND and RECEIVE. Everything else (user
//! syscalls, SSI service codes) is built on top of these.

use crate::arch::{Cpu, DeviceBus};
use crate::config::{ANYMESSAGE, DEST_NOT_EXIST, MSGNOGOOD};
use crate::kernel::Kernel;
use crate::message;
use crate::process::{pcb, Location, PcbId};

/// Outcome of a RECEIVE attempt, so callers know whether to keep running
/// the caller or hand control back to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveOutcome {
    Completed { sender: PcbId, payload: u32 },
    Blocked,
}

impl<C: Cpu, B: DeviceBus> Kernel<C, B> {
    /// `SEND(receiver, payload)` issued by `sender`. Never blocks the
    /// sender. Writes the raw result code into the sender's result
    /// register and advances its PC, matching the ABI a real SYSCALL trap
    /// would leave behind.
    pub fn send(&mut self, sender: PcbId, receiver: PcbId, payload: u32) {
        let raw = if self.pcb(receiver).location == Location::Free {
            DEST_NOT_EXIST
        } else {
            match self.msgs.alloc(message::link_of) {
                None => MSGNOGOOD,
                Some(mid) => {
                    *self.msgs.get_mut(mid) = message::Message { sender: Some(sender), payload, ..Default::default() };
                    let was_blocked = self.pcb(receiver).location == Location::BlockedOnInbox;
                    // Inbox links live in the message arena, not the PCB
                    // arena: thread the push through `self.msgs`.
                    let mut inbox = self.pcb(receiver).inbox;
                    {
                        let msg_arena = self.msgs.arena();
                        inbox.push_back(msg_arena, mid, message::link_of);
                    }
                    self.pcb_mut(receiver).inbox = inbox;

                    if was_blocked {
                        self.pcb_mut(receiver).location = Location::Ready;
                        let arena = self.pcbs.arena();
                        self.ready_queue.push_back(arena, receiver, pcb::queue_link_of);
                    }
                    0
                }
            }
        };
        let s = self.pcb_mut(sender);
        *s.state.result_mut() = raw as u32;
        s.state.advance_pc();
    }

    /// `RECEIVE(filter)` issued by `receiver`; `filter = None` means
    /// `ANYMESSAGE`. On a match, completes immediately (advances PC). On
    /// no match, blocks: PC is left untouched so a retry after being
    /// woken re-enters this same call.
    pub fn receive(&mut self, receiver: PcbId, filter: Option<PcbId>) -> ReceiveOutcome {
        let mut inbox = self.pcb(receiver).inbox;
        let found = {
            let msg_arena = self.msgs.arena();
            find_and_unlink(&mut inbox, msg_arena, filter)
        };
        self.pcb_mut(receiver).inbox = inbox;

        match found {
            Some(mid) => {
                let msg = *self.msgs.get(mid);
                self.msgs.dealloc(mid, message::link_of);
                let sender = msg.sender.expect("live message always has a sender");
                let r = self.pcb_mut(receiver);
                *r.state.result_mut() = sender as u32;
                r.state.advance_pc();
                ReceiveOutcome::Completed { sender, payload: msg.payload }
            }
            None => {
                let elapsed = crate::config::TIME_SLICE_US.saturating_sub(self.cpu.plt_remaining());
                let r = self.pcb_mut(receiver);
                r.time_us += elapsed;
                r.location = Location::BlockedOnInbox;
                if self.current == Some(receiver) {
                    self.current = None;
                }
                ReceiveOutcome::Blocked
            }
        }
    }
}

/// Scans `inbox` for the first message from `filter` (or the head if
/// `filter` is `None`, i.e. `ANYMESSAGE`), unlinks it, and returns its
/// handle.
fn find_and_unlink(
    inbox: &mut crate::util::List,
    msg_arena: &mut [message::Message; crate::config::N_MSG],
    filter: Option<PcbId>,
) -> Option<message::MsgId> {
    let want = filter.map(|p| p as u32).unwrap_or(ANYMESSAGE);
    let mut cursor = inbox.front();
    while let Some(mid) = cursor {
        let msg = msg_arena[mid as usize];
        let matches = filter.is_none() || msg.sender.map(|s| s as u32) == Some(want);
        if matches {
            inbox.remove(msg_arena, mid, message::link_of);
            return Some(mid);
        }
        cursor = msg_arena[mid as usize].link.next;
    }
    None
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
    fn send_to_blocked_receiver_wakes_it() {
        let mut k = fresh();
        let a = k.spawn(None, Role::User, Default::default()).unwrap();
        let b = k.spawn(None, Role::User, Default::default()).unwrap();
        k.evict_from_queue(b);
        k.pcb_mut(b).location = Location::BlockedOnInbox;

        k.send(a, b, 0xDEADBEEF);

        assert_eq!(k.pcb(a).state.result(), 0);
        assert_eq!(k.pcb(b).location, Location::Ready);
        let outcome = k.receive(b, None);
        assert_eq!(outcome, ReceiveOutcome::Completed { sender: a, payload: 0xDEADBEEF });
    }

    #[test]
    fn receive_blocks_with_empty_inbox() {
        let mut k = fresh();
        let b = k.spawn(None, Role::User, Default::default()).unwrap();
        k.current = Some(b);
        assert_eq!(k.receive(b, None), ReceiveOutcome::Blocked);
        assert_eq!(k.pcb(b).location, Location::BlockedOnInbox);
        assert!(k.current.is_none());
    }

    #[test]
    fn send_to_nonexistent_receiver_reports_dest_not_exist() {
        let mut k = fresh();
        let a = k.spawn(None, Role::User, Default::default()).unwrap();
        let ghost = k.spawn(None, Role::User, Default::default()).unwrap();
        k.terminate_process(ghost);
        k.send(a, ghost, 1);
        assert_eq!(k.pcb(a).state.result() as i32, DEST_NOT_EXIST);
    }

    #[test]
    fn inbox_is_fifo_under_sender_filter() {
        let mut k = fresh();
        let a = k.spawn(None, Role::User, Default::default()).unwrap();
        let b = k.spawn(None, Role::User, Default::default()).unwrap();
        let c = k.spawn(None, Role::User, Default::default()).unwrap();

        k.send(a, c, 1);
        k.send(b, c, 2);
        k.send(a, c, 3);

        assert_eq!(k.receive(c, Some(a)), ReceiveOutcome::Completed { sender: a, payload: 1 });
        assert_eq!(k.receive(c, Some(b)), ReceiveOutcome::Completed { sender: b, payload: 2 });
        assert_eq!(k.receive(c, Some(a)), ReceiveOutcome::Completed { sender: a, payload: 3 });
    }
}

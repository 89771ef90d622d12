//! Interrupt servicing: the PLT (preemption), the interval timer
//! (pseudo-clock), and device completions. At most one interrupt is
//! serviced per call — the caller (the dispatcher in [`super`]) re-enters
//! on the next pending one, matching the original's single-dispatch
//! `interruptHandler`.

use crate::arch::{Cpu, DeviceBus};
use crate::config::{PSECOND_US, TIME_SLICE_US};
use crate::kernel::Kernel;
use crate::message::{self, Message};
use crate::process::{pcb, Location, PcbId};
use crate::scheduler::ScheduleOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptOutcome {
    PltExpired(ScheduleOutcome),
    IntervalTick { released: u32 },
    DeviceCompleted,
    NoneReady,
}

impl<C: Cpu, B: DeviceBus> Kernel<C, B> {
    /// PLT fired: the running process's quantum is up.
    pub fn handle_plt_interrupt(&mut self) -> InterruptOutcome {
        if let Some(id) = self.current.take() {
            let p = self.pcb_mut(id);
            p.time_us += TIME_SLICE_US;
            p.location = Location::Ready;
            let arena = self.pcbs.arena();
            self.ready_queue.push_back(arena, id, pcb::queue_link_of);
        }
        InterruptOutcome::PltExpired(self.schedule())
    }

    /// Interval timer fired: release every process waiting on the
    /// pseudo-clock, reload the timer, and decrement `waiting_count` by
    /// exactly the number actually released.
    pub fn handle_interval_timer(&mut self) -> InterruptOutcome {
        self.cpu.set_interval_timer(PSECOND_US);
        let released = self.pseudo_clock_queue.len() as u32;
        loop {
            let popped = {
                let arena = self.pcbs.arena();
                self.pseudo_clock_queue.pop_front(arena, pcb::queue_link_of)
            };
            match popped {
                Some(id) => {
                    self.pcb_mut(id).location = Location::Ready;
                    let arena = self.pcbs.arena();
                    self.ready_queue.push_back(arena, id, pcb::queue_link_of);
                }
                None => break,
            }
        }
        self.waiting_count -= released;
        if self.current.is_none() {
            self.schedule();
        }
        InterruptOutcome::IntervalTick { released }
    }

    /// Services exactly one ready device on external `line` (3..=6),
    /// scanning devices in ascending order.
    pub fn handle_device_interrupt(&mut self, line: u8) -> InterruptOutcome {
        for dev in 0..crate::config::DEVICES_PER_LINE as u8 {
            if self.service_device_line(line, dev) {
                if self.current.is_none() {
                    self.schedule();
                }
                return InterruptOutcome::DeviceCompleted;
            }
        }
        InterruptOutcome::NoneReady
    }

    /// Acks and completes one device's pending request if its status is
    /// ready, without touching the scheduler — the piece of interrupt
    /// handling the pager also needs when it drives a flash `DOIO` to
    /// completion inline rather than waiting for a real interrupt.
    pub(crate) fn service_device_line(&mut self, line: u8, dev: u8) -> bool {
        let line_idx = (line - crate::config::LINE_DEVICE_FIRST) as usize;
        let addr = crate::config::DEVICE_REG_BASE
            + crate::config::DEVICE_REG_LINE_STRIDE * line_idx as u32
            + crate::config::DEVICE_REG_DEV_STRIDE * dev as u32;
        let status = self.bus.read_status(addr);
        if status == 0 {
            return false;
        }
        self.bus.write_command(addr, crate::config::CMD_ACK);
        let popped = {
            let arena = self.pcbs.arena();
            self.device_queues[line_idx][dev as usize].pop_front(arena, pcb::queue_link_of)
        };
        if let Some(id) = popped {
            self.waiting_count -= 1;
            self.complete_device_wait(id, status);
        }
        true
    }

    /// Services the terminal line: transmit is preferred over receive on
    /// the same device, devices scanned in ascending order.
    pub fn handle_terminal_interrupt(&mut self) -> InterruptOutcome {
        for dev in 0..crate::config::DEVICES_PER_LINE as u8 {
            for bank_idx in 0..2usize {
                let addr = Self::terminal_addr(dev, bank_idx);
                let status = self.bus.read_status(addr);
                if status & crate::config::STATUS_MASK_LOW_BYTE != crate::config::STATUS_TERM_OK_CHAR_TRANS {
                    continue;
                }
                self.bus.write_command(addr, crate::config::CMD_ACK);
                let popped = {
                    let arena = self.pcbs.arena();
                    self.terminal_queues[bank_idx][dev as usize].pop_front(arena, pcb::queue_link_of)
                };
                if let Some(id) = popped {
                    self.waiting_count -= 1;
                    self.complete_device_wait(id, status);
                }
                if self.current.is_none() {
                    self.schedule();
                }
                return InterruptOutcome::DeviceCompleted;
            }
        }
        InterruptOutcome::NoneReady
    }

    fn terminal_addr(dev: u8, bank_idx: usize) -> u32 {
        let base = crate::config::DEVICE_REG_BASE
            + crate::config::DEVICE_REG_LINE_STRIDE * (crate::config::LINE_TERMINAL - crate::config::LINE_DEVICE_FIRST) as u32
            + crate::config::DEVICE_REG_DEV_STRIDE * dev as u32;
        if bank_idx == 0 {
            base
        } else {
            base + 2 * crate::config::WORD_LEN as u32
        }
    }

    /// Synthesises the `ENDIO` message the interrupt handler sends to the
    /// SSI on behalf of the popped PCB, carrying the latched status word;
    /// the popped process then waits on its own inbox for the SSI's reply
    /// (it issued `DOIO` and blocked there originally).
    fn complete_device_wait(&mut self, id: PcbId, status: u32) {
        *self.pcb_mut(id).state.result_mut() = status;
        self.pcb_mut(id).location = Location::BlockedOnInbox;
        let ssi = match self.ssi {
            Some(s) => s,
            None => return,
        };
        if let Some(mid) = self.msgs.alloc(message::link_of) {
            *self.msgs.get_mut(mid) = Message { sender: Some(id), payload: crate::config::SVC_ENDIO, ..Default::default() };
            let was_blocked = self.pcb(ssi).location == Location::BlockedOnInbox;
            let mut inbox = self.pcb(ssi).inbox;
            {
                let msg_arena = self.msgs.arena();
                inbox.push_back(msg_arena, mid, message::link_of);
            }
            self.pcb_mut(ssi).inbox = inbox;
            if was_blocked {
                self.pcb_mut(ssi).location = Location::Ready;
                let arena = self.pcbs.arena();
                self.ready_queue.push_back(arena, ssi, pcb::queue_link_of);
            }
        }
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
    fn interval_tick_releases_exactly_the_waiters() {
        let mut k = fresh();
        let mut waiters = vec![];
        for _ in 0..8 {
            let id = k.spawn(None, Role::User, Default::default()).unwrap();
            k.evict_from_queue(id);
            k.pcb_mut(id).location = Location::PseudoClock;
            let arena = k.pcbs.arena();
            k.pseudo_clock_queue.push_back(arena, id, pcb::queue_link_of);
            waiters.push(id);
        }
        k.waiting_count = 8;
        let outcome = k.handle_interval_timer();
        assert_eq!(outcome, InterruptOutcome::IntervalTick { released: 8 });
        assert_eq!(k.waiting_count, 0);
        for id in waiters {
            assert_eq!(k.pcb(id).location, Location::Ready);
        }
    }

    #[test]
    fn device_interrupt_completes_endio_to_ssi() {
        let mut k = fresh();
        let ssi = k.spawn(None, Role::Ssi, Default::default()).unwrap();
        k.ssi = Some(ssi);
        k.evict_from_queue(ssi);
        k.pcb_mut(ssi).location = Location::BlockedOnInbox;

        let requester = k.spawn(None, Role::User, Default::default()).unwrap();
        k.evict_from_queue(requester);
        k.pcb_mut(requester).location = Location::Device { line: crate::config::LINE_DEVICE_FIRST, dev: 0 };
        let arena = k.pcbs.arena();
        k.device_queues[0][0].push_back(arena, requester, pcb::queue_link_of);
        k.waiting_count = 1;

        let addr = crate::config::DEVICE_REG_BASE;
        k.bus.latch_status(addr, crate::config::STATUS_FLASH_READY);

        let outcome = k.handle_device_interrupt(crate::config::LINE_DEVICE_FIRST);
        assert_eq!(outcome, InterruptOutcome::DeviceCompleted);
        assert_eq!(k.waiting_count, 0);
        assert_eq!(k.pcb(ssi).location, Location::Ready);
        assert_eq!(k.receive(ssi, Some(requester)), crate::exception::syscall::ReceiveOutcome::Completed {
            sender: requester,
            payload: crate::config::SVC_ENDIO,
        });
    }
}

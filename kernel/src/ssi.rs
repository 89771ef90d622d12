//! The System Service Interface: the single privileged server process that
//! every create/terminate/I/O/timer/identity request is serialised
//! through. Modeled as a pure dispatch function invoked once per message
//! the SSI's inbox yields, rather than as a re-entrant instruction stream
//! — see the design notes on why that's a faithful simplification for
//! this crate's four kernel-trusted service roles.
//!
//! The original passes a pointer-sized payload that the SSI dereferences
//! into a richer per-service struct (`ssi_create_process_t`,
//! `ssi_do_io_t`, ...). Since this crate does not model a byte-addressable
//! RAM image for user processes, the richer argument is passed directly
//! as a typed [`SsiArg`] instead of as a memory address the SSI would
//! have to dereference — the marshalling step the original performs by
//! pointer indirection, done here by the type system instead.

use crate::arch::{Cpu, DeviceBus, ProcessorState};
use crate::config::*;
use crate::kernel::Kernel;
use crate::process::{pcb, Location, PcbId, Role};
use crate::support::descriptor::SupportDescriptor;

pub enum SsiArg {
    CreateProcess { state: ProcessorState, support: Option<SupportDescriptor> },
    TermProcess { target: Option<PcbId> },
    DoIo { command_addr: u32, command_value: u32 },
    GetProcessId { want_parent: bool },
    EndIo { status: u32 },
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SsiReply {
    NewProcess(i32),
    Ack(i32),
    Time(u32),
    SupportPtr(i32),
    ProcessId(u32),
    /// `DOIO` defers its reply until the matching device interrupt.
    Deferred,
}

impl<C: Cpu, B: DeviceBus> Kernel<C, B> {
    /// Processes one SSI request from `sender` and, unless it was `DOIO`,
    /// sends the reply back immediately. `ENDIO` passes through the same
    /// reply gate as everything but `DOIO` — the original `DOIO` caller,
    /// not the interrupt handler, is who receives it (see design notes).
    pub fn ssi_dispatch(&mut self, ssi: PcbId, sender: PcbId, service_code: u32, arg: SsiArg) {
        let reply = match service_code {
            SVC_CREATEPROCESS => self.ssi_create_process(sender, arg),
            SVC_TERMPROCESS => self.ssi_term_process(sender, arg),
            SVC_DOIO => self.ssi_do_io(sender, arg),
            SVC_GETTIME => SsiReply::Time(self.pcb(sender).time_us),
            SVC_CLOCKWAIT => self.ssi_clock_wait(sender),
            SVC_GETSUPPORTPTR => {
                SsiReply::SupportPtr(self.pcb(sender).support.map(|h| h as i32).unwrap_or(-1))
            }
            SVC_GETPROCESSID => self.ssi_get_process_id(sender, arg),
            SVC_ENDIO => SsiReply::Ack(self.ssi_end_io(arg)),
            _ => {
                self.terminate_process(sender);
                return;
            }
        };

        if let SsiReply::Deferred = reply {
            return;
        }
        let raw = match reply {
            SsiReply::NewProcess(v) => v as u32,
            SsiReply::Ack(v) => v as u32,
            SsiReply::Time(v) => v,
            SsiReply::SupportPtr(v) => v as u32,
            SsiReply::ProcessId(v) => v,
            SsiReply::Deferred => unreachable!(),
        };
        self.send(ssi, sender, raw);
    }

    fn ssi_create_process(&mut self, sender: PcbId, arg: SsiArg) -> SsiReply {
        let (state, support) = match arg {
            SsiArg::CreateProcess { state, support } => (state, support),
            _ => (ProcessorState::default(), None),
        };
        let support_handle = match support {
            Some(desc) => match self.install_support(desc) {
                Some(h) => Some(h),
                None => return SsiReply::NewProcess(NOPROC),
            },
            None => None,
        };
        match self.spawn(Some(sender), Role::User, state) {
            Some(id) => {
                self.pcb_mut(id).support = support_handle;
                SsiReply::NewProcess(id as i32)
            }
            None => SsiReply::NewProcess(NOPROC),
        }
    }

    fn ssi_term_process(&mut self, sender: PcbId, arg: SsiArg) -> SsiReply {
        let target = match arg {
            SsiArg::TermProcess { target: Some(t) } => t,
            _ => sender,
        };
        if let Some(handle) = self.pcb(target).support {
            self.free_support(handle);
        }
        self.terminate_process(target);
        SsiReply::Ack(0)
    }

    fn ssi_do_io(&mut self, sender: PcbId, arg: SsiArg) -> SsiReply {
        let (addr, command) = match arg {
            SsiArg::DoIo { command_addr, command_value } => (command_addr, command_value),
            _ => return SsiReply::Ack(DEST_NOT_EXIST),
        };
        match Self::locate_device(addr) {
            Some(location) => {
                self.pcb_mut(sender).location = location;
                match location {
                    Location::Device { line, dev } => {
                        let arena = self.pcbs.arena();
                        self.device_queues[(line - LINE_DEVICE_FIRST) as usize][dev as usize]
                            .push_back(arena, sender, pcb::queue_link_of);
                    }
                    Location::Terminal { bank, dev } => {
                        let bank_idx = match bank {
                            crate::process::pcb::TermBank::Transmit => 0,
                            crate::process::pcb::TermBank::Receive => 1,
                        };
                        let arena = self.pcbs.arena();
                        self.terminal_queues[bank_idx][dev as usize].push_back(arena, sender, pcb::queue_link_of);
                    }
                    _ => unreachable!(),
                }
                self.waiting_count += 1;
                if self.current == Some(sender) {
                    self.current = None;
                }
                self.bus.write_command(addr, command);
                SsiReply::Deferred
            }
            None => SsiReply::Ack(DEST_NOT_EXIST),
        }
    }

    /// Matches a command-register address against every external device
    /// and terminal slot to find which wait queue a `DOIO` request on it
    /// belongs to.
    fn locate_device(addr: u32) -> Option<Location> {
        for dev in 0..DEVICES_PER_LINE as u8 {
            if addr == B::terminal_transmit_addr(dev) {
                return Some(Location::Terminal { bank: crate::process::pcb::TermBank::Transmit, dev });
            }
            if addr == B::terminal_receive_addr(dev) {
                return Some(Location::Terminal { bank: crate::process::pcb::TermBank::Receive, dev });
            }
        }
        for line in LINE_DEVICE_FIRST..=LINE_DEVICE_LAST {
            for dev in 0..DEVICES_PER_LINE as u8 {
                if addr == B::device_addr(line, dev) {
                    return Some(Location::Device { line, dev });
                }
            }
        }
        None
    }

    fn ssi_clock_wait(&mut self, sender: PcbId) -> SsiReply {
        self.pcb_mut(sender).location = Location::PseudoClock;
        let arena = self.pcbs.arena();
        self.pseudo_clock_queue.push_back(arena, sender, pcb::queue_link_of);
        self.waiting_count += 1;
        if self.current == Some(sender) {
            self.current = None;
        }
        SsiReply::Deferred
    }

    fn ssi_get_process_id(&mut self, sender: PcbId, arg: SsiArg) -> SsiReply {
        let want_parent = matches!(arg, SsiArg::GetProcessId { want_parent: true });
        if want_parent {
            match self.pcb(sender).parent {
                Some(p) => SsiReply::ProcessId(self.pcb(p).pid),
                None => SsiReply::ProcessId(0),
            }
        } else {
            SsiReply::ProcessId(self.pcb(sender).pid)
        }
    }

    fn ssi_end_io(&mut self, arg: SsiArg) -> i32 {
        match arg {
            SsiArg::EndIo { status } => status as i32,
            _ => 0,
        }
    }
}

//! The kernel's explicit, threaded-through state. Ports the original's
//! module-level globals (`procList`, `msgList`, the per-device wait
//! queues, `processCount`, `softBlockCount`, `ssi_pcb`) into one struct so
//! every handler takes `&mut Kernel` instead of touching statics — the
//! host build wraps a single instance in [`crate::sync::Spinlock`] for
//! defence in depth; nothing below this module needs to know that.

use crate::arch::{Cpu, DeviceBus};
use crate::config::{DEVICES_PER_LINE, N_DEVICE_LINES, N_MSG, N_PROC, UPROC_MAX};
use crate::message::{self, Message, MsgId};
use crate::process::{pcb, Pcb, PcbId, Role};
use crate::support::descriptor::SupportDescriptor;
use crate::swap::SwapPool;
use crate::util::{List, Pool};

pub struct Kernel<C: Cpu, B: DeviceBus> {
    pub cpu: C,
    pub bus: B,

    pub(crate) pcbs: Pool<Pcb, N_PROC>,
    pub(crate) msgs: Pool<Message, N_MSG>,

    pub ready_queue: List,
    pub device_queues: [[List; DEVICES_PER_LINE]; N_DEVICE_LINES],
    pub terminal_queues: [[List; DEVICES_PER_LINE]; 2],
    pub pseudo_clock_queue: List,

    pub process_count: u32,
    pub waiting_count: u32,
    pub current: Option<PcbId>,
    pub ssi: Option<PcbId>,
    pub swap_mutex_holder: Option<PcbId>,

    next_pid: u32,
    pub(crate) supports: Pool<SupportSlot, UPROC_MAX>,
    pub swap_pool: SwapPool,
}

/// Support descriptors live in their own small fixed pool, linked the same
/// way PCBs and messages are; a PCB references one by `u16` handle.
#[derive(Clone, Copy)]
pub(crate) struct SupportSlot {
    pub(crate) link: crate::util::Link,
    pub(crate) desc: Option<SupportDescriptor>,
}

impl Default for SupportSlot {
    fn default() -> Self {
        SupportSlot { link: crate::util::Link::empty(), desc: None }
    }
}

pub(crate) fn support_link_of(s: &mut SupportSlot) -> &mut crate::util::Link {
    &mut s.link
}

impl<C: Cpu, B: DeviceBus> Kernel<C, B> {
    pub fn new(cpu: C, bus: B) -> Self {
        Kernel {
            cpu,
            bus,
            pcbs: Pool::new([Pcb::default(); N_PROC], pcb::queue_link_of),
            msgs: Pool::new([Message::default(); N_MSG], message::link_of),
            ready_queue: List::new(),
            device_queues: [[List::new(); DEVICES_PER_LINE]; N_DEVICE_LINES],
            terminal_queues: [[List::new(); DEVICES_PER_LINE]; 2],
            pseudo_clock_queue: List::new(),
            process_count: 0,
            waiting_count: 0,
            current: None,
            ssi: None,
            swap_mutex_holder: None,
            next_pid: 1,
            supports: Pool::new([SupportSlot::default(); UPROC_MAX], support_link_of),
            swap_pool: SwapPool::default(),
        }
    }

    pub(crate) fn alloc_pid(&mut self) -> u32 {
        let pid = self.next_pid;
        self.next_pid += 1;
        pid
    }

    pub fn pcb(&self, id: PcbId) -> &Pcb {
        self.pcbs.get(id)
    }

    pub fn pcb_mut(&mut self, id: PcbId) -> &mut Pcb {
        self.pcbs.get_mut(id)
    }

    pub fn msg(&self, id: MsgId) -> &Message {
        self.msgs.get(id)
    }

    pub fn support(&self, handle: u16) -> &SupportDescriptor {
        self.supports.get(handle).desc.as_ref().expect("support handle always refers to an allocated slot")
    }

    pub fn support_mut(&mut self, handle: u16) -> &mut SupportDescriptor {
        self.supports.get_mut(handle).desc.as_mut().expect("support handle always refers to an allocated slot")
    }

    /// Allocates a support descriptor slot for `asid`. Returns `None` if
    /// all `UPROC_MAX` slots are in use.
    pub(crate) fn alloc_support(&mut self, asid: u8) -> Option<u16> {
        self.install_support(SupportDescriptor::new(asid))
    }

    /// Installs an already-built descriptor into a free slot.
    pub(crate) fn install_support(&mut self, desc: SupportDescriptor) -> Option<u16> {
        let handle = self.supports.alloc(support_link_of)?;
        self.supports.get_mut(handle).desc = Some(desc);
        Some(handle)
    }

    pub(crate) fn free_support(&mut self, handle: u16) {
        self.supports.get_mut(handle).desc = None;
        self.supports.dealloc(handle, support_link_of);
    }

    /// Allocates a fresh PCB as a direct child of `parent`, in the `Role`
    /// given, with `process_count` bumped, and places it directly on the
    /// ready queue — a newly created process is always immediately
    /// runnable, so there is no window where the PCB is allocated but its
    /// `Location` still (mis-)reads as `Free`.
    pub(crate) fn spawn(&mut self, parent: Option<PcbId>, role: Role, state: crate::arch::ProcessorState) -> Option<PcbId> {
        let id = self.pcbs.alloc(pcb::queue_link_of)?;
        let pid = self.alloc_pid();
        {
            let arena = self.pcbs.arena();
            arena[id as usize] = Pcb { pid, role, parent, state, location: crate::process::Location::Ready, ..Pcb::default() };
        }
        if let Some(p) = parent {
            let arena = self.pcbs.arena();
            let mut children = arena[p as usize].children;
            children.push_back(arena, id, pcb::sibling_link_of);
            arena[p as usize].children = children;
        }
        {
            let arena = self.pcbs.arena();
            self.ready_queue.push_back(arena, id, pcb::queue_link_of);
        }
        self.process_count += 1;
        Some(id)
    }
}

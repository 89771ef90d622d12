//! Page-fault handling: FIFO frame replacement over the flash-backed swap
//! pool, serialized by the swap mutex. Installed as the `PageFault`
//! pass-up handler for every user process.

use crate::arch::{Cpu, DeviceBus, TlbEntry};
use crate::config::*;
use crate::error::{KernelError, Result};
use crate::exception::syscall::ReceiveOutcome;
use crate::kernel::Kernel;
use crate::process::PcbId;
use crate::ssi::SsiArg;
use crate::support::descriptor::{EntryLoFlags, PassUpSlot};

/// Which direction a flash transfer moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlashOp {
    Read,
    Write,
}

impl<C: Cpu, B: DeviceBus> Kernel<C, B> {
    /// Handles one page fault for `faulter`, whose support descriptor's
    /// `PageFault` slot holds the triggering exception state.
    ///
    /// TLB-Modification (`EXC_MOD`) is decoded with the standard
    /// shift/mask (see [`Cause::exc_code`]) rather than compared against
    /// the raw cause word, which is the one behavioral fix this crate
    /// makes relative to the system it's modeled on: every page-table
    /// entry starts dirty, so this should be unreachable, but a wrong
    /// decode there would otherwise silently swallow a real fault.
    pub fn handle_page_fault(&mut self, ssi: PcbId, mutex: PcbId, faulter: PcbId) -> Result<()> {
        let support = self.pcb(faulter).support.ok_or(KernelError::NoSupport)?;
        let cause = self.support(support).cause_of(PassUpSlot::PageFault);

        if cause.exc_code() == EXC_MOD {
            self.pager_trap(mutex, faulter);
            return Ok(());
        }

        self.swap_mutex_acquire(mutex, faulter);

        let entry_hi = self.support(support).slot(PassUpSlot::PageFault).entry_hi;
        let vpn = Self::decode_vpn(entry_hi);
        let asid = self.support(support).asid;

        let frame = self.swap_pool.select_frame();
        let occupant = self.swap_pool.frames[frame];
        if !occupant.is_free() {
            self.invalidate_and_writeback(ssi, faulter, occupant, frame)?;
        }

        self.flash_transfer(ssi, faulter, asid, vpn, frame, FlashOp::Read)?;

        {
            let desc = self.support_mut(support);
            desc.page_table[vpn].entry_hi = entry_hi;
            desc.page_table[vpn].set_frame_and_flags(frame as u32, EntryLoFlags::VALID | EntryLoFlags::DIRTY);
        }
        self.swap_pool.frames[frame] = crate::swap::SwapEntry { asid: asid as i32, vpn: vpn as u32 };
        let entry_lo = self.support(support).page_table[vpn].entry_lo;
        self.tlb_refresh(entry_hi, entry_lo);

        self.swap_mutex_release(mutex, faulter);
        Ok(())
    }

    /// The dedicated TLB-refill vector: look up the PTE for the faulting
    /// VPN and load it into a random TLB slot.
    pub fn handle_tlb_refill(&mut self, faulter: PcbId, entry_hi: u32) -> Result<()> {
        let support = self.pcb(faulter).support.ok_or(KernelError::NoSupport)?;
        let vpn = Self::decode_vpn(entry_hi);
        let pte = self.support(support).page_table[vpn];
        self.cpu.tlb_write_random(TlbEntry { entry_hi: pte.entry_hi, entry_lo: pte.entry_lo });
        Ok(())
    }

    fn decode_vpn(entry_hi: u32) -> usize {
        let vpn = entry_hi >> 12;
        if vpn == STACK_PAGE_VPN {
            STACK_PAGE_INDEX
        } else {
            (vpn as usize) % USER_PGTBL_SIZE
        }
    }

    fn tlb_refresh(&mut self, entry_hi: u32, entry_lo: u32) {
        if let Some(idx) = self.cpu.tlb_probe(entry_hi) {
            self.cpu.tlb_write_index(idx, TlbEntry { entry_hi, entry_lo });
        }
    }

    fn invalidate_and_writeback(
        &mut self,
        ssi: PcbId,
        faulter: PcbId,
        occupant: crate::swap::SwapEntry,
        frame: usize,
    ) -> Result<()> {
        // Interrupts would be disabled here on real hardware while the
        // PTE/TLB mutate; the simulator has no interrupts to race with.
        if let Some(support) = self.support_handle_for_asid(occupant.asid as u8) {
            let entry_hi = self.support(support).page_table[occupant.vpn as usize].entry_hi;
            {
                let desc = self.support_mut(support);
                let flags = desc.page_table[occupant.vpn as usize].flags() & !EntryLoFlags::VALID;
                desc.page_table[occupant.vpn as usize].set_frame_and_flags(frame as u32, flags);
            }
            if let Some(idx) = self.cpu.tlb_probe(entry_hi) {
                let mut entry = self.cpu.tlb_read(idx);
                entry.entry_lo &= !EntryLoFlags::VALID.bits();
                self.cpu.tlb_write_index(idx, entry);
            }
        }
        // The writeback is issued as the faulting process's own DOIO, same
        // as the read-in below: the pager runs as part of the faulter's
        // support-level code, not the evicted occupant's.
        self.flash_transfer(ssi, faulter, occupant.asid as u8, occupant.vpn as usize, frame, FlashOp::Write)
    }

    /// Finds the support descriptor owning `asid`, if any process still
    /// holds one (the occupant may have already terminated, in which case
    /// the stale frame is simply overwritten with no writeback target).
    fn support_handle_for_asid(&mut self, asid: u8) -> Option<u16> {
        (0..UPROC_MAX as u16).find(|&h| {
            self.supports
                .get(h)
                .desc
                .as_ref()
                .map(|d| d.asid == asid)
                .unwrap_or(false)
        })
    }

    /// Synthesises a `DOIO` against the owning process's flash device,
    /// issued through the SSI exactly like every other device request
    /// (`ssi_do_io` / `sst_write`): loads the RAM-side byte address into
    /// `data0`, blocks `faulter` on the flash device queue, drives the
    /// simulated device to completion, and waits out the `ENDIO` round
    /// trip back through the SSI before reporting the latched status.
    /// Matches `readWriteBackingStore`, which also issues its DOIO as a
    /// real `SYSCALL` rather than poking the device registers directly.
    fn flash_transfer(&mut self, ssi: PcbId, faulter: PcbId, asid: u8, vpn: usize, frame: usize, op: FlashOp) -> Result<()> {
        // A prior flash transfer in this same page-fault (writeback, then
        // read-in) leaves `faulter` woken back onto the ready queue; pull
        // it back off before linking it into the device queue below, the
        // same single-membership invariant `dispatch_specific` enforces
        // for a freshly scheduled process.
        self.dispatch_specific(faulter);

        let dev = (asid.saturating_sub(1)) % DEVICES_PER_LINE as u8;
        let line = LINE_DEVICE_FIRST + 1; // flash occupies the second external line
        let addr = B::device_addr(line, dev);
        let ram_addr = SWAP_POOL_AREA + (frame as u32) * PAGE_SIZE as u32;
        self.bus.write_data0(addr, ram_addr);
        let command = match op {
            FlashOp::Read => CMD_FLASH_READ,
            FlashOp::Write => CMD_FLASH_WRITE,
        } | ((vpn as u32) << 8);

        self.ssi_dispatch(ssi, faulter, SVC_DOIO, SsiArg::DoIo { command_addr: addr, command_value: command });

        // The simulated flash completes synchronously once commanded, so
        // drive its line to completion inline rather than waiting for a
        // real interrupt to arrive on its own schedule.
        self.service_device_line(line, dev);

        let status = match self.receive(ssi, Some(faulter)) {
            ReceiveOutcome::Completed { .. } => self.pcb(faulter).state.result(),
            ReceiveOutcome::Blocked => return Err(KernelError::DeviceNotReady),
        };
        self.ssi_dispatch(ssi, faulter, SVC_ENDIO, SsiArg::EndIo { status });

        match self.receive(faulter, Some(ssi)) {
            ReceiveOutcome::Completed { payload, .. } => {
                if payload & STATUS_MASK_LOW_BYTE != STATUS_FLASH_READY && payload != 0 {
                    Err(KernelError::DeviceNotReady)
                } else {
                    Ok(())
                }
            }
            ReceiveOutcome::Blocked => Err(KernelError::DeviceNotReady),
        }
    }

    /// Trap handler path for a page fault this crate treats as
    /// unrecoverable: release the swap mutex if held, then terminate via
    /// the SSI.
    fn pager_trap(&mut self, mutex: PcbId, faulter: PcbId) {
        if self.swap_mutex_holder == Some(faulter) {
            self.swap_mutex_release(mutex, faulter);
        }
        self.terminate_process(faulter);
    }
}

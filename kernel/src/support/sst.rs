//! Support Service Technician: the per-user-process broker for the small
//! set of conveniences built on top of the SSI (wall-clock time,
//! self-termination, and character-at-a-time printer/terminal output).
//! Modeled, like the SSI itself, as a pure dispatch function rather than a
//! re-entrant instruction stream — see the design notes on that
//! simplification.
//!
//! `WRITEPRINTER`/`WRITETERMINAL` take a single character per request
//! instead of a buffer pointer and length: real hardware transmits one
//! character per `DOIO` regardless, and this crate has no byte-addressable
//! user memory to read a buffer out of, so callers that want to print a
//! string issue one request per character, same as the device actually
//! does under the hood.

use crate::arch::{Cpu, DeviceBus};
use crate::config::*;
use crate::kernel::Kernel;
use crate::process::PcbId;
use crate::ssi::SsiArg;

pub enum SstArg {
    GetTod,
    Terminate,
    WritePrinter { dev: u8, ch: u8 },
    WriteTerminal { dev: u8, ch: u8 },
}

/// The external line printers live on, distinct from flash (which the
/// pager claims on `LINE_DEVICE_FIRST + 1`).
const PRINTER_LINE: u8 = LINE_DEVICE_FIRST + 2;

impl<C: Cpu, B: DeviceBus> Kernel<C, B> {
    /// Services one SST request from `sender`. `DOIO`-backed replies
    /// (printer/terminal writes) complete asynchronously through the
    /// existing device-interrupt path and are not sent from here; the
    /// other two reply immediately.
    pub fn sst_dispatch(&mut self, sst: PcbId, ssi: PcbId, sender: PcbId, service_code: u32, arg: SstArg) {
        match service_code {
            SST_GET_TOD => {
                let t = self.pcb(sender).time_us;
                self.send(sst, sender, t);
            }
            SST_TERMINATE => {
                // The SST is its U-proc's parent (see `Kernel::spawn_user`),
                // so terminating the SST recursively takes the requesting
                // U-proc down with it, matching the original's "SST calls
                // TERMPROCESS on itself" teardown.
                self.ssi_dispatch(ssi, sst, SVC_TERMPROCESS, SsiArg::TermProcess { target: None });
            }
            SST_WRITEPRINTER => self.sst_write(ssi, sender, arg, false),
            SST_WRITETERMINAL => self.sst_write(ssi, sender, arg, true),
            _ => self.terminate_process(sender),
        }
    }

    /// Relays a single-character write as a `DOIO` request issued on
    /// `sender`'s behalf; the SSI blocks `sender` on the device queue and
    /// the interrupt handler's `ENDIO` delivers the reply directly back to
    /// `sender` once the device completes, so the SST has nothing further
    /// to do after kicking the request off.
    fn sst_write(&mut self, ssi: PcbId, sender: PcbId, arg: SstArg, terminal: bool) {
        let (dev, ch) = match arg {
            SstArg::WritePrinter { dev, ch } | SstArg::WriteTerminal { dev, ch } => (dev, ch),
            SstArg::GetTod | SstArg::Terminate => return,
        };
        let addr = if terminal { B::terminal_transmit_addr(dev) } else { B::device_addr(PRINTER_LINE, dev) };
        let command = CMD_PRINTCHR | ((ch as u32) << 8);
        self.ssi_dispatch(ssi, sender, SVC_DOIO, SsiArg::DoIo { command_addr: addr, command_value: command });
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
    fn get_tod_replies_with_accumulated_time() {
        let mut k = fresh();
        let ssi = k.spawn(None, Role::Ssi, Default::default()).unwrap();
        let sst = k.spawn(None, Role::Sst, Default::default()).unwrap();
        let uproc = k.spawn(Some(ssi), Role::User, Default::default()).unwrap();
        k.pcb_mut(uproc).time_us = 42;

        k.sst_dispatch(sst, ssi, uproc, SST_GET_TOD, SstArg::GetTod);

        assert_eq!(
            k.receive(uproc, Some(sst)),
            crate::exception::syscall::ReceiveOutcome::Completed { sender: sst, payload: 42 }
        );
    }

    #[test]
    fn terminal_write_queues_the_device_request() {
        let mut k = fresh();
        let ssi = k.spawn(None, Role::Ssi, Default::default()).unwrap();
        let sst = k.spawn(None, Role::Sst, Default::default()).unwrap();
        let uproc = k.spawn(Some(ssi), Role::User, Default::default()).unwrap();

        k.sst_dispatch(sst, ssi, uproc, SST_WRITETERMINAL, SstArg::WriteTerminal { dev: 0, ch: b'x' });

        assert_eq!(
            k.pcb(uproc).location,
            crate::process::Location::Terminal { bank: crate::process::pcb::TermBank::Transmit, dev: 0 }
        );
        assert_eq!(k.waiting_count, 1);
    }
}

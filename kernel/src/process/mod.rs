pub mod lifecycle;
pub mod pcb;

pub use pcb::{Location, Pcb, PcbId, Role};

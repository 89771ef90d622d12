pub mod descriptor;
pub mod exception_handler;
pub mod pager;
pub mod sst;
pub mod swap_mutex;

pub use descriptor::{PassUpSlot, SupportDescriptor};

pub mod list;
pub mod pool;

pub use list::{Link, List};
pub use pool::Pool;

pub mod address;
pub mod error;
pub mod mmu;
pub mod page_replacer;
pub mod page_table;
pub mod trace;

pub use error::{Result, VmError};

#![no_std]

#[macro_use]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod cause;
pub mod effect;
pub mod instruction;

// RE-EXPORTS
// ================================================================================================

pub use cause::{Cause, NonEmpty};
#[cfg(feature = "std")]
pub use effect::{Defect, attempt};
pub use effect::{
    Effect, access, access_effect, collect_all, fail, for_each, get, halt, log, modify, repeat_n,
    repeat_until, set, succeed, suspend, unit, update,
};
pub use instruction::{Instruction, RuntimeFlag};

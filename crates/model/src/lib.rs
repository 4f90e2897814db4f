#![cfg_attr(not(test), no_std)]
extern crate alloc;

pub mod normalize;
pub mod quiz;
pub mod validate;

pub use normalize::normalize;
pub use quiz::Question;
pub use validate::validate;

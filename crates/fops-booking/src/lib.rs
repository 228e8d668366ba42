pub mod rules;
pub mod slots;

pub use rules::*;
pub use slots::*;

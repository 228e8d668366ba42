pub mod ics;
pub mod notifier;

pub use ics::*;
pub use notifier::*;

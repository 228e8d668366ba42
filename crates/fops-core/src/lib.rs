pub mod errors;
pub mod ids;
pub mod model;
pub mod overview;
pub mod transitions;
pub mod types;

pub use errors::*;
pub use ids::*;
pub use model::*;
pub use overview::*;
pub use transitions::*;
pub use types::*;

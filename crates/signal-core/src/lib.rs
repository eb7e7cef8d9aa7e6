pub mod entitlement;
pub mod error;
pub mod numeric;
pub mod types;

pub use entitlement::*;
pub use error::*;
pub use types::*;

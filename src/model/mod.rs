//! Plain data: allowance units, identifiers, and the derived order view.

pub mod allowance;
pub mod identifiers;
pub mod order;
pub mod retirement;

pub use allowance::*;
pub use identifiers::*;
pub use order::*;
pub use retirement::*;

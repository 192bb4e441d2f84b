pub mod block;
pub mod matches;

pub use self::block::{BlockKind, DispatchBlock, InsertError};
pub use self::matches::{BestMatch, DispatchMatch};

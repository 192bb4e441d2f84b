pub mod combine;
pub mod parser;
pub mod range;

pub use self::combine::{Combination, CombinedMediaType, combine, compare};
pub use self::parser::{MediaParseError, parse};
pub use self::range::{MediaGroup, MediaType, Quality, WILDCARD};

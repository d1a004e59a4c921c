#[macro_use]
extern crate serde;

mod ballot;
mod challenge;
mod error;
mod math;
mod paillier;
mod payload;
mod proof;
mod serde_dec;
mod tally;

pub use ballot::*;
pub use challenge::*;
pub use error::*;
pub use math::*;
pub use paillier::*;
pub use payload::*;
pub use proof::*;
pub use tally::*;

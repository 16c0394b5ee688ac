mod attempt;
mod card;

pub use attempt::*;
pub use card::*;

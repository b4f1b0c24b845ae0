mod expense;
mod filter;
mod money;
mod validation;

pub use expense::*;
pub use filter::*;
pub use money::*;
pub use validation::*;

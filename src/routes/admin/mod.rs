mod newsletters;
pub use newsletters::*;

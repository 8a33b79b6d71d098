//! Utility module

mod span;
mod error;
mod naming;

pub use span::Span;
pub use error::{Error, Result};
pub use naming::camelize;

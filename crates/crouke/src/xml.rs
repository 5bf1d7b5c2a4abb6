//! XML parsing primitive

pub mod model;
pub mod parser;

pub use model::{Child, Element};
pub use parser::Parser;

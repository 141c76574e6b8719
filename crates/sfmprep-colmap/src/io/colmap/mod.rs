mod text;
mod types;
mod writer;

pub use text::*;
pub use types::*;
pub use writer::*;

//! Persisted workspaces in the Blockly XML format, read and written with `quick-xml`.

pub mod error;
mod load;
mod save;

pub use error::ParseError;
pub use load::{Loaded, load};
pub use save::save;

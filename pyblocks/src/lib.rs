pub mod block;
pub mod connection;
pub mod drag;
pub mod markup;
pub mod render;
pub mod session;
pub mod types;
pub mod unify;

pub use block::catalog::Catalog;
pub use block::{Block, BlockId};
pub use connection::{Connection, ConnectionId, ConnectionKind};
pub use session::{Advisory, EditorError, EditorSession};
pub use types::{Column, TypeError, TypeTag, TypeVecs, TypeVector};

pub mod environment;
pub mod error;
pub mod generator;
pub mod template;

pub use error::{GenDiagnostic, GenError};
pub use generator::{Generator, Output, generate, needs_parens};

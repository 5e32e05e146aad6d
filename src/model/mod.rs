pub mod application;
pub mod common;
pub mod discovery;
pub mod environment;
pub mod gamespace;

pub use application::*;
pub use common::*;
pub use discovery::*;
pub use environment::*;
pub use gamespace::*;

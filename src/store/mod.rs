pub mod error;
pub mod memory;
pub mod postgres;
pub mod read_cache;
pub mod traits;

pub use error::*;
pub use memory::*;
pub use postgres::*;
pub use read_cache::*;
pub use traits::*;

pub mod gamespace_extractor;
pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::*;

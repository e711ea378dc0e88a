pub mod error;
pub mod record;
pub mod schema;

pub use error::*;
pub use record::*;
pub use schema::*;

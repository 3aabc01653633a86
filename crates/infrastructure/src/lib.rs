pub mod error;
pub mod memory;
pub mod repository;
pub mod sqlite;

pub use error::*;
pub use memory::*;
pub use repository::*;
pub use sqlite::*;

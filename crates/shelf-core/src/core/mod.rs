pub mod error;
pub mod path;

pub use error::{IntegrityError, ShelfError, ShelfResult};

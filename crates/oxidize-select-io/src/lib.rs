pub mod csv_io;
pub mod error;

pub use csv_io::*;
pub use error::{DataError, DataResult};

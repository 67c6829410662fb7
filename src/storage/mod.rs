pub mod sqlite;

pub use sqlite::{Record, Store};

pub mod connection;
pub mod summary;

pub use connection::ConnectionDetails;
pub use summary::{Schema, Summary, Table};

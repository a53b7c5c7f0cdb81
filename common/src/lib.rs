mod domain;
mod infrastructure;
pub mod test_utils;

// Persisted documents field names

pub const ID_FIELD_NAME: &str = "_id";
pub const CREATED_FIELD_NAME: &str = "createdAt";
pub const UPDATED_FIELD_NAME: &str = "updatedAt";
pub const VERSION_FIELD_NAME: &str = "version";

// expose domain module

pub use domain::*;

// expose database module

pub use infrastructure::database;
pub use infrastructure::store::MongoStore;

pub mod config;
pub mod operator;
pub mod path;
pub mod store;


pub use config::StorageConfig;
pub use operator::{create_operator, init_operator, test_connection};
pub use path::{remote_key, validate_path};
pub use store::{ObjectStore, OpendalStore};

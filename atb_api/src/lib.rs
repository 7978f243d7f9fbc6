mod client;
mod errors;
mod query;
pub mod types;
mod user_agent;
pub use self::client::{Client, ClientOptions, DEFAULT_BASE_URL};
pub use self::errors::Error;
pub use self::query::CatalogQuery;
pub use self::user_agent::get_user_agent;

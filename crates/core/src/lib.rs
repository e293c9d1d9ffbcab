pub mod config;
pub mod error;
pub mod ids;

pub use config::load_dotenv;
pub use error::QuarryError;
pub use ids::*;

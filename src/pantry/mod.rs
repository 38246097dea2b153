mod directory;
mod model;
mod repo;
mod repo_types;

pub use directory::{Directory, InMemoryDirectory};
pub use model::{normalize_name, Offer, PantryEntry, Request, UserProfile};
pub use repo::PgDirectory;

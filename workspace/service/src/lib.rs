pub mod auth;
pub mod error;
pub mod products;
pub mod users;

pub use auth::{has_role, require_role};
pub use error::{Result, ServiceError};
pub use products::{ImageUpload, NewProduct, ProductService};
pub use users::{NewUser, UserService};

//! This file serves as the root for all SeaORM entity modules.
//! The data model is small: users hold roles and sessions, publish
//! products, and each product carries its images inline.

pub mod image;
pub mod product;
pub mod session;
pub mod user;
pub mod user_role;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::image::Entity as Image;
    pub use super::product::Entity as Product;
    pub use super::session::Entity as Session;
    pub use super::user::Entity as User;
    pub use super::user_role::Entity as UserRole;
}

use sea_orm::entity::prelude::*;

/// A registered account holder.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Login identifier; unique across the system.
    #[sea_orm(unique)]
    pub email: String,
    /// Display name shown next to listings.
    pub name: String,
    /// Whether the account may authenticate. Banning flips this off.
    #[sea_orm(default_value = "true")]
    pub active: bool,
    /// bcrypt digest of the password; the plaintext is never stored.
    pub password_hash: String,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Listings published by this user.
    #[sea_orm(has_many = "super::product::Entity")]
    Product,
    /// Roles granted to this user.
    #[sea_orm(has_many = "super::user_role::Entity")]
    UserRole,
    /// Login sessions currently issued to this user.
    #[sea_orm(has_many = "super::session::Entity")]
    Session,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::user_role::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserRole.def()
    }
}

impl Related<super::session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Session.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

use super::{image, user};
use sea_orm::entity::prelude::*;

/// A marketplace listing.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    /// Whole currency units; there are no fractional prices.
    pub price: i32,
    pub city: String,
    /// The user who published this listing.
    pub user_id: i32,
    /// The image shown on overview pages; always one of this listing's own
    /// images, or `None` for rows predating any upload.
    pub preview_image_id: Option<i32>,
    /// Server-assigned at creation; client input never sets this.
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// A listing belongs to the user who published it.
    #[sea_orm(
        belongs_to = "user::Entity",
        from = "Column::UserId",
        to = "user::Column::Id"
    )]
    User,
    /// Up to three images uploaded with the listing.
    #[sea_orm(has_many = "image::Entity")]
    Image,
}

impl Related<user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<image::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Image.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

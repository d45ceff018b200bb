use super::product;
use sea_orm::entity::prelude::*;

/// An image attached to a listing. The payload lives in the row itself
/// rather than on disk, so a listing and its images share one transaction.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "images")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Form-field name the upload arrived under.
    pub name: String,
    /// Filename as it existed on the uploader's machine.
    pub original_file_name: String,
    /// Payload size in bytes.
    pub size: i64,
    pub content_type: String,
    /// True for the single image shown on overview pages.
    #[sea_orm(default_value = "false")]
    pub is_preview: bool,
    #[sea_orm(column_type = "Blob")]
    pub bytes: Vec<u8>,
    pub product_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "product::Entity",
        from = "Column::ProductId",
        to = "product::Column::Id"
    )]
    Product,
}

impl Related<product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

use chrono::Utc;
use model::entities::prelude::*;
use model::entities::{image, product, user};
use sea_orm::sea_query::{Expr, Func, LikeExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use tracing::{info, instrument, warn};

use crate::error::{Result, ServiceError};

/// One uploaded image, fully read into memory.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    /// Form-field name the part arrived under.
    pub name: String,
    /// Filename as submitted by the client.
    pub original_file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Input for publishing a listing.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub title: String,
    pub description: String,
    pub price: i32,
    pub city: String,
}

/// Listings: browsing, search, publishing and deletion.
#[derive(Debug, Clone)]
pub struct ProductService {
    db: DatabaseConnection,
}

/// Escape LIKE wildcards so a search term only ever matches literally.
fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

impl ProductService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// All listings, newest first, optionally narrowed by a title search.
    ///
    /// Matching is a case-insensitive substring match so it behaves the same
    /// on SQLite and Postgres. `%`, `_` and `\` in the term match themselves,
    /// never as wildcards. An empty or whitespace-only term means no filter
    /// at all.
    #[instrument(skip(self))]
    pub async fn list_products(&self, title_filter: Option<&str>) -> Result<Vec<product::Model>> {
        let mut query = Product::find()
            .order_by_desc(product::Column::CreatedAt)
            .order_by_desc(product::Column::Id);

        if let Some(term) = title_filter {
            let term = term.trim();
            if !term.is_empty() {
                let pattern = format!("%{}%", escape_like(&term.to_lowercase()));
                query = query.filter(
                    Expr::expr(Func::lower(Expr::col(product::Column::Title)))
                        .like(LikeExpr::new(pattern).escape('\\')),
                );
            }
        }

        Ok(query.all(&self.db).await?)
    }

    /// Fetch a single listing or fail with `NotFound`.
    #[instrument(skip(self))]
    pub async fn product_by_id(&self, id: i32) -> Result<product::Model> {
        Product::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("product {}", id)))
    }

    /// All images of one listing, in upload order.
    #[instrument(skip(self))]
    pub async fn images_of(&self, product_id: i32) -> Result<Vec<image::Model>> {
        Ok(Image::find()
            .filter(image::Column::ProductId.eq(product_id))
            .order_by_asc(image::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Listings published by one user, newest first.
    #[instrument(skip(self))]
    pub async fn products_of_user(&self, user_id: i32) -> Result<Vec<product::Model>> {
        Ok(Product::find()
            .filter(product::Column::UserId.eq(user_id))
            .order_by_desc(product::Column::CreatedAt)
            .order_by_desc(product::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Publish a listing together with its images.
    ///
    /// Zero-length uploads (empty file inputs) are skipped; what remains must
    /// be one to three images. The first stored image becomes the preview.
    /// Product row, image rows and the preview pointer are written in one
    /// transaction so a failed upload never leaves a half-created listing.
    #[instrument(skip(self, owner, new_product, uploads), fields(owner_id = owner.id))]
    pub async fn create_product(
        &self,
        owner: &user::Model,
        new_product: NewProduct,
        uploads: Vec<ImageUpload>,
    ) -> Result<product::Model> {
        let usable: Vec<ImageUpload> = uploads
            .into_iter()
            .filter(|upload| !upload.bytes.is_empty())
            .collect();
        if usable.is_empty() {
            return Err(ServiceError::InvalidUpload(
                "a listing needs at least one image".to_string(),
            ));
        }
        if usable.len() > 3 {
            return Err(ServiceError::InvalidUpload(
                "a listing takes at most three images".to_string(),
            ));
        }

        let txn = self.db.begin().await?;

        let product = product::ActiveModel {
            title: Set(new_product.title),
            description: Set(new_product.description),
            price: Set(new_product.price),
            city: Set(new_product.city),
            user_id: Set(owner.id),
            preview_image_id: Set(None),
            created_at: Set(Utc::now().naive_utc()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let mut preview_id = None;
        for (position, upload) in usable.into_iter().enumerate() {
            let size = upload.bytes.len() as i64;
            let stored = image::ActiveModel {
                name: Set(upload.name),
                original_file_name: Set(upload.original_file_name),
                size: Set(size),
                content_type: Set(upload.content_type),
                is_preview: Set(position == 0),
                bytes: Set(upload.bytes),
                product_id: Set(product.id),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            if position == 0 {
                preview_id = Some(stored.id);
            }
        }

        let mut update: product::ActiveModel = product.into();
        update.preview_image_id = Set(preview_id);
        let product = update.update(&txn).await?;

        txn.commit().await?;

        info!("User {} published product {}", owner.id, product.id);
        Ok(product)
    }

    /// Delete a listing and its images. Only the owner may do this.
    ///
    /// The ownership check runs before any write; the image and product rows
    /// go away in one transaction.
    #[instrument(skip(self, requester), fields(requester_id = requester.id))]
    pub async fn delete_product(&self, requester: &user::Model, id: i32) -> Result<()> {
        let product = self.product_by_id(id).await?;
        if product.user_id != requester.id {
            warn!(
                "User {} may not delete product {} owned by user {}",
                requester.id, id, product.user_id
            );
            return Err(ServiceError::Forbidden(format!(
                "product {} belongs to another user",
                id
            )));
        }

        let txn = self.db.begin().await?;
        Image::delete_many()
            .filter(image::Column::ProductId.eq(product.id))
            .exec(&txn)
            .await?;
        Product::delete_by_id(product.id).exec(&txn).await?;
        txn.commit().await?;

        info!("User {} deleted product {}", requester.id, id);
        Ok(())
    }

    /// Fetch one image (metadata and payload) or fail with `NotFound`.
    #[instrument(skip(self))]
    pub async fn image_by_id(&self, id: i32) -> Result<image::Model> {
        Image::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("image {}", id)))
    }
}

#[cfg(test)]
mod tests {
    use migration::{Migrator, MigratorTrait};
    use sea_orm::{ConnectionTrait, Database, DatabaseConnection};

    use super::*;

    async fn setup_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to connect to test database");
        db.execute_unprepared("PRAGMA foreign_keys = ON;")
            .await
            .expect("Failed to enable foreign keys");
        Migrator::up(&db, None).await.expect("Migrations failed.");
        db
    }

    async fn seed_user(db: &DatabaseConnection, email: &str) -> user::Model {
        user::ActiveModel {
            email: Set(email.to_string()),
            name: Set("Seller".to_string()),
            active: Set(true),
            password_hash: Set("x".to_string()),
            created_at: Set(Utc::now().naive_utc()),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("Failed to seed user")
    }

    fn listing(title: &str) -> NewProduct {
        NewProduct {
            title: title.to_string(),
            description: "A fine item".to_string(),
            price: 42,
            city: "Prague".to_string(),
        }
    }

    fn upload(field: &str, file: &str, bytes: &[u8]) -> ImageUpload {
        ImageUpload {
            name: field.to_string(),
            original_file_name: file.to_string(),
            content_type: "image/png".to_string(),
            bytes: bytes.to_vec(),
        }
    }

    #[tokio::test]
    async fn create_stores_images_and_marks_the_first_as_preview() {
        let db = setup_db().await;
        let service = ProductService::new(db.clone());
        let seller = seed_user(&db, "seller@example.com").await;

        let product = service
            .create_product(
                &seller,
                listing("Office chair"),
                vec![
                    upload("file1", "front.png", &[1, 2, 3]),
                    upload("file2", "", &[]),
                    upload("file3", "side.png", &[4, 5]),
                ],
            )
            .await
            .unwrap();

        // The empty part was skipped, two images remain
        let images = service.images_of(product.id).await.unwrap();
        assert_eq!(images.len(), 2);
        assert!(images[0].is_preview);
        assert!(!images[1].is_preview);
        assert_eq!(product.preview_image_id, Some(images[0].id));
        assert_eq!(images[0].original_file_name, "front.png");
        assert_eq!(images[0].size, 3);
        assert_eq!(images[0].bytes, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn create_stores_all_three_images() {
        let db = setup_db().await;
        let service = ProductService::new(db.clone());
        let seller = seed_user(&db, "full@example.com").await;

        let product = service
            .create_product(
                &seller,
                listing("Bookshelf"),
                vec![
                    upload("file1", "front.png", &[1]),
                    upload("file2", "side.png", &[2, 2]),
                    upload("file3", "back.png", &[3, 3, 3]),
                ],
            )
            .await
            .unwrap();

        // Exactly three rows, the first one carrying the preview flag
        let images = service.images_of(product.id).await.unwrap();
        assert_eq!(images.len(), 3);
        assert!(images[0].is_preview);
        assert!(!images[1].is_preview);
        assert!(!images[2].is_preview);
        assert_eq!(product.preview_image_id, Some(images[0].id));
    }

    #[tokio::test]
    async fn create_requires_at_least_one_usable_image() {
        let db = setup_db().await;
        let service = ProductService::new(db.clone());
        let seller = seed_user(&db, "empty@example.com").await;

        let err = service
            .create_product(&seller, listing("Ghost"), vec![upload("file1", "", &[])])
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidUpload(_)));

        // Nothing was half-written
        assert!(service.list_products(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_caps_the_image_count_at_three() {
        let db = setup_db().await;
        let service = ProductService::new(db.clone());
        let seller = seed_user(&db, "many@example.com").await;

        let err = service
            .create_product(
                &seller,
                listing("Spider"),
                vec![
                    upload("file1", "a.png", &[1]),
                    upload("file2", "b.png", &[2]),
                    upload("file3", "c.png", &[3]),
                    upload("file4", "d.png", &[4]),
                ],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidUpload(_)));
    }

    #[tokio::test]
    async fn search_matches_titles_case_insensitively() {
        let db = setup_db().await;
        let service = ProductService::new(db.clone());
        let seller = seed_user(&db, "search@example.com").await;

        service
            .create_product(
                &seller,
                listing("Blue Mountain Bike"),
                vec![upload("file1", "bike.png", &[1])],
            )
            .await
            .unwrap();
        service
            .create_product(
                &seller,
                listing("Office chair"),
                vec![upload("file1", "chair.png", &[2])],
            )
            .await
            .unwrap();

        let hits = service.list_products(Some("bike")).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Blue Mountain Bike");

        let hits = service.list_products(Some("BIKE")).await.unwrap();
        assert_eq!(hits.len(), 1);

        let hits = service.list_products(Some("boat")).await.unwrap();
        assert!(hits.is_empty());

        // Absent and blank filters mean "everything", newest first
        let all = service.list_products(None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].title, "Office chair");
        let all = service.list_products(Some("   ")).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn search_treats_wildcards_as_literal_characters() {
        let db = setup_db().await;
        let service = ProductService::new(db.clone());
        let seller = seed_user(&db, "literal@example.com").await;

        service
            .create_product(
                &seller,
                listing("Lamp 100 watts"),
                vec![upload("file1", "lamp.png", &[1])],
            )
            .await
            .unwrap();
        service
            .create_product(
                &seller,
                listing("Charged to 100% in an hour"),
                vec![upload("file1", "charger.png", &[2])],
            )
            .await
            .unwrap();

        // "%" in the term is not a wildcard; only the literal title matches
        let hits = service.list_products(Some("100%")).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Charged to 100% in an hour");

        // Neither is "_"
        let hits = service.list_products(Some("100_")).await.unwrap();
        assert!(hits.is_empty());

        // A trailing backslash stays a literal character too
        let hits = service.list_products(Some("watts\\")).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn listings_are_scoped_per_user() {
        let db = setup_db().await;
        let service = ProductService::new(db.clone());
        let alice = seed_user(&db, "alice@example.com").await;
        let bob = seed_user(&db, "bob@example.com").await;

        service
            .create_product(&alice, listing("Lamp"), vec![upload("file1", "l.png", &[1])])
            .await
            .unwrap();

        assert_eq!(service.products_of_user(alice.id).await.unwrap().len(), 1);
        assert!(service.products_of_user(bob.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn only_the_owner_may_delete_a_listing() {
        let db = setup_db().await;
        let service = ProductService::new(db.clone());
        let owner = seed_user(&db, "owner@example.com").await;
        let stranger = seed_user(&db, "stranger@example.com").await;

        let product = service
            .create_product(&owner, listing("Desk"), vec![upload("file1", "d.png", &[1])])
            .await
            .unwrap();

        let err = service.delete_product(&stranger, product.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
        // Refusal left the listing untouched
        assert!(service.product_by_id(product.id).await.is_ok());

        service.delete_product(&owner, product.id).await.unwrap();
        assert!(matches!(
            service.product_by_id(product.id).await.unwrap_err(),
            ServiceError::NotFound(_)
        ));
        // Images went with it
        assert!(service.images_of(product.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_an_unknown_listing_is_not_found() {
        let db = setup_db().await;
        let service = ProductService::new(db.clone());
        let user = seed_user(&db, "nobody@example.com").await;

        let err = service.delete_product(&user, 777).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn unknown_images_are_not_found_rather_than_a_panic() {
        let db = setup_db().await;
        let service = ProductService::new(db);

        let err = service.image_by_id(31337).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}

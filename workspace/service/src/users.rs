use std::collections::HashMap;

use chrono::Utc;
use model::entities::prelude::*;
use model::entities::user_role::Role;
use model::entities::{session, user, user_role};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, Iterable, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::error::{Result, ServiceError};

/// Input for registering a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password: String,
}

/// User management: registration, login sessions, bans and role grants.
///
/// Owns a database handle; handlers call into this instead of touching
/// entities directly.
#[derive(Debug, Clone)]
pub struct UserService {
    db: DatabaseConnection,
}

impl UserService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Resolve a bearer token into its owning user.
    ///
    /// Missing tokens, unknown tokens and tokens of banned users all resolve
    /// to `None` rather than an error, so anonymous browsing stays cheap.
    #[instrument(skip(self, token))]
    pub async fn user_by_token(&self, token: Option<&str>) -> Result<Option<user::Model>> {
        let Some(token) = token else {
            return Ok(None);
        };

        let session = Session::find()
            .filter(session::Column::Token.eq(token))
            .one(&self.db)
            .await?;
        let Some(session) = session else {
            debug!("Token does not match any session");
            return Ok(None);
        };

        let user = User::find_by_id(session.user_id).one(&self.db).await?;
        Ok(user.filter(|u| u.active))
    }

    /// Register a new account and grant it the base role.
    #[instrument(skip(self, new_user))]
    pub async fn create_user(&self, new_user: NewUser) -> Result<user::Model> {
        let existing = User::find()
            .filter(user::Column::Email.eq(new_user.email.as_str()))
            .one(&self.db)
            .await?;
        if existing.is_some() {
            warn!("Registration rejected, email is already taken");
            return Err(ServiceError::EmailTaken(new_user.email));
        }

        let password_hash = bcrypt::hash(&new_user.password, bcrypt::DEFAULT_COST)?;

        let txn = self.db.begin().await?;
        let user = user::ActiveModel {
            email: Set(new_user.email),
            name: Set(new_user.name),
            active: Set(true),
            password_hash: Set(password_hash),
            created_at: Set(Utc::now().naive_utc()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        user_role::ActiveModel {
            user_id: Set(user.id),
            role: Set(Role::User),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        info!("User {} registered", user.id);
        Ok(user)
    }

    /// Verify credentials and issue a fresh session token.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<(user::Model, session::Model)> {
        let user = User::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await?;
        let Some(user) = user else {
            warn!("Login failed, unknown email");
            return Err(ServiceError::InvalidCredentials);
        };

        if !bcrypt::verify(password, &user.password_hash)? {
            warn!("Login failed for user {}, wrong password", user.id);
            return Err(ServiceError::InvalidCredentials);
        }
        if !user.active {
            warn!("Login refused for user {}, account is banned", user.id);
            return Err(ServiceError::UserBanned);
        }

        let session = session::ActiveModel {
            token: Set(Uuid::new_v4().to_string()),
            user_id: Set(user.id),
            created_at: Set(Utc::now().naive_utc()),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        debug!("Issued session {} for user {}", session.id, user.id);
        Ok((user, session))
    }

    /// Drop the session behind a token. Unknown tokens are a no-op.
    #[instrument(skip(self, token))]
    pub async fn logout(&self, token: &str) -> Result<()> {
        let deleted = Session::delete_many()
            .filter(session::Column::Token.eq(token))
            .exec(&self.db)
            .await?;
        debug!("Logout removed {} session(s)", deleted.rows_affected);
        Ok(())
    }

    /// Fetch a single user or fail with `NotFound`.
    #[instrument(skip(self))]
    pub async fn get_user(&self, id: i32) -> Result<user::Model> {
        User::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("user {}", id)))
    }

    /// All users, oldest first. Backs the admin overview.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<user::Model>> {
        Ok(User::find()
            .order_by_asc(user::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Ban a user. Banning an already banned user changes nothing.
    #[instrument(skip(self))]
    pub async fn ban_user(&self, id: i32) -> Result<user::Model> {
        let user = self.get_user(id).await?;
        if !user.active {
            debug!("User {} is already banned", id);
            return Ok(user);
        }

        let mut update: user::ActiveModel = user.into();
        update.active = Set(false);
        let user = update.update(&self.db).await?;
        info!("User {} banned", user.id);
        Ok(user)
    }

    /// Lift a ban. Unbanning an active user changes nothing.
    #[instrument(skip(self))]
    pub async fn unban_user(&self, id: i32) -> Result<user::Model> {
        let user = self.get_user(id).await?;
        if user.active {
            debug!("User {} is not banned", id);
            return Ok(user);
        }

        let mut update: user::ActiveModel = user.into();
        update.active = Set(true);
        let user = update.update(&self.db).await?;
        info!("User {} unbanned", user.id);
        Ok(user)
    }

    /// Roles currently granted to a user, in tag order.
    #[instrument(skip(self))]
    pub async fn roles_of(&self, user_id: i32) -> Result<Vec<Role>> {
        let rows = UserRole::find()
            .filter(user_role::Column::UserId.eq(user_id))
            .order_by_asc(user_role::Column::Role)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(|row| row.role).collect())
    }

    /// Replace a user's role set with the checkboxes ticked in a role form.
    ///
    /// Checkbox semantics: a role is granted when a form field with its tag
    /// is present; every other form field is ignored. An empty selection
    /// falls back to the base role so no account ends up role-less.
    #[instrument(skip(self, form))]
    pub async fn change_user_roles(
        &self,
        user_id: i32,
        form: &HashMap<String, String>,
    ) -> Result<Vec<Role>> {
        let user = self.get_user(user_id).await?;

        let mut selected: Vec<Role> = Role::iter().filter(|role| form.contains_key(role.tag())).collect();
        if selected.is_empty() {
            selected.push(Role::User);
        }

        let txn = self.db.begin().await?;
        UserRole::delete_many()
            .filter(user_role::Column::UserId.eq(user.id))
            .exec(&txn)
            .await?;
        for role in &selected {
            user_role::ActiveModel {
                user_id: Set(user.id),
                role: Set(*role),
            }
            .insert(&txn)
            .await?;
        }
        txn.commit().await?;

        info!(
            "User {} now holds roles [{}]",
            user.id,
            selected.iter().map(|r| r.tag()).collect::<Vec<_>>().join(", ")
        );
        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use migration::{Migrator, MigratorTrait};
    use sea_orm::{ConnectionTrait, Database};

    use super::*;

    async fn setup_service() -> UserService {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to connect to test database");
        db.execute_unprepared("PRAGMA foreign_keys = ON;")
            .await
            .expect("Failed to enable foreign keys");
        Migrator::up(&db, None).await.expect("Migrations failed.");
        UserService::new(db)
    }

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            name: "Test User".to_string(),
            password: "hunter22".to_string(),
        }
    }

    #[tokio::test]
    async fn registration_rejects_duplicate_email() {
        let service = setup_service().await;

        let user = service.create_user(new_user("dup@example.com")).await.unwrap();
        assert!(user.active);
        assert_ne!(user.password_hash, "hunter22");

        let err = service.create_user(new_user("dup@example.com")).await.unwrap_err();
        assert!(matches!(err, ServiceError::EmailTaken(email) if email == "dup@example.com"));
    }

    #[tokio::test]
    async fn registration_grants_the_base_role() {
        let service = setup_service().await;
        let user = service.create_user(new_user("base@example.com")).await.unwrap();

        let roles = service.roles_of(user.id).await.unwrap();
        assert_eq!(roles, vec![Role::User]);
    }

    #[tokio::test]
    async fn login_issues_a_resolvable_token() {
        let service = setup_service().await;
        let user = service.create_user(new_user("login@example.com")).await.unwrap();

        let (logged_in, session) = service
            .login("login@example.com", "hunter22")
            .await
            .unwrap();
        assert_eq!(logged_in.id, user.id);

        let principal = service
            .user_by_token(Some(session.token.as_str()))
            .await
            .unwrap();
        assert_eq!(principal.map(|u| u.id), Some(user.id));
    }

    #[tokio::test]
    async fn login_rejects_bad_credentials() {
        let service = setup_service().await;
        service.create_user(new_user("creds@example.com")).await.unwrap();

        let err = service.login("creds@example.com", "wrong").await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidCredentials));

        let err = service.login("nobody@example.com", "hunter22").await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidCredentials));
    }

    #[tokio::test]
    async fn anonymous_and_unknown_tokens_resolve_to_nobody() {
        let service = setup_service().await;

        assert!(service.user_by_token(None).await.unwrap().is_none());
        assert!(service
            .user_by_token(Some("not-a-real-token"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn banning_is_idempotent_and_kills_existing_tokens() {
        let service = setup_service().await;
        let user = service.create_user(new_user("banned@example.com")).await.unwrap();
        let (_, session) = service
            .login("banned@example.com", "hunter22")
            .await
            .unwrap();

        let banned = service.ban_user(user.id).await.unwrap();
        assert!(!banned.active);

        // Banning twice equals banning once
        let banned_again = service.ban_user(user.id).await.unwrap();
        assert!(!banned_again.active);

        // The live token no longer resolves and fresh logins are refused
        assert!(service
            .user_by_token(Some(session.token.as_str()))
            .await
            .unwrap()
            .is_none());
        let err = service.login("banned@example.com", "hunter22").await.unwrap_err();
        assert!(matches!(err, ServiceError::UserBanned));

        // Unban restores both paths without a new login
        let restored = service.unban_user(user.id).await.unwrap();
        assert!(restored.active);
        assert!(service
            .user_by_token(Some(session.token.as_str()))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn ban_of_unknown_user_is_not_found() {
        let service = setup_service().await;
        let err = service.ban_user(4040).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn logout_revokes_the_session() {
        let service = setup_service().await;
        service.create_user(new_user("bye@example.com")).await.unwrap();
        let (_, session) = service.login("bye@example.com", "hunter22").await.unwrap();

        service.logout(session.token.as_str()).await.unwrap();
        assert!(service
            .user_by_token(Some(session.token.as_str()))
            .await
            .unwrap()
            .is_none());

        // Logging out twice is a no-op
        service.logout(session.token.as_str()).await.unwrap();
    }

    #[tokio::test]
    async fn role_form_replaces_the_role_set() {
        let service = setup_service().await;
        let user = service.create_user(new_user("roles@example.com")).await.unwrap();

        // Tick both boxes; stray form fields are ignored
        let mut form = HashMap::new();
        form.insert("ROLE_USER".to_string(), "on".to_string());
        form.insert("ROLE_ADMIN".to_string(), "on".to_string());
        form.insert("userId".to_string(), user.id.to_string());
        form.insert("_csrf".to_string(), "abc".to_string());

        let roles = service.change_user_roles(user.id, &form).await.unwrap();
        assert_eq!(roles, vec![Role::User, Role::Admin]);
        let stored = service.roles_of(user.id).await.unwrap();
        assert_eq!(stored.len(), 2);

        // Unticking everything falls back to the base role
        let empty = HashMap::new();
        let roles = service.change_user_roles(user.id, &empty).await.unwrap();
        assert_eq!(roles, vec![Role::User]);
        assert_eq!(service.roles_of(user.id).await.unwrap(), vec![Role::User]);
    }

    #[tokio::test]
    async fn role_change_for_unknown_user_is_not_found() {
        let service = setup_service().await;
        let err = service
            .change_user_roles(99, &HashMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}

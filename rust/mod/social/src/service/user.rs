use socialrecipe_core::{new_id, now_rfc3339};
use socialrecipe_sql::{SQLExecutor, Value};
use tracing::{debug, info};

use crate::model::{ImageRef, NewUser, ProfileChange, ProfileUpdate, User};
use crate::service::{
    SocialError, SocialService, decode_row, fetch_record, find_record, insert_record, row_exists,
    search_key, select_columns, update_record, validate_id,
};

impl SocialService {
    /// Register a new user.
    ///
    /// Email and username uniqueness are enforced by the store; a clash is
    /// reported as `AlreadyExists` naming the field.
    pub fn register(&self, input: NewUser) -> Result<User, SocialError> {
        let email = input.email.trim().to_lowercase();
        if !email.contains('@') {
            return Err(SocialError::InvalidArgument("email must contain '@'".into()));
        }
        let username = input.username.trim().to_string();
        if username.is_empty() {
            return Err(SocialError::InvalidArgument("username is empty".into()));
        }
        self.check_password(&input.password)?;

        let password_hash = self
            .hasher
            .hash(&input.password)
            .map_err(SocialError::Internal)?;

        let profile_image = input.profile_image.or_else(|| {
            self.config
                .default_profile_image_url
                .as_ref()
                .map(|url| ImageRef::new(url.clone(), ""))
        });

        let now = now_rfc3339();
        let user = User {
            id: new_id(),
            name: input.name.trim().to_string(),
            username,
            email,
            phone_number: input.phone_number.filter(|p| !p.trim().is_empty()),
            bio: input.bio.unwrap_or_default(),
            profile_image,
            follower_count: 0,
            following_count: 0,
            created_at: now.clone(),
            updated_at: now.clone(),
        };

        let indexes: Vec<(&str, Value)> = vec![
            ("email", Value::Text(user.email.clone())),
            ("username", Value::Text(user.username.clone())),
            ("name", Value::Text(user.name.clone())),
            ("username_folded", Value::Text(search_key(&user.username))),
            ("name_folded", Value::Text(search_key(&user.name))),
            ("password_hash", Value::Text(password_hash)),
            ("created_at", Value::Text(now.clone())),
            ("updated_at", Value::Text(now)),
        ];

        insert_record(self.sql.as_ref(), &user.id, &user, &indexes)
            .map_err(identity_conflict)?;

        info!("registered user {} ({})", user.id, user.username);
        Ok(user)
    }

    /// Look a user up by email and check the password.
    ///
    /// An unknown email and a wrong password are indistinguishable.
    pub fn authenticate(&self, email: &str, password: &str) -> Result<User, SocialError> {
        let email = email.trim().to_lowercase();
        let sql = format!(
            "SELECT {}, t.password_hash AS password_hash FROM users t WHERE t.email = ?1",
            select_columns::<User>("t")
        );
        let rows = self.sql.query(&sql, &[Value::Text(email)])?;
        let invalid = || SocialError::NotFound("invalid email or password".into());

        let row = rows.first().ok_or_else(invalid)?;
        let hash = row.get_str("password_hash").unwrap_or_default();
        if !self.hasher.verify(password, hash) {
            debug!("authentication failed: password mismatch");
            return Err(invalid());
        }
        decode_row(row)
    }

    /// Get a user by id.
    pub fn get_user(&self, id: &str) -> Result<User, SocialError> {
        validate_id("user", id)?;
        fetch_record(self.sql.as_ref(), id)
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>, SocialError> {
        find_record(
            self.sql.as_ref(),
            "t.email = ?1",
            &[Value::Text(email.trim().to_lowercase())],
        )
    }

    pub fn find_user_by_username(&self, username: &str) -> Result<Option<User>, SocialError> {
        find_record(
            self.sql.as_ref(),
            "t.username = ?1",
            &[Value::Text(username.trim().to_string())],
        )
    }

    pub fn user_exists(&self, id: &str) -> Result<bool, SocialError> {
        validate_id("user", id)?;
        row_exists(self.sql.as_ref(), "SELECT 1 FROM users WHERE id = ?1", &[Value::from(id)])
    }

    pub fn email_exists(&self, email: &str) -> Result<bool, SocialError> {
        row_exists(
            self.sql.as_ref(),
            "SELECT 1 FROM users WHERE email = ?1",
            &[Value::Text(email.trim().to_lowercase())],
        )
    }

    pub fn username_exists(&self, username: &str) -> Result<bool, SocialError> {
        row_exists(
            self.sql.as_ref(),
            "SELECT 1 FROM users WHERE username = ?1",
            &[Value::Text(username.trim().to_string())],
        )
    }

    /// Apply a partial profile update. Counters are never touched here.
    pub fn update_profile(
        &self,
        user_id: &str,
        update: ProfileUpdate,
    ) -> Result<ProfileChange, SocialError> {
        validate_id("user", user_id)?;

        let tx = self.sql.begin()?;
        let mut user: User = fetch_record(&*tx, user_id)?;

        if let Some(name) = non_empty(update.name) {
            user.name = name;
        }
        if let Some(username) = non_empty(update.username) {
            user.username = username;
        }
        if let Some(phone) = non_empty(update.phone_number) {
            user.phone_number = Some(phone);
        }
        if let Some(bio) = non_empty(update.bio) {
            user.bio = bio;
        }
        let replaced_image = match update.profile_image {
            Some(image) if !image.url.is_empty() => user.profile_image.replace(image),
            _ => None,
        };
        user.updated_at = now_rfc3339();

        save_profile(&*tx, &user)?;
        tx.commit()?;

        debug!("updated profile of user {}", user.id);
        Ok(ProfileChange {
            user,
            replaced_image,
        })
    }

    /// Replace the bio. An empty string clears it.
    pub fn update_bio(&self, user_id: &str, bio: &str) -> Result<User, SocialError> {
        validate_id("user", user_id)?;

        let tx = self.sql.begin()?;
        let mut user: User = fetch_record(&*tx, user_id)?;
        user.bio = bio.trim().to_string();
        user.updated_at = now_rfc3339();
        save_profile(&*tx, &user)?;
        tx.commit()?;
        Ok(user)
    }

    fn check_password(&self, password: &str) -> Result<(), SocialError> {
        let len = password.chars().count();
        let (min, max) = (self.config.password_min_len, self.config.password_max_len);
        if len < min || len > max {
            return Err(SocialError::InvalidArgument(format!(
                "password must be between {min} and {max} characters"
            )));
        }
        Ok(())
    }
}

fn save_profile<E: SQLExecutor + ?Sized>(db: &E, user: &User) -> Result<(), SocialError> {
    let indexes: Vec<(&str, Value)> = vec![
        ("username", Value::Text(user.username.clone())),
        ("name", Value::Text(user.name.clone())),
        ("username_folded", Value::Text(search_key(&user.username))),
        ("name_folded", Value::Text(search_key(&user.name))),
        ("updated_at", Value::Text(user.updated_at.clone())),
    ];
    update_record(db, &user.id, user, &indexes).map_err(identity_conflict)
}

/// Name the field behind a uniqueness clash on `users`.
fn identity_conflict(e: SocialError) -> SocialError {
    match e {
        SocialError::AlreadyExists(msg) if msg.contains("users.email") => {
            SocialError::AlreadyExists("email already registered".into())
        }
        SocialError::AlreadyExists(msg) if msg.contains("users.username") => {
            SocialError::AlreadyExists("username already taken".into())
        }
        other => other,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

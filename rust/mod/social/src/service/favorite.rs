use socialrecipe_core::{Page, PageKind, PageRequest, now_rfc3339};
use socialrecipe_sql::{SQLError, Value};
use tracing::debug;

use crate::model::{FavoriteFact, Recipe};
use crate::service::{
    SocialError, SocialService, ensure_recipe, ensure_user, paginate, row_exists, validate_id,
};

impl SocialService {
    pub fn add_favorite(&self, user_id: &str, recipe_id: &str) -> Result<FavoriteFact, SocialError> {
        validate_id("user", user_id)?;
        validate_id("recipe", recipe_id)?;

        let tx = self.sql.begin()?;
        ensure_user(&*tx, user_id)?;
        ensure_recipe(&*tx, recipe_id)?;

        let fact = FavoriteFact {
            user_id: user_id.to_string(),
            recipe_id: recipe_id.to_string(),
            created_at: now_rfc3339(),
        };
        tx.exec(
            "INSERT INTO favorite_facts (user_id, recipe_id, created_at) VALUES (?1, ?2, ?3)",
            &[
                Value::from(user_id),
                Value::from(recipe_id),
                Value::Text(fact.created_at.clone()),
            ],
        )
        .map_err(|e| match e {
            SQLError::UniqueViolation(_) => {
                SocialError::AlreadyExists(format!("{recipe_id} is already a favorite"))
            }
            other => other.into(),
        })?;
        tx.commit()?;

        debug!("{} favorited recipe {}", user_id, recipe_id);
        Ok(fact)
    }

    pub fn remove_favorite(&self, user_id: &str, recipe_id: &str) -> Result<(), SocialError> {
        validate_id("user", user_id)?;
        validate_id("recipe", recipe_id)?;

        let removed = self.sql.exec(
            "DELETE FROM favorite_facts WHERE user_id = ?1 AND recipe_id = ?2",
            &[Value::from(user_id), Value::from(recipe_id)],
        )?;
        if removed == 0 {
            return Err(SocialError::NotFound(format!(
                "{recipe_id} is not a favorite of {user_id}"
            )));
        }
        Ok(())
    }

    pub fn has_favorited(&self, user_id: &str, recipe_id: &str) -> Result<bool, SocialError> {
        validate_id("user", user_id)?;
        validate_id("recipe", recipe_id)?;
        row_exists(
            self.sql.as_ref(),
            "SELECT 1 FROM favorite_facts WHERE user_id = ?1 AND recipe_id = ?2",
            &[Value::from(user_id), Value::from(recipe_id)],
        )
    }

    /// A user's favorites, most recently favorited first.
    pub fn list_favorites(&self, user_id: &str, page: i64) -> Result<Page<Recipe>, SocialError> {
        validate_id("user", user_id)?;
        let request = PageRequest::new(page, PageKind::Recipes);

        let tx = self.sql.begin()?;
        ensure_user(&*tx, user_id)?;
        let result = paginate(
            &*tx,
            request,
            "r",
            "FROM favorite_facts f JOIN recipes r ON r.id = f.recipe_id WHERE f.user_id = ?1",
            "f.created_at DESC, f.rowid DESC",
            vec![Value::from(user_id)],
        )?;
        tx.commit()?;
        Ok(result)
    }
}

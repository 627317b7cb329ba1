use socialrecipe_core::{Page, PageKind, PageRequest, now_rfc3339};
use socialrecipe_sql::{SQLError, Value};
use tracing::debug;

use crate::model::{LikeFact, User};
use crate::service::{
    SocialError, SocialService, ensure_recipe, ensure_user, paginate, row_exists, validate_id,
};

impl SocialService {
    /// Record a like. A second like by the same user is `AlreadyLiked`
    /// and leaves `like_count` untouched.
    pub fn like(&self, user_id: &str, recipe_id: &str) -> Result<LikeFact, SocialError> {
        validate_id("user", user_id)?;
        validate_id("recipe", recipe_id)?;

        let tx = self.sql.begin()?;
        ensure_user(&*tx, user_id)?;
        ensure_recipe(&*tx, recipe_id)?;

        let fact = LikeFact {
            user_id: user_id.to_string(),
            recipe_id: recipe_id.to_string(),
            created_at: now_rfc3339(),
        };
        tx.exec(
            "INSERT INTO like_facts (user_id, recipe_id, created_at) VALUES (?1, ?2, ?3)",
            &[
                Value::from(user_id),
                Value::from(recipe_id),
                Value::Text(fact.created_at.clone()),
            ],
        )
        .map_err(|e| match e {
            SQLError::UniqueViolation(_) => {
                SocialError::AlreadyLiked(format!("{user_id} already liked {recipe_id}"))
            }
            other => other.into(),
        })?;
        tx.exec(
            "UPDATE recipes SET like_count = like_count + 1 WHERE id = ?1",
            &[Value::from(recipe_id)],
        )?;
        tx.commit()?;

        debug!("{} liked recipe {}", user_id, recipe_id);
        Ok(fact)
    }

    pub fn unlike(&self, user_id: &str, recipe_id: &str) -> Result<(), SocialError> {
        validate_id("user", user_id)?;
        validate_id("recipe", recipe_id)?;

        let tx = self.sql.begin()?;
        let removed = tx.exec(
            "DELETE FROM like_facts WHERE user_id = ?1 AND recipe_id = ?2",
            &[Value::from(user_id), Value::from(recipe_id)],
        )?;
        if removed == 0 {
            return Err(SocialError::NotFound(format!(
                "{user_id} has not liked {recipe_id}"
            )));
        }
        tx.exec(
            "UPDATE recipes SET like_count = MAX(like_count - 1, 0) WHERE id = ?1",
            &[Value::from(recipe_id)],
        )?;
        tx.commit()?;

        debug!("{} unliked recipe {}", user_id, recipe_id);
        Ok(())
    }

    pub fn has_liked(&self, user_id: &str, recipe_id: &str) -> Result<bool, SocialError> {
        validate_id("user", user_id)?;
        validate_id("recipe", recipe_id)?;
        row_exists(
            self.sql.as_ref(),
            "SELECT 1 FROM like_facts WHERE user_id = ?1 AND recipe_id = ?2",
            &[Value::from(user_id), Value::from(recipe_id)],
        )
    }

    /// Users who liked a recipe, most recent like first.
    pub fn list_likers(&self, recipe_id: &str, page: i64) -> Result<Page<User>, SocialError> {
        validate_id("recipe", recipe_id)?;
        let request = PageRequest::new(page, PageKind::People);

        let tx = self.sql.begin()?;
        ensure_recipe(&*tx, recipe_id)?;
        let result = paginate(
            &*tx,
            request,
            "u",
            "FROM like_facts l JOIN users u ON u.id = l.user_id WHERE l.recipe_id = ?1",
            "l.created_at DESC, l.rowid DESC",
            vec![Value::from(recipe_id)],
        )?;
        tx.commit()?;
        Ok(result)
    }
}

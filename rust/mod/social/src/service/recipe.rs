use socialrecipe_core::{new_id, now_rfc3339};
use socialrecipe_sql::Value;
use tracing::info;

use crate::model::{NewRecipe, Recipe, RecipeChange, RecipeUpdate};
use crate::service::{
    SocialError, SocialService, ensure_user, fetch_record, insert_record, search_key,
    update_record, validate_id,
};

impl SocialService {
    pub fn create_recipe(&self, author_id: &str, input: NewRecipe) -> Result<Recipe, SocialError> {
        validate_id("user", author_id)?;
        let recipe_name = input.recipe_name.trim().to_string();
        if recipe_name.is_empty() {
            return Err(SocialError::InvalidArgument("recipe name is empty".into()));
        }
        check_difficulty(input.difficulty)?;

        let now = now_rfc3339();
        let recipe = Recipe {
            id: new_id(),
            author_id: author_id.to_string(),
            recipe_name,
            description: input.description,
            difficulty: input.difficulty,
            procedure: input.procedure,
            image: input.image,
            like_count: 0,
            created_at: now.clone(),
            updated_at: now.clone(),
        };

        let tx = self.sql.begin()?;
        ensure_user(&*tx, author_id)?;
        let indexes: Vec<(&str, Value)> = vec![
            ("author_id", Value::from(author_id)),
            ("recipe_name", Value::Text(recipe.recipe_name.clone())),
            ("recipe_name_folded", Value::Text(search_key(&recipe.recipe_name))),
            ("created_at", Value::Text(now.clone())),
            ("updated_at", Value::Text(now)),
        ];
        insert_record(&*tx, &recipe.id, &recipe, &indexes)?;
        tx.commit()?;

        info!("user {} published recipe {}", author_id, recipe.id);
        Ok(recipe)
    }

    pub fn get_recipe(&self, recipe_id: &str) -> Result<Recipe, SocialError> {
        validate_id("recipe", recipe_id)?;
        fetch_record(self.sql.as_ref(), recipe_id)
    }

    /// Edit a recipe. Only its author may do so.
    pub fn update_recipe(
        &self,
        caller_id: &str,
        recipe_id: &str,
        update: RecipeUpdate,
    ) -> Result<RecipeChange, SocialError> {
        validate_id("user", caller_id)?;
        validate_id("recipe", recipe_id)?;
        check_difficulty(update.difficulty)?;

        let tx = self.sql.begin()?;
        let mut recipe: Recipe = fetch_record(&*tx, recipe_id)?;
        check_author(&recipe, caller_id)?;

        if let Some(name) = non_empty(update.recipe_name) {
            recipe.recipe_name = name;
        }
        if let Some(description) = non_empty(update.description) {
            recipe.description = description;
        }
        if let Some(procedure) = non_empty(update.procedure) {
            recipe.procedure = procedure;
        }
        if update.difficulty.is_some() {
            recipe.difficulty = update.difficulty;
        }
        let replaced_image = match update.image {
            Some(image) if !image.url.is_empty() => recipe.image.replace(image),
            _ => None,
        };
        recipe.updated_at = now_rfc3339();

        let indexes: Vec<(&str, Value)> = vec![
            ("recipe_name", Value::Text(recipe.recipe_name.clone())),
            ("recipe_name_folded", Value::Text(search_key(&recipe.recipe_name))),
            ("updated_at", Value::Text(recipe.updated_at.clone())),
        ];
        update_record(&*tx, recipe_id, &recipe, &indexes)?;
        tx.commit()?;

        Ok(RecipeChange {
            recipe,
            replaced_image,
        })
    }

    /// Delete a recipe with its likes and favorites. Only its author may do
    /// so. Returns the removed recipe so its image can be released.
    pub fn delete_recipe(&self, caller_id: &str, recipe_id: &str) -> Result<Recipe, SocialError> {
        validate_id("user", caller_id)?;
        validate_id("recipe", recipe_id)?;

        let tx = self.sql.begin()?;
        let recipe: Recipe = fetch_record(&*tx, recipe_id)?;
        check_author(&recipe, caller_id)?;

        let params = [Value::from(recipe_id)];
        let likes = tx.exec("DELETE FROM like_facts WHERE recipe_id = ?1", &params)?;
        let favorites = tx.exec("DELETE FROM favorite_facts WHERE recipe_id = ?1", &params)?;
        tx.exec("DELETE FROM recipes WHERE id = ?1", &params)?;
        tx.commit()?;

        info!(
            "user {} deleted recipe {} ({} likes, {} favorites)",
            caller_id, recipe_id, likes, favorites
        );
        Ok(recipe)
    }
}

fn check_author(recipe: &Recipe, caller_id: &str) -> Result<(), SocialError> {
    if recipe.author_id != caller_id {
        return Err(SocialError::Forbidden(format!(
            "{caller_id} is not the author of {}",
            recipe.id
        )));
    }
    Ok(())
}

fn check_difficulty(difficulty: Option<u8>) -> Result<(), SocialError> {
    match difficulty {
        Some(d) if !(1..=5).contains(&d) => Err(SocialError::InvalidArgument(format!(
            "difficulty must be between 1 and 5, got {d}"
        ))),
        _ => Ok(()),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

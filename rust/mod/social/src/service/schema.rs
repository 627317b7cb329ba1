use socialrecipe_sql::SQLStore;
use tracing::debug;

use crate::service::SocialError;

/// Initialize the SQLite schema for all social resources.
///
/// Uniqueness of every relationship is a primary key, so duplicate requests
/// racing each other are rejected by the store itself.
pub fn init_schema(sql: &dyn SQLStore) -> Result<(), SocialError> {
    let statements = [
        // Users: identity, profile body, denormalized follow counters
        "CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            username TEXT NOT NULL UNIQUE COLLATE NOCASE,
            name TEXT NOT NULL,
            username_folded TEXT NOT NULL,
            name_folded TEXT NOT NULL,
            password_hash TEXT NOT NULL,
            follower_count INTEGER NOT NULL DEFAULT 0 CHECK (follower_count >= 0),
            following_count INTEGER NOT NULL DEFAULT 0 CHECK (following_count >= 0),
            data TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS idx_users_created ON users(created_at)",

        // Recipes: authored content with a denormalized like counter
        "CREATE TABLE IF NOT EXISTS recipes (
            id TEXT PRIMARY KEY,
            author_id TEXT NOT NULL,
            recipe_name TEXT NOT NULL,
            recipe_name_folded TEXT NOT NULL,
            like_count INTEGER NOT NULL DEFAULT 0 CHECK (like_count >= 0),
            data TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (author_id) REFERENCES users(id)
        )",
        "CREATE INDEX IF NOT EXISTS idx_recipes_author ON recipes(author_id, created_at)",
        "CREATE INDEX IF NOT EXISTS idx_recipes_created ON recipes(created_at)",

        // Follow edges: one directed row per relationship, queried both ways
        "CREATE TABLE IF NOT EXISTS follow_edges (
            follower_id TEXT NOT NULL,
            followee_id TEXT NOT NULL,
            created_at TEXT NOT NULL,
            PRIMARY KEY (follower_id, followee_id),
            CHECK (follower_id <> followee_id),
            FOREIGN KEY (follower_id) REFERENCES users(id),
            FOREIGN KEY (followee_id) REFERENCES users(id)
        )",
        "CREATE INDEX IF NOT EXISTS idx_follow_edges_followee ON follow_edges(followee_id, created_at)",

        // Like ledger
        "CREATE TABLE IF NOT EXISTS like_facts (
            user_id TEXT NOT NULL,
            recipe_id TEXT NOT NULL,
            created_at TEXT NOT NULL,
            PRIMARY KEY (user_id, recipe_id),
            FOREIGN KEY (user_id) REFERENCES users(id),
            FOREIGN KEY (recipe_id) REFERENCES recipes(id) ON DELETE CASCADE
        )",
        "CREATE INDEX IF NOT EXISTS idx_like_facts_recipe ON like_facts(recipe_id, created_at)",

        // Favorites
        "CREATE TABLE IF NOT EXISTS favorite_facts (
            user_id TEXT NOT NULL,
            recipe_id TEXT NOT NULL,
            created_at TEXT NOT NULL,
            PRIMARY KEY (user_id, recipe_id),
            FOREIGN KEY (user_id) REFERENCES users(id),
            FOREIGN KEY (recipe_id) REFERENCES recipes(id) ON DELETE CASCADE
        )",
        "CREATE INDEX IF NOT EXISTS idx_favorite_facts_user ON favorite_facts(user_id, created_at)",
    ];

    for stmt in &statements {
        sql.exec(stmt, &[])?;
    }

    debug!("social schema ready ({} statements)", statements.len());
    Ok(())
}

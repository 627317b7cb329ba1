use serde::{Deserialize, Serialize};

use super::ImageRef;

/// A published recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: String,

    /// The user who published it.
    pub author_id: String,

    pub recipe_name: String,

    #[serde(default)]
    pub description: String,

    /// 1 (easy) to 5 (hard).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<u8>,

    #[serde(default)]
    pub procedure: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageRef>,

    /// Number of users who liked it. Maintained by the like ledger.
    #[serde(default)]
    pub like_count: u64,

    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewRecipe {
    pub recipe_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub difficulty: Option<u8>,
    #[serde(default)]
    pub procedure: String,
    #[serde(default)]
    pub image: Option<ImageRef>,
}

/// Partial recipe update. `None` and empty strings leave a field as is.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeUpdate {
    #[serde(default)]
    pub recipe_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub difficulty: Option<u8>,
    #[serde(default)]
    pub procedure: Option<String>,
    #[serde(default)]
    pub image: Option<ImageRef>,
}

#[derive(Debug, Clone)]
pub struct RecipeChange {
    pub recipe: Recipe,
    pub replaced_image: Option<ImageRef>,
}

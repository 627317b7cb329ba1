use serde::{Deserialize, Serialize};

/// `follower_id` follows `followee_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowEdge {
    pub follower_id: String,
    pub followee_id: String,
    pub created_at: String,
}

/// `user_id` liked `recipe_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeFact {
    pub user_id: String,
    pub recipe_id: String,
    pub created_at: String,
}

/// `user_id` saved `recipe_id` to their favorites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteFact {
    pub user_id: String,
    pub recipe_id: String,
    pub created_at: String,
}

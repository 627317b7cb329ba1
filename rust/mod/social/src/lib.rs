//! Social module: identity, follow graph, likes, favorites and feeds for
//! user-authored recipes.
//!
//! # Resources
//!
//! - **User**: identity and profile with follower/following counters
//! - **Recipe**: authored content with a like counter
//! - **FollowEdge**: directed follower to followee relationship
//! - **LikeFact** / **FavoriteFact**: at most one per (user, recipe)
//!
//! Every list operation returns a [`socialrecipe_core::Page`]: 7 records per
//! page for recipes, 10 for people.
//!
//! # Usage
//!
//! ```ignore
//! use social::{SocialModule, password::Argon2Hasher, service::SocialConfig};
//!
//! let module = SocialModule::new(sql, Arc::new(Argon2Hasher), SocialConfig::default())?;
//! let feed = module.service().compose_feed(&user_id, 1)?;
//! ```

pub mod model;
pub mod password;
pub mod service;

use std::sync::Arc;

use socialrecipe_sql::SQLStore;

use crate::password::PasswordHasher;
use crate::service::{SocialConfig, SocialService};

/// Owns the SocialService wired to its store.
pub struct SocialModule {
    service: Arc<SocialService>,
}

impl SocialModule {
    /// Create a new SocialModule, initializing the schema.
    pub fn new(
        sql: Arc<dyn SQLStore>,
        hasher: Arc<dyn PasswordHasher>,
        config: SocialConfig,
    ) -> Result<Self, socialrecipe_core::ServiceError> {
        let service = SocialService::new(sql, hasher, config)
            .map_err(socialrecipe_core::ServiceError::from)?;
        Ok(Self { service })
    }

    /// Get a reference to the underlying SocialService.
    pub fn service(&self) -> &Arc<SocialService> {
        &self.service
    }
}

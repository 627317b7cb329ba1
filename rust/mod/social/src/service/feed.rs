//! Recipe listings. The feed is composed at read time from the follow graph
//! in a single query; nothing is materialized per follower.

use socialrecipe_core::{Page, PageKind, PageRequest};
use socialrecipe_sql::{SQLTransaction, Value};
use tracing::debug;

use crate::model::Recipe;
use crate::service::{
    SocialError, SocialService, ensure_user, normalize_query, paginate, validate_id,
};

const NEWEST_FIRST: &str = "r.created_at DESC, r.rowid DESC";

impl SocialService {
    /// Recipes authored by anyone `user_id` follows, newest first.
    pub fn compose_feed(&self, user_id: &str, page: i64) -> Result<Page<Recipe>, SocialError> {
        validate_id("user", user_id)?;
        let request = PageRequest::new(page, PageKind::Recipes);

        let tx = self.sql.begin()?;
        ensure_user(&*tx, user_id)?;
        let result = paginate_recipes(
            tx,
            request,
            "FROM recipes r WHERE r.author_id IN \
             (SELECT e.followee_id FROM follow_edges e WHERE e.follower_id = ?1)",
            vec![Value::from(user_id)],
        )?;

        debug!(
            "feed for {} page {}/{}",
            user_id, result.page, result.total_pages
        );
        Ok(result)
    }

    /// Recipes published by one user, newest first.
    pub fn list_recipes_of_user(
        &self,
        user_id: &str,
        page: i64,
    ) -> Result<Page<Recipe>, SocialError> {
        validate_id("user", user_id)?;
        let request = PageRequest::new(page, PageKind::Recipes);

        let tx = self.sql.begin()?;
        ensure_user(&*tx, user_id)?;
        paginate_recipes(
            tx,
            request,
            "FROM recipes r WHERE r.author_id = ?1",
            vec![Value::from(user_id)],
        )
    }

    /// Every recipe, newest first.
    pub fn list_latest_recipes(&self, page: i64) -> Result<Page<Recipe>, SocialError> {
        let request = PageRequest::new(page, PageKind::Recipes);
        let tx = self.sql.begin()?;
        paginate_recipes(tx, request, "FROM recipes r", Vec::new())
    }

    /// Case-insensitive substring match on the recipe name.
    pub fn search_recipes(&self, query: &str, page: i64) -> Result<Page<Recipe>, SocialError> {
        let needle = normalize_query(query)?;
        let request = PageRequest::new(page, PageKind::Recipes);
        let tx = self.sql.begin()?;
        paginate_recipes(
            tx,
            request,
            "FROM recipes r WHERE instr(r.recipe_name_folded, ?1) > 0",
            vec![Value::Text(needle)],
        )
    }
}

/// Count and slice on `tx`, then commit.
fn paginate_recipes(
    tx: Box<dyn SQLTransaction + '_>,
    request: PageRequest,
    from_sql: &str,
    params: Vec<Value>,
) -> Result<Page<Recipe>, SocialError> {
    let result = paginate(&*tx, request, "r", from_sql, NEWEST_FIRST, params)?;
    tx.commit()?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::testing::{recipe, test_service, user};

    #[test]
    fn test_feed_empty_without_followees() {
        let svc = test_service();
        let alice = user(&svc, "alice");
        let bob = user(&svc, "bob");
        recipe(&svc, &bob, "Bread");

        let feed = svc.compose_feed(&alice.id, 1).unwrap();
        assert!(feed.records.is_empty());
        assert_eq!(feed.page, 1);
        assert_eq!(feed.total_pages, 1);
        assert!(!feed.has_next_page());
    }

    #[test]
    fn test_feed_contains_only_followed_authors() {
        let svc = test_service();
        let alice = user(&svc, "alice");
        let bob = user(&svc, "bob");
        let carol = user(&svc, "carol");
        let dave = user(&svc, "dave");

        svc.follow(&alice.id, &bob.id).unwrap();
        svc.follow(&alice.id, &carol.id).unwrap();

        let b1 = recipe(&svc, &bob, "Bread");
        let _d1 = recipe(&svc, &dave, "Donuts");
        let c1 = recipe(&svc, &carol, "Curry");
        let _a1 = recipe(&svc, &alice, "Apple pie");
        let b2 = recipe(&svc, &bob, "Bagels");

        let feed = svc.compose_feed(&alice.id, 1).unwrap();
        let ids: Vec<_> = feed.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec![b2.id.as_str(), c1.id.as_str(), b1.id.as_str()]);
    }

    #[test]
    fn test_feed_pages_are_disjoint_and_complete() {
        let svc = test_service();
        let alice = user(&svc, "alice");
        let bob = user(&svc, "bob");
        svc.follow(&alice.id, &bob.id).unwrap();
        let made: Vec<Recipe> = (0..15).map(|i| recipe(&svc, &bob, &format!("R{i}"))).collect();

        let mut seen = Vec::new();
        for page in 1..=3 {
            let p = svc.compose_feed(&alice.id, page).unwrap();
            assert_eq!(p.total_pages, 3);
            assert_eq!(p.has_next_page(), page < 3);
            seen.extend(p.records.into_iter().map(|r| r.id));
        }
        let expected: Vec<String> = made.iter().rev().map(|r| r.id.clone()).collect();
        assert_eq!(seen, expected);

        assert!(svc.compose_feed(&alice.id, 4).unwrap().records.is_empty());
    }

    #[test]
    fn test_feed_follows_unfollow() {
        let svc = test_service();
        let alice = user(&svc, "alice");
        let bob = user(&svc, "bob");
        recipe(&svc, &bob, "Bread");

        svc.follow(&alice.id, &bob.id).unwrap();
        assert_eq!(svc.compose_feed(&alice.id, 1).unwrap().records.len(), 1);
        svc.unfollow(&alice.id, &bob.id).unwrap();
        assert!(svc.compose_feed(&alice.id, 1).unwrap().records.is_empty());
    }

    #[test]
    fn test_feed_unknown_user() {
        let svc = test_service();
        assert!(matches!(svc.compose_feed("ghost", 1), Err(SocialError::NotFound(_))));
    }

    #[test]
    fn test_list_recipes_of_user() {
        let svc = test_service();
        let alice = user(&svc, "alice");
        let bob = user(&svc, "bob");
        let first = recipe(&svc, &alice, "First");
        recipe(&svc, &bob, "Other");
        let second = recipe(&svc, &alice, "Second");

        let page = svc.list_recipes_of_user(&alice.id, -5).unwrap();
        assert_eq!(page.page, 1);
        let ids: Vec<_> = page.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec![second.id.as_str(), first.id.as_str()]);
    }

    #[test]
    fn test_list_latest_recipes() {
        let svc = test_service();
        let alice = user(&svc, "alice");
        for i in 0..8 {
            recipe(&svc, &alice, &format!("Dish {i}"));
        }
        let first = svc.list_latest_recipes(1).unwrap();
        assert_eq!(first.records.len(), 7);
        assert_eq!(first.records[0].recipe_name, "Dish 7");
        assert!(first.has_next_page());

        let second = svc.list_latest_recipes(2).unwrap();
        assert_eq!(second.records.len(), 1);
        assert_eq!(second.records[0].recipe_name, "Dish 0");
    }

    #[test]
    fn test_search_recipes() {
        let svc = test_service();
        let alice = user(&svc, "alice");
        recipe(&svc, &alice, "Tomato Soup");
        recipe(&svc, &alice, "Bread");
        recipe(&svc, &alice, "soup of the day");

        let page = svc.search_recipes("SOUP", 1).unwrap();
        let names: Vec<_> = page.records.iter().map(|r| r.recipe_name.as_str()).collect();
        assert_eq!(names, vec!["soup of the day", "Tomato Soup"]);

        assert!(matches!(svc.search_recipes("", 1), Err(SocialError::InvalidArgument(_))));
    }

    #[test]
    fn test_search_recipes_folds_non_ascii() {
        let svc = test_service();
        let alice = user(&svc, "alice");
        let crepes = recipe(&svc, &alice, "Élan Crêpes");
        recipe(&svc, &alice, "Plain Pancakes");

        let page = svc.search_recipes("élan", 1).unwrap();
        let ids: Vec<_> = page.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec![crepes.id.as_str()]);
        assert_eq!(svc.search_recipes("CRÊPES", 1).unwrap().records.len(), 1);

        // Renaming refreshes the folded column.
        svc.update_recipe(
            &alice.id,
            &crepes.id,
            crate::model::RecipeUpdate {
                recipe_name: Some("Ölkuchen".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(svc.search_recipes("élan", 1).unwrap().records.is_empty());
        assert_eq!(svc.search_recipes("ölk", 1).unwrap().records.len(), 1);
    }

    #[test]
    fn test_huge_page_number_is_past_the_end() {
        let svc = test_service();
        let alice = user(&svc, "alice");
        let bob = user(&svc, "bob");
        svc.follow(&alice.id, &bob.id).unwrap();
        recipe(&svc, &bob, "Bread");

        for page in [1_500_000_000_000_000_000, i64::MAX] {
            let latest = svc.list_latest_recipes(page).unwrap();
            assert!(latest.records.is_empty(), "page {page}");
            assert_eq!(latest.page, page as usize);
            assert_eq!(latest.total_pages, 1);
            assert!(!latest.has_next_page());

            assert!(svc.compose_feed(&alice.id, page).unwrap().records.is_empty());
            assert!(svc.search_recipes("bread", page).unwrap().records.is_empty());
        }
    }

    #[test]
    fn test_feed_with_many_followees() {
        let svc = test_service();
        let alice = user(&svc, "alice");
        let mut newest = Vec::new();
        for i in 0..40 {
            let author = user(&svc, &format!("cook{i}"));
            svc.follow(&alice.id, &author.id).unwrap();
            newest.push(recipe(&svc, &author, &format!("Dish {i}")).id);
        }
        newest.reverse();

        let mut seen = Vec::new();
        let mut page = 1;
        loop {
            let p = svc.compose_feed(&alice.id, page).unwrap();
            assert_eq!(p.total_pages, 6);
            let has_next = p.has_next_page();
            seen.extend(p.records.into_iter().map(|r| r.id));
            if !has_next {
                break;
            }
            page += 1;
        }
        assert_eq!(seen, newest);
    }
}

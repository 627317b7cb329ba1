use socialrecipe_core::{Page, PageKind, PageRequest, now_rfc3339};
use socialrecipe_sql::{SQLExecutor, SQLError, Value};
use tracing::{debug, info};

use crate::model::{FollowEdge, User};
use crate::service::{
    SocialError, SocialService, ensure_user, normalize_query, paginate, row_exists, validate_id,
};

impl SocialService {
    /// Create a follow edge and bump both counters in one transaction.
    pub fn follow(&self, follower_id: &str, followee_id: &str) -> Result<FollowEdge, SocialError> {
        validate_id("user", follower_id)?;
        validate_id("user", followee_id)?;
        if follower_id == followee_id {
            return Err(SocialError::InvalidArgument("a user cannot follow themselves".into()));
        }

        let tx = self.sql.begin()?;
        ensure_user(&*tx, follower_id)?;
        ensure_user(&*tx, followee_id)?;

        let edge = FollowEdge {
            follower_id: follower_id.to_string(),
            followee_id: followee_id.to_string(),
            created_at: now_rfc3339(),
        };
        tx.exec(
            "INSERT INTO follow_edges (follower_id, followee_id, created_at) VALUES (?1, ?2, ?3)",
            &[
                Value::from(follower_id),
                Value::from(followee_id),
                Value::Text(edge.created_at.clone()),
            ],
        )
        .map_err(|e| match e {
            SQLError::UniqueViolation(_) => {
                SocialError::AlreadyExists(format!("{follower_id} already follows {followee_id}"))
            }
            other => other.into(),
        })?;

        tx.exec(
            "UPDATE users SET following_count = following_count + 1 WHERE id = ?1",
            &[Value::from(follower_id)],
        )?;
        tx.exec(
            "UPDATE users SET follower_count = follower_count + 1 WHERE id = ?1",
            &[Value::from(followee_id)],
        )?;
        tx.commit()?;

        info!("{} followed {}", follower_id, followee_id);
        Ok(edge)
    }

    /// Remove a follow edge. Counters are decremented but never below zero.
    pub fn unfollow(&self, follower_id: &str, followee_id: &str) -> Result<(), SocialError> {
        validate_id("user", follower_id)?;
        validate_id("user", followee_id)?;

        let tx = self.sql.begin()?;
        let removed = tx.exec(
            "DELETE FROM follow_edges WHERE follower_id = ?1 AND followee_id = ?2",
            &[Value::from(follower_id), Value::from(followee_id)],
        )?;
        if removed == 0 {
            return Err(SocialError::NotFound(format!(
                "{follower_id} does not follow {followee_id}"
            )));
        }

        tx.exec(
            "UPDATE users SET following_count = MAX(following_count - 1, 0) WHERE id = ?1",
            &[Value::from(follower_id)],
        )?;
        tx.exec(
            "UPDATE users SET follower_count = MAX(follower_count - 1, 0) WHERE id = ?1",
            &[Value::from(followee_id)],
        )?;
        tx.commit()?;

        info!("{} unfollowed {}", follower_id, followee_id);
        Ok(())
    }

    pub fn is_following(&self, follower_id: &str, followee_id: &str) -> Result<bool, SocialError> {
        validate_id("user", follower_id)?;
        validate_id("user", followee_id)?;
        row_exists(
            self.sql.as_ref(),
            "SELECT 1 FROM follow_edges WHERE follower_id = ?1 AND followee_id = ?2",
            &[Value::from(follower_id), Value::from(followee_id)],
        )
    }

    /// Ids of everyone `user_id` follows, most recent first.
    pub fn followee_ids(&self, user_id: &str) -> Result<Vec<String>, SocialError> {
        validate_id("user", user_id)?;
        followees_of(self.sql.as_ref(), user_id)
    }

    /// Users following `user_id`, most recent follow first.
    pub fn list_followers(&self, user_id: &str, page: i64) -> Result<Page<User>, SocialError> {
        validate_id("user", user_id)?;
        let request = PageRequest::new(page, PageKind::People);

        let tx = self.sql.begin()?;
        ensure_user(&*tx, user_id)?;
        let result = paginate(
            &*tx,
            request,
            "u",
            "FROM follow_edges e JOIN users u ON u.id = e.follower_id WHERE e.followee_id = ?1",
            "e.created_at DESC, e.rowid DESC",
            vec![Value::from(user_id)],
        )?;
        tx.commit()?;
        Ok(result)
    }

    /// Users `user_id` follows, most recent follow first.
    pub fn list_following(&self, user_id: &str, page: i64) -> Result<Page<User>, SocialError> {
        validate_id("user", user_id)?;
        let request = PageRequest::new(page, PageKind::People);

        let tx = self.sql.begin()?;
        ensure_user(&*tx, user_id)?;
        let result = paginate(
            &*tx,
            request,
            "u",
            "FROM follow_edges e JOIN users u ON u.id = e.followee_id WHERE e.follower_id = ?1",
            "e.created_at DESC, e.rowid DESC",
            vec![Value::from(user_id)],
        )?;
        tx.commit()?;
        Ok(result)
    }

    /// Case-insensitive substring match on username and display name.
    /// The caller never appears in their own results.
    pub fn search_users(
        &self,
        caller_id: &str,
        query: &str,
        page: i64,
    ) -> Result<Page<User>, SocialError> {
        validate_id("user", caller_id)?;
        let needle = normalize_query(query)?;
        let request = PageRequest::new(page, PageKind::People);

        let tx = self.sql.begin()?;
        let result = paginate(
            &*tx,
            request,
            "u",
            "FROM users u WHERE u.id <> ?1 \
             AND (instr(u.username_folded, ?2) > 0 OR instr(u.name_folded, ?2) > 0)",
            "u.created_at DESC, u.rowid DESC",
            vec![Value::from(caller_id), Value::Text(needle)],
        )?;
        tx.commit()?;

        debug!("user search {:?} matched {} page(s)", query, result.total_pages);
        Ok(result)
    }
}

pub(crate) fn followees_of<E: SQLExecutor + ?Sized>(
    db: &E,
    user_id: &str,
) -> Result<Vec<String>, SocialError> {
    let rows = db.query(
        "SELECT followee_id FROM follow_edges WHERE follower_id = ?1 \
         ORDER BY created_at DESC, rowid DESC",
        &[Value::from(user_id)],
    )?;
    Ok(rows
        .iter()
        .filter_map(|r| r.get_str("followee_id").map(str::to_string))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::testing::{test_service, user};

    #[test]
    fn test_follow_updates_counters() {
        let svc = test_service();
        let alice = user(&svc, "alice");
        let bob = user(&svc, "bob");

        let edge = svc.follow(&alice.id, &bob.id).unwrap();
        assert_eq!(edge.follower_id, alice.id);
        assert!(svc.is_following(&alice.id, &bob.id).unwrap());
        assert!(!svc.is_following(&bob.id, &alice.id).unwrap());

        assert_eq!(svc.get_user(&alice.id).unwrap().following_count, 1);
        assert_eq!(svc.get_user(&bob.id).unwrap().follower_count, 1);
        assert_eq!(svc.get_user(&bob.id).unwrap().following_count, 0);
    }

    #[test]
    fn test_follow_twice_is_already_exists() {
        let svc = test_service();
        let alice = user(&svc, "alice");
        let bob = user(&svc, "bob");

        svc.follow(&alice.id, &bob.id).unwrap();
        let err = svc.follow(&alice.id, &bob.id).unwrap_err();
        assert!(matches!(err, SocialError::AlreadyExists(_)));

        // The rejected attempt left the counters alone.
        assert_eq!(svc.get_user(&bob.id).unwrap().follower_count, 1);
        assert_eq!(svc.get_user(&alice.id).unwrap().following_count, 1);
    }

    #[test]
    fn test_follow_rejects_self_and_unknown() {
        let svc = test_service();
        let alice = user(&svc, "alice");

        assert!(matches!(
            svc.follow(&alice.id, &alice.id),
            Err(SocialError::InvalidArgument(_))
        ));
        assert!(matches!(
            svc.follow(&alice.id, "ghost"),
            Err(SocialError::NotFound(_))
        ));
        assert!(matches!(
            svc.follow("ghost", &alice.id),
            Err(SocialError::NotFound(_))
        ));
        assert_eq!(svc.get_user(&alice.id).unwrap().following_count, 0);
    }

    #[test]
    fn test_unfollow() {
        let svc = test_service();
        let alice = user(&svc, "alice");
        let bob = user(&svc, "bob");

        assert!(matches!(
            svc.unfollow(&alice.id, &bob.id),
            Err(SocialError::NotFound(_))
        ));

        svc.follow(&alice.id, &bob.id).unwrap();
        svc.unfollow(&alice.id, &bob.id).unwrap();
        assert!(!svc.is_following(&alice.id, &bob.id).unwrap());
        assert_eq!(svc.get_user(&alice.id).unwrap().following_count, 0);
        assert_eq!(svc.get_user(&bob.id).unwrap().follower_count, 0);

        // Can follow again after unfollowing.
        svc.follow(&alice.id, &bob.id).unwrap();
        assert_eq!(svc.get_user(&bob.id).unwrap().follower_count, 1);
    }

    #[test]
    fn test_unfollow_floors_counters_at_zero() {
        let svc = test_service();
        let alice = user(&svc, "alice");
        let bob = user(&svc, "bob");
        svc.follow(&alice.id, &bob.id).unwrap();

        // Simulate drift: counters already zero while the edge exists.
        svc.sql
            .exec("UPDATE users SET follower_count = 0, following_count = 0", &[])
            .unwrap();
        svc.unfollow(&alice.id, &bob.id).unwrap();
        assert_eq!(svc.get_user(&alice.id).unwrap().following_count, 0);
        assert_eq!(svc.get_user(&bob.id).unwrap().follower_count, 0);
    }

    #[test]
    fn test_list_followers_most_recent_first() {
        let svc = test_service();
        let star = user(&svc, "star");
        let fans: Vec<User> = (0..12).map(|i| user(&svc, &format!("fan{i:02}"))).collect();
        for fan in &fans {
            svc.follow(&fan.id, &star.id).unwrap();
        }

        let first = svc.list_followers(&star.id, 1).unwrap();
        assert_eq!(first.records.len(), 10);
        assert_eq!(first.total_pages, 2);
        assert!(first.has_next_page());
        assert_eq!(first.records[0].id, fans[11].id);
        assert_eq!(first.records[9].id, fans[2].id);

        let second = svc.list_followers(&star.id, 2).unwrap();
        assert_eq!(second.records.len(), 2);
        assert!(!second.has_next_page());
        assert_eq!(second.records[1].id, fans[0].id);

        // Followers carry the authoritative counters.
        assert_eq!(second.records[1].following_count, 1);

        let past_end = svc.list_followers(&star.id, 3).unwrap();
        assert!(past_end.records.is_empty());
        assert_eq!(past_end.total_pages, 2);
    }

    #[test]
    fn test_list_following() {
        let svc = test_service();
        let alice = user(&svc, "alice");
        let bob = user(&svc, "bob");
        let carol = user(&svc, "carol");
        svc.follow(&alice.id, &bob.id).unwrap();
        svc.follow(&alice.id, &carol.id).unwrap();

        let page = svc.list_following(&alice.id, 0).unwrap();
        assert_eq!(page.page, 1);
        let ids: Vec<_> = page.records.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec![carol.id.as_str(), bob.id.as_str()]);
        assert_eq!(
            svc.followee_ids(&alice.id).unwrap(),
            vec![carol.id.clone(), bob.id.clone()]
        );

        let empty = svc.list_following(&bob.id, 1).unwrap();
        assert!(empty.records.is_empty());
        assert_eq!(empty.total_pages, 1);

        assert!(matches!(
            svc.list_following("ghost", 1),
            Err(SocialError::NotFound(_))
        ));
    }

    #[test]
    fn test_search_users() {
        let svc = test_service();
        let ann = user(&svc, "ann");
        let joanna = user(&svc, "joanna");
        let _bob = user(&svc, "bob");
        let hannah = user(&svc, "HANNAH");

        let page = svc.search_users(&ann.id, "AnN", 1).unwrap();
        let ids: Vec<_> = page.records.iter().map(|u| u.id.clone()).collect();
        assert_eq!(ids, vec![hannah.id.clone(), joanna.id.clone()]);

        // Display names match too ("bob display").
        let by_name = svc.search_users(&ann.id, "display", 1).unwrap();
        assert_eq!(by_name.records.len(), 3);

        assert!(matches!(
            svc.search_users(&ann.id, "  ", 1),
            Err(SocialError::InvalidArgument(_))
        ));
        assert!(svc.search_users(&ann.id, "zzz", 1).unwrap().records.is_empty());
    }

    #[test]
    fn test_search_users_folds_non_ascii() {
        let svc = test_service();
        let ann = user(&svc, "ann");
        let arger = user(&svc, "Ärger");
        user(&svc, "zoë");

        let page = svc.search_users(&ann.id, "ärg", 1).unwrap();
        let ids: Vec<_> = page.records.iter().map(|u| u.id.clone()).collect();
        assert_eq!(ids, vec![arger.id.clone()]);
        assert_eq!(svc.search_users(&ann.id, "ZOË", 1).unwrap().records.len(), 1);

        // A profile edit refreshes the folded columns.
        svc.update_profile(
            &arger.id,
            crate::model::ProfileUpdate {
                name: Some("Émile".into()),
                username: Some("emile".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(svc.search_users(&ann.id, "ärg", 1).unwrap().records.is_empty());
        let by_name = svc.search_users(&ann.id, "ÉMI", 1).unwrap();
        assert_eq!(by_name.records.len(), 1);
        assert_eq!(by_name.records[0].id, arger.id);
    }
}

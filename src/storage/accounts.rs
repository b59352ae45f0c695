//! Account, quota and history store
//!
//! Users carry a per-UTC-day query counter that resets on the first check of
//! a new day; subscribers bypass it. Guests only have a lifetime counter.
//!
//! The `try_reserve_*` operations check and count in one statement, so
//! overlapping queries cannot both pass the last free slot. A reservation for
//! a query that then fails is handed back with `release_*`.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::database::SharedDatabase;
use crate::types::{AnalysisResult, NarraError, Result};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub is_subscriber: bool,
    /// Queries counted on `last_query_date`
    pub query_count: u32,
    pub last_query_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAnalysis {
    pub id: String,
    pub user_id: String,
    pub query: String,
    pub result: AnalysisResult,
    pub created_at: DateTime<Utc>,
}

/// Persistence for accounts, usage counters and analysis history
pub trait AccountStore: Send + Sync {
    fn get_user(&self, user_id: &str) -> Result<Option<User>>;

    fn create_user(&self, email: &str) -> Result<User>;

    /// Count one query against today's allowance
    fn increment_query_count(&self, user_id: &str) -> Result<()> {
        self.increment_query_count_on(user_id, Utc::now().date_naive())
    }

    fn increment_query_count_on(&self, user_id: &str, today: NaiveDate) -> Result<()>;

    /// Subscriber, first query of a new UTC day, or under `daily_limit`.
    fn can_perform_query(&self, user_id: &str, daily_limit: u32) -> Result<bool> {
        self.can_perform_query_on(user_id, daily_limit, Utc::now().date_naive())
    }

    fn can_perform_query_on(&self, user_id: &str, daily_limit: u32, today: NaiveDate)
    -> Result<bool>;

    /// Count one query if the user may run it. `false` when over the limit.
    fn try_reserve_query_on(&self, user_id: &str, daily_limit: u32, today: NaiveDate)
    -> Result<bool>;

    /// Hand back a reservation taken on `today`
    fn release_query_on(&self, user_id: &str, today: NaiveDate) -> Result<()>;

    fn save_analysis(
        &self,
        user_id: &str,
        query: &str,
        result: &AnalysisResult,
    ) -> Result<UserAnalysis>;

    /// Newest first
    fn get_user_analyses(&self, user_id: &str) -> Result<Vec<UserAnalysis>>;

    fn upgrade_to_subscriber(&self, user_id: &str) -> Result<()>;

    fn guest_query_count(&self, guest_id: &str) -> Result<u32>;

    /// Returns the new count
    fn increment_guest_query_count(&self, guest_id: &str) -> Result<u32>;

    /// Count one guest query if fewer than `limit` were used
    fn try_reserve_guest_query(&self, guest_id: &str, limit: u32) -> Result<bool>;

    fn release_guest_query(&self, guest_id: &str) -> Result<()>;
}

/// SQLite-backed account store
pub struct SqliteAccountStore {
    db: SharedDatabase,
}

impl SqliteAccountStore {
    pub fn new(db: SharedDatabase) -> Self {
        Self { db }
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.db.connection()?;
        let user = conn
            .query_row(
                "SELECT id, email, created_at, is_subscriber, query_count, last_query_date
                 FROM users WHERE email = ?1",
                params![email.trim().to_lowercase()],
                map_user,
            )
            .optional()?;
        Ok(user)
    }

    fn require_user(&self, user_id: &str) -> Result<User> {
        self.get_user(user_id)?
            .ok_or_else(|| NarraError::NotFound(format!("user {}", user_id)))
    }
}

impl AccountStore for SqliteAccountStore {
    fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        let conn = self.db.connection()?;
        let user = conn
            .query_row(
                "SELECT id, email, created_at, is_subscriber, query_count, last_query_date
                 FROM users WHERE id = ?1",
                params![user_id],
                map_user,
            )
            .optional()?;
        Ok(user)
    }

    fn create_user(&self, email: &str) -> Result<User> {
        let email = email.trim().to_lowercase();
        if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
            return Err(NarraError::Config(format!(
                "Invalid email address: {}",
                email
            )));
        }
        if self.find_user_by_email(&email)?.is_some() {
            return Err(NarraError::Storage(format!(
                "A user with email {} already exists",
                email
            )));
        }

        let user = User {
            id: Uuid::new_v4().to_string(),
            email,
            created_at: Utc::now(),
            is_subscriber: false,
            query_count: 0,
            last_query_date: None,
        };

        self.db.execute(
            "INSERT INTO users (id, email, created_at, is_subscriber, query_count, last_query_date)
             VALUES (?1, ?2, ?3, 0, 0, NULL)",
            &[&user.id, &user.email, &timestamp(&user.created_at)],
        )?;

        info!("Created user {}", user.id);
        Ok(user)
    }

    fn increment_query_count_on(&self, user_id: &str, today: NaiveDate) -> Result<()> {
        let today = today.format(DATE_FORMAT).to_string();
        let updated = self.db.execute(
            "UPDATE users
             SET query_count = CASE WHEN last_query_date = ?2 THEN query_count + 1 ELSE 1 END,
                 last_query_date = ?2
             WHERE id = ?1",
            &[&user_id, &today],
        )?;

        if updated == 0 {
            return Err(NarraError::NotFound(format!("user {}", user_id)));
        }
        Ok(())
    }

    fn can_perform_query_on(
        &self,
        user_id: &str,
        daily_limit: u32,
        today: NaiveDate,
    ) -> Result<bool> {
        let user = self.require_user(user_id)?;

        if user.is_subscriber {
            return Ok(true);
        }

        if user.last_query_date != Some(today) {
            debug!("New UTC day for user {}, resetting query count", user_id);
            self.db.execute(
                "UPDATE users SET query_count = 0, last_query_date = ?2 WHERE id = ?1",
                &[&user_id, &today.format(DATE_FORMAT).to_string()],
            )?;
            return Ok(true);
        }

        Ok(user.query_count < daily_limit)
    }

    fn try_reserve_query_on(
        &self,
        user_id: &str,
        daily_limit: u32,
        today: NaiveDate,
    ) -> Result<bool> {
        let today = today.format(DATE_FORMAT).to_string();
        let updated = self.db.execute(
            "UPDATE users
             SET query_count = CASE WHEN last_query_date = ?2 THEN query_count + 1 ELSE 1 END,
                 last_query_date = ?2
             WHERE id = ?1
               AND (is_subscriber = 1
                    OR last_query_date IS NULL
                    OR last_query_date <> ?2
                    OR query_count < ?3)",
            &[&user_id, &today, &daily_limit],
        )?;

        if updated == 0 {
            self.require_user(user_id)?;
            return Ok(false);
        }
        Ok(true)
    }

    fn release_query_on(&self, user_id: &str, today: NaiveDate) -> Result<()> {
        self.db.execute(
            "UPDATE users SET query_count = query_count - 1
             WHERE id = ?1 AND last_query_date = ?2 AND query_count > 0",
            &[&user_id, &today.format(DATE_FORMAT).to_string()],
        )?;
        Ok(())
    }

    fn save_analysis(
        &self,
        user_id: &str,
        query: &str,
        result: &AnalysisResult,
    ) -> Result<UserAnalysis> {
        let analysis = UserAnalysis {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            query: query.to_string(),
            result: result.clone(),
            created_at: Utc::now(),
        };
        let result_json = serde_json::to_string(&analysis.result)?;

        self.db.execute(
            "INSERT INTO user_analyses (id, user_id, query, result_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            &[
                &analysis.id,
                &analysis.user_id,
                &analysis.query,
                &result_json,
                &timestamp(&analysis.created_at),
            ],
        )?;

        debug!("Saved analysis {} for user {}", analysis.id, user_id);
        Ok(analysis)
    }

    fn get_user_analyses(&self, user_id: &str) -> Result<Vec<UserAnalysis>> {
        let conn = self.db.connection()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, query, result_json, created_at
             FROM user_analyses
             WHERE user_id = ?1
             ORDER BY created_at DESC, rowid DESC",
        )?;

        let analyses = stmt
            .query_map(params![user_id], map_analysis)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(analyses)
    }

    fn upgrade_to_subscriber(&self, user_id: &str) -> Result<()> {
        let updated = self.db.execute(
            "UPDATE users SET is_subscriber = 1 WHERE id = ?1",
            &[&user_id],
        )?;
        if updated == 0 {
            return Err(NarraError::NotFound(format!("user {}", user_id)));
        }
        info!("User {} upgraded to subscriber", user_id);
        Ok(())
    }

    fn guest_query_count(&self, guest_id: &str) -> Result<u32> {
        let conn = self.db.connection()?;
        let count = conn
            .query_row(
                "SELECT query_count FROM guest_usage WHERE guest_id = ?1",
                params![guest_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(count.unwrap_or(0))
    }

    fn increment_guest_query_count(&self, guest_id: &str) -> Result<u32> {
        let guest_id = guest_id.to_string();
        let now = timestamp(&Utc::now());
        self.db.transaction(move |conn| {
            conn.execute(
                "INSERT INTO guest_usage (guest_id, query_count, updated_at) VALUES (?1, 1, ?2)
                 ON CONFLICT(guest_id) DO UPDATE
                 SET query_count = query_count + 1, updated_at = excluded.updated_at",
                params![guest_id, now],
            )?;
            let count = conn.query_row(
                "SELECT query_count FROM guest_usage WHERE guest_id = ?1",
                params![guest_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    fn try_reserve_guest_query(&self, guest_id: &str, limit: u32) -> Result<bool> {
        if limit == 0 {
            return Ok(false);
        }
        let now = timestamp(&Utc::now());
        let updated = self.db.execute(
            "INSERT INTO guest_usage (guest_id, query_count, updated_at) VALUES (?1, 1, ?2)
             ON CONFLICT(guest_id) DO UPDATE
             SET query_count = query_count + 1, updated_at = excluded.updated_at
             WHERE guest_usage.query_count < ?3",
            &[&guest_id, &now, &limit],
        )?;
        Ok(updated > 0)
    }

    fn release_guest_query(&self, guest_id: &str) -> Result<()> {
        self.db.execute(
            "UPDATE guest_usage SET query_count = query_count - 1
             WHERE guest_id = ?1 AND query_count > 0",
            &[&guest_id],
        )?;
        Ok(())
    }
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
}

fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<User> {
    let created_at: String = row.get(2)?;
    let last_query_date: Option<String> = row.get(5)?;

    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        created_at: parse_timestamp(2, &created_at)?,
        is_subscriber: row.get(3)?,
        query_count: row.get(4)?,
        last_query_date: last_query_date
            .map(|d| NaiveDate::parse_from_str(&d, DATE_FORMAT).map_err(|e| conversion_error(5, e)))
            .transpose()?,
    })
}

fn map_analysis(row: &Row<'_>) -> rusqlite::Result<UserAnalysis> {
    let result_json: String = row.get(3)?;
    let created_at: String = row.get(4)?;

    Ok(UserAnalysis {
        id: row.get(0)?,
        user_id: row.get(1)?,
        query: row.get(2)?,
        result: serde_json::from_str(&result_json).map_err(|e| conversion_error(3, e))?,
        created_at: parse_timestamp(4, &created_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;
    use std::sync::Arc;

    fn store() -> SqliteAccountStore {
        SqliteAccountStore::new(Arc::new(Database::open_in_memory().unwrap()))
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    #[test]
    fn test_create_and_get_user() {
        let store = store();
        let user = store.create_user("  Reader@Example.com ").unwrap();
        assert_eq!(user.email, "reader@example.com");
        assert!(!user.is_subscriber);

        let loaded = store.get_user(&user.id).unwrap().unwrap();
        assert_eq!(loaded.email, user.email);
        assert_eq!(loaded.query_count, 0);
        assert!(store.get_user("missing").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_and_invalid_email_rejected() {
        let store = store();
        store.create_user("a@example.com").unwrap();
        assert!(store.create_user("A@example.com").is_err());
        assert!(store.create_user("not-an-email").is_err());
    }

    #[test]
    fn test_daily_limit_within_one_day() {
        let store = store();
        let user = store.create_user("a@example.com").unwrap();

        // first check of the day resets and allows
        assert!(store.can_perform_query_on(&user.id, 3, day(1)).unwrap());
        for _ in 0..3 {
            store.increment_query_count_on(&user.id, day(1)).unwrap();
        }
        assert!(!store.can_perform_query_on(&user.id, 3, day(1)).unwrap());
        assert_eq!(store.get_user(&user.id).unwrap().unwrap().query_count, 3);
    }

    #[test]
    fn test_new_day_resets_counter() {
        let store = store();
        let user = store.create_user("a@example.com").unwrap();
        for _ in 0..3 {
            store.increment_query_count_on(&user.id, day(1)).unwrap();
        }
        assert!(!store.can_perform_query_on(&user.id, 3, day(1)).unwrap());

        assert!(store.can_perform_query_on(&user.id, 3, day(2)).unwrap());
        let reset = store.get_user(&user.id).unwrap().unwrap();
        assert_eq!(reset.query_count, 0);
        assert_eq!(reset.last_query_date, Some(day(2)));
    }

    #[test]
    fn test_increment_on_new_day_starts_at_one() {
        let store = store();
        let user = store.create_user("a@example.com").unwrap();
        store.increment_query_count_on(&user.id, day(1)).unwrap();
        store.increment_query_count_on(&user.id, day(1)).unwrap();
        store.increment_query_count_on(&user.id, day(2)).unwrap();
        assert_eq!(store.get_user(&user.id).unwrap().unwrap().query_count, 1);
    }

    #[test]
    fn test_subscriber_bypasses_limit() {
        let store = store();
        let user = store.create_user("a@example.com").unwrap();
        for _ in 0..10 {
            store.increment_query_count_on(&user.id, day(1)).unwrap();
        }
        store.upgrade_to_subscriber(&user.id).unwrap();
        assert!(store.can_perform_query_on(&user.id, 3, day(1)).unwrap());
        assert!(store.get_user(&user.id).unwrap().unwrap().is_subscriber);
    }

    #[test]
    fn test_unknown_user_operations() {
        let store = store();
        assert!(matches!(
            store.can_perform_query("ghost", 3),
            Err(NarraError::NotFound(_))
        ));
        assert!(matches!(
            store.upgrade_to_subscriber("ghost"),
            Err(NarraError::NotFound(_))
        ));
        assert!(matches!(
            store.increment_query_count("ghost"),
            Err(NarraError::NotFound(_))
        ));
    }

    #[test]
    fn test_history_newest_first() {
        let store = store();
        let user = store.create_user("a@example.com").unwrap();
        let first = AnalysisResult {
            overall_summary: "first".to_string(),
            ..Default::default()
        };
        let second = AnalysisResult {
            overall_summary: "second".to_string(),
            key_themes: vec!["t".to_string()],
            ..Default::default()
        };

        store.save_analysis(&user.id, "q1", &first).unwrap();
        let saved = store.save_analysis(&user.id, "q2", &second).unwrap();

        let history = store.get_user_analyses(&user.id).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, saved.id);
        assert_eq!(history[0].query, "q2");
        assert_eq!(history[0].result, second);
        assert_eq!(history[1].result, first);
        assert!(store.get_user_analyses("other").unwrap().is_empty());
    }

    #[test]
    fn test_guest_counter() {
        let store = store();
        assert_eq!(store.guest_query_count("g1").unwrap(), 0);
        assert_eq!(store.increment_guest_query_count("g1").unwrap(), 1);
        assert_eq!(store.increment_guest_query_count("g1").unwrap(), 2);
        assert_eq!(store.guest_query_count("g1").unwrap(), 2);
        assert_eq!(store.guest_query_count("g2").unwrap(), 0);
    }

    #[test]
    fn test_reserve_stops_at_daily_limit() {
        let store = store();
        let user = store.create_user("a@example.com").unwrap();

        assert!(store.try_reserve_query_on(&user.id, 2, day(1)).unwrap());
        assert!(store.try_reserve_query_on(&user.id, 2, day(1)).unwrap());
        assert!(!store.try_reserve_query_on(&user.id, 2, day(1)).unwrap());
        assert_eq!(store.get_user(&user.id).unwrap().unwrap().query_count, 2);

        store.release_query_on(&user.id, day(1)).unwrap();
        assert!(store.try_reserve_query_on(&user.id, 2, day(1)).unwrap());

        // new day starts over at one
        assert!(store.try_reserve_query_on(&user.id, 2, day(2)).unwrap());
        let user = store.get_user(&user.id).unwrap().unwrap();
        assert_eq!(user.query_count, 1);
        assert_eq!(user.last_query_date, Some(day(2)));
    }

    #[test]
    fn test_release_from_previous_day_is_ignored() {
        let store = store();
        let user = store.create_user("a@example.com").unwrap();
        store.try_reserve_query_on(&user.id, 3, day(2)).unwrap();
        store.release_query_on(&user.id, day(1)).unwrap();
        assert_eq!(store.get_user(&user.id).unwrap().unwrap().query_count, 1);
    }

    #[test]
    fn test_reserve_subscriber_and_unknown_user() {
        let store = store();
        let user = store.create_user("a@example.com").unwrap();
        store.upgrade_to_subscriber(&user.id).unwrap();
        for _ in 0..5 {
            assert!(store.try_reserve_query_on(&user.id, 1, day(1)).unwrap());
        }
        assert!(matches!(
            store.try_reserve_query_on("ghost", 3, day(1)),
            Err(NarraError::NotFound(_))
        ));
    }

    #[test]
    fn test_guest_reservation() {
        let store = store();
        assert!(!store.try_reserve_guest_query("g0", 0).unwrap());
        assert_eq!(store.guest_query_count("g0").unwrap(), 0);

        assert!(store.try_reserve_guest_query("g1", 2).unwrap());
        assert!(store.try_reserve_guest_query("g1", 2).unwrap());
        assert!(!store.try_reserve_guest_query("g1", 2).unwrap());
        assert_eq!(store.guest_query_count("g1").unwrap(), 2);

        store.release_guest_query("g1").unwrap();
        assert_eq!(store.guest_query_count("g1").unwrap(), 1);
        store.release_guest_query("unknown").unwrap();
    }
}

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::time::Duration;
use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::debug;
use crate::{
    error::Result,
    storage::models::{BalancePolicy, PointsStats, Scope, UserAccount},
};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// `last_updated` as written by older versions of the bot: local time, no offset.
const LEGACY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Outcome of [`PointsStore::adjust`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Adjustment {
    /// Delta after the balance policy; smaller in magnitude than requested
    /// when a deduction was clamped.
    pub applied: i64,
    pub balance: i64,
}

/// Points bookkeeping on a single `users` table.
///
/// Every call opens its own short-lived connection; callers that need a
/// read-decide-write sequence to be atomic must serialize it themselves
/// (the membership ledger does this by being the only writer).
#[derive(Debug, Clone)]
pub struct PointsStore {
    path: PathBuf,
    policy: BalancePolicy,
}

impl PointsStore {
    pub fn open(path: impl AsRef<Path>, policy: BalancePolicy) -> Result<Self> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
            policy,
        };
        store.init_schema()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn policy(&self) -> BalancePolicy {
        self.policy
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY,
                points INTEGER NOT NULL DEFAULT 0,
                last_updated TEXT,
                group_member BOOLEAN NOT NULL DEFAULT FALSE,
                channel_member BOOLEAN NOT NULL DEFAULT FALSE
            )",
            [],
        )?;
        Ok(())
    }

    /// Inserts a zero-balance row for `user_id` if none exists yet.
    pub fn ensure_account(&self, user_id: i64) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT OR IGNORE INTO users (id, points, last_updated) VALUES (?1, 0, ?2)",
            params![user_id, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Adds `delta` to the user's balance and sets the scope's membership
    /// flag to `delta > 0`. Returns the new balance.
    pub fn apply_delta(&self, user_id: i64, delta: i64, scope: Scope) -> Result<i64> {
        Ok(self.adjust(user_id, delta, scope)?.balance)
    }

    /// Same as [`PointsStore::apply_delta`], also reporting how much was
    /// actually applied.
    ///
    /// The whole update runs in one immediate transaction. Under
    /// [`BalancePolicy::FloorAtZero`] a deduction is clamped so the balance
    /// stays non-negative.
    pub fn adjust(&self, user_id: i64, delta: i64, scope: Scope) -> Result<Adjustment> {
        let mut conn = self.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let now = Utc::now().to_rfc3339();

        tx.execute(
            "INSERT OR IGNORE INTO users (id, points, last_updated) VALUES (?1, 0, ?2)",
            params![user_id, now],
        )?;

        let balance: i64 = tx.query_row(
            "SELECT points FROM users WHERE id = ?1",
            [user_id],
            |row| row.get(0),
        )?;
        let applied = self.policy.effective_delta(balance, delta);

        let sql = format!(
            "UPDATE users SET points = points + ?1, last_updated = ?2, {} = ?3 WHERE id = ?4",
            scope.column()
        );
        tx.execute(&sql, params![applied, now, delta > 0, user_id])?;
        tx.commit()?;

        let new_balance = balance + applied;
        debug!(user_id, delta, applied, new_balance, %scope, "Applied points delta");
        Ok(Adjustment {
            applied,
            balance: new_balance,
        })
    }

    /// Stored membership flag for the scope; false for unknown users.
    pub fn get_membership(&self, user_id: i64, scope: Scope) -> Result<bool> {
        let conn = self.connect()?;
        let sql = format!("SELECT {} FROM users WHERE id = ?1", scope.column());
        let member: Option<bool> = conn
            .query_row(&sql, [user_id], |row| row.get(0))
            .optional()?;
        Ok(member.unwrap_or(false))
    }

    pub fn get_account(&self, user_id: i64) -> Result<Option<UserAccount>> {
        let conn = self.connect()?;
        let account = conn
            .query_row(
                "SELECT id, points, last_updated, group_member, channel_member
                 FROM users
                 WHERE id = ?1",
                [user_id],
                |row| {
                    let last_updated: Option<String> = row.get(2)?;
                    Ok(UserAccount {
                        id: row.get(0)?,
                        points: row.get(1)?,
                        last_updated: parse_timestamp(last_updated.as_deref(), 2)?,
                        group_member: row.get(3)?,
                        channel_member: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(account)
    }

    pub fn stats(&self) -> Result<PointsStats> {
        let conn = self.connect()?;
        let (total_users, total_points, group_members, channel_members): (i64, i64, i64, i64) =
            conn.query_row(
                "SELECT COUNT(*),
                        COALESCE(SUM(points), 0),
                        COALESCE(SUM(group_member), 0),
                        COALESCE(SUM(channel_member), 0)
                 FROM users",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )?;

        Ok(PointsStats {
            total_users: total_users as usize,
            total_points,
            group_members: group_members as usize,
            channel_members: channel_members as usize,
        })
    }
}

fn parse_timestamp(raw: Option<&str>, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    let Some(raw) = raw else {
        return Ok(DateTime::<Utc>::UNIX_EPOCH);
    };
    if let Ok(timestamp) = raw.parse::<DateTime<Utc>>() {
        return Ok(timestamp);
    }
    NaiveDateTime::parse_from_str(raw, LEGACY_TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(policy: BalancePolicy) -> (TempDir, PointsStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = PointsStore::open(dir.path().join("points.db"), policy).unwrap();
        (dir, store)
    }

    #[test]
    fn test_ensure_account_creates_zero_balance() {
        let (_dir, store) = store(BalancePolicy::AllowNegative);

        assert!(store.get_account(42).unwrap().is_none());
        store.ensure_account(42).unwrap();
        store.ensure_account(42).unwrap();

        let account = store.get_account(42).unwrap().unwrap();
        assert_eq!(account.points, 0);
        assert!(!account.group_member);
        assert!(!account.channel_member);
    }

    #[test]
    fn test_first_delta_creates_account() {
        let (_dir, store) = store(BalancePolicy::AllowNegative);

        assert_eq!(store.apply_delta(7, 100, Scope::Group).unwrap(), 100);
        assert!(store.get_membership(7, Scope::Group).unwrap());
        assert!(!store.get_membership(7, Scope::Channel).unwrap());
    }

    #[test]
    fn test_repeated_award_accumulates() {
        let (_dir, store) = store(BalancePolicy::AllowNegative);

        store.apply_delta(7, 100, Scope::Group).unwrap();
        assert_eq!(store.apply_delta(7, 100, Scope::Group).unwrap(), 200);
        assert_eq!(store.get_account(7).unwrap().unwrap().points, 200);
    }

    #[test]
    fn test_negative_delta_clears_flag() {
        let (_dir, store) = store(BalancePolicy::AllowNegative);

        store.apply_delta(7, 100, Scope::Channel).unwrap();
        assert_eq!(store.apply_delta(7, -100, Scope::Channel).unwrap(), 0);
        assert!(!store.get_membership(7, Scope::Channel).unwrap());
    }

    #[test]
    fn test_balance_may_go_negative_by_default() {
        let (_dir, store) = store(BalancePolicy::AllowNegative);

        assert_eq!(store.apply_delta(7, -100, Scope::Group).unwrap(), -100);
    }

    #[test]
    fn test_floor_at_zero_policy() {
        let (_dir, store) = store(BalancePolicy::FloorAtZero);

        assert_eq!(store.apply_delta(7, -100, Scope::Group).unwrap(), 0);
        store.apply_delta(7, 50, Scope::Channel).unwrap();
        assert_eq!(store.apply_delta(7, -100, Scope::Channel).unwrap(), 0);
        assert!(!store.get_membership(7, Scope::Channel).unwrap());
    }

    #[test]
    fn test_adjust_reports_clamped_amount() {
        let (_dir, store) = store(BalancePolicy::FloorAtZero);

        store.apply_delta(7, 40, Scope::Group).unwrap();
        let adjustment = store.adjust(7, -100, Scope::Group).unwrap();
        assert_eq!(adjustment, Adjustment { applied: -40, balance: 0 });
    }

    #[test]
    fn test_reads_rows_with_naive_timestamps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user_data.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE users (
                id INTEGER PRIMARY KEY,
                points INTEGER DEFAULT 0,
                last_updated TEXT,
                group_member BOOLEAN DEFAULT FALSE,
                channel_member BOOLEAN DEFAULT FALSE
            );
            INSERT INTO users VALUES (5, 100, '2024-05-01 12:00:00.123456', 1, 0);
            INSERT INTO users VALUES (6, 0, '2024-05-02 08:30:00', 0, 0);",
        )
        .unwrap();
        drop(conn);

        let store = PointsStore::open(&path, BalancePolicy::AllowNegative).unwrap();

        let account = store.get_account(5).unwrap().unwrap();
        assert_eq!(account.points, 100);
        assert!(account.group_member);
        assert_eq!(
            account.last_updated.format("%Y-%m-%d %H:%M:%S%.6f").to_string(),
            "2024-05-01 12:00:00.123456"
        );
        assert!(store.get_account(6).unwrap().is_some());
    }

    #[test]
    fn test_rejects_garbage_timestamp() {
        let (_dir, store) = store(BalancePolicy::AllowNegative);
        store
            .connect()
            .unwrap()
            .execute(
                "INSERT INTO users (id, points, last_updated) VALUES (8, 0, 'yesterday')",
                [],
            )
            .unwrap();

        assert!(store.get_account(8).is_err());
    }

    #[test]
    fn test_unknown_user_is_not_member() {
        let (_dir, store) = store(BalancePolicy::AllowNegative);

        assert!(!store.get_membership(999, Scope::Group).unwrap());
        assert!(!store.get_membership(999, Scope::Channel).unwrap());
    }

    #[test]
    fn test_reopen_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("points.db");

        PointsStore::open(&path, BalancePolicy::AllowNegative)
            .unwrap()
            .apply_delta(1, 100, Scope::Group)
            .unwrap();

        let reopened = PointsStore::open(&path, BalancePolicy::AllowNegative).unwrap();
        assert_eq!(reopened.get_account(1).unwrap().unwrap().points, 100);
    }

    #[test]
    fn test_stats() {
        let (_dir, store) = store(BalancePolicy::AllowNegative);

        assert_eq!(store.stats().unwrap(), PointsStats::default());

        store.apply_delta(1, 100, Scope::Group).unwrap();
        store.apply_delta(1, 100, Scope::Channel).unwrap();
        store.apply_delta(2, 100, Scope::Channel).unwrap();
        store.apply_delta(2, -100, Scope::Channel).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.total_users, 2);
        assert_eq!(stats.total_points, 200);
        assert_eq!(stats.group_members, 1);
        assert_eq!(stats.channel_members, 1);
    }
}

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use rusqlite_migration::{Migrations, M};

use crate::app::{ListenError, Result};
use crate::domain::{
    Channel, ChannelFilter, ChannelUpdate, Content, ContentFilter, ContentState, ContentUpdate,
    Subscription, SubscriptionFilter, User, UserFilter,
};
use crate::store::Store;

const USER_COLUMNS: &str = "id, credit, name, created_at, updated_at";

const CHANNEL_COLUMNS: &str = "id, platform, name, description, owner_urls, thumbnails, \
     channel_credit, created_at, updated_at";

const SUBSCRIPTION_COLUMNS: &str = "id, user_credit, channel_credit, created_at, updated_at";

const CONTENT_COLUMNS: &str = "id, platform, channel_credit, title, thumbnail, content_credit, \
     state, info, published_at, duration_secs, path, created_at, updated_at";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.conn()?;

        conn.execute("PRAGMA foreign_keys = ON", [])?;
        migrations
            .to_latest(&mut conn)
            .map_err(|_| ListenError::Database(rusqlite::Error::InvalidQuery))?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            ListenError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })
    }

    #[cfg(test)]
    pub(crate) fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn()?.execute_batch(sql)?;
        Ok(())
    }

    fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| s.parse::<DateTime<Utc>>().ok())
    }

    /// Fixed-width timestamps so that text ordering matches time ordering.
    fn format_datetime(dt: &DateTime<Utc>) -> String {
        dt.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn datetime_column(row: &Row, idx: usize) -> DateTime<Utc> {
        row.get::<_, String>(idx)
            .ok()
            .and_then(|s| Self::parse_datetime(&s))
            .unwrap_or_else(Utc::now)
    }

    fn join_list(values: &[String]) -> String {
        values.join(",")
    }

    fn split_list(value: String) -> Vec<String> {
        value
            .split(',')
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }

    fn user_from_row(row: &Row) -> rusqlite::Result<User> {
        Ok(User {
            id: row.get(0)?,
            credit: row.get(1)?,
            name: row.get(2)?,
            created_at: Self::datetime_column(row, 3),
            updated_at: Self::datetime_column(row, 4),
        })
    }

    fn channel_from_row(row: &Row) -> rusqlite::Result<Channel> {
        Ok(Channel {
            id: row.get(0)?,
            platform: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            owner_urls: Self::split_list(row.get(4)?),
            thumbnails: Self::split_list(row.get(5)?),
            channel_credit: row.get(6)?,
            created_at: Self::datetime_column(row, 7),
            updated_at: Self::datetime_column(row, 8),
        })
    }

    fn subscription_from_row(row: &Row) -> rusqlite::Result<Subscription> {
        Ok(Subscription {
            id: row.get(0)?,
            user_credit: row.get(1)?,
            channel_credit: row.get(2)?,
            created_at: Self::datetime_column(row, 3),
            updated_at: Self::datetime_column(row, 4),
        })
    }

    fn content_from_row(row: &Row) -> rusqlite::Result<Content> {
        let state = row
            .get::<_, String>(6)?
            .parse::<ContentState>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?;
        let duration_secs: i64 = row.get(9)?;

        Ok(Content {
            id: row.get(0)?,
            platform: row.get(1)?,
            channel_credit: row.get(2)?,
            title: row.get(3)?,
            thumbnail: row.get(4)?,
            content_credit: row.get(5)?,
            state,
            info: row.get(7)?,
            published_at: Self::datetime_column(row, 8),
            duration: Duration::from_secs(duration_secs.max(0) as u64),
            path: row.get(10)?,
            created_at: Self::datetime_column(row, 11),
            updated_at: Self::datetime_column(row, 12),
        })
    }

    /// Runs `SELECT <columns> FROM <table>` with an AND-ed equality filter.
    fn select_where<T>(
        &self,
        columns: &str,
        table: &str,
        conditions: &[(&str, Option<String>)],
        order_by: &str,
        map: fn(&Row) -> rusqlite::Result<T>,
    ) -> Result<Vec<T>> {
        let conn = self.conn()?;

        let mut clauses = Vec::new();
        let mut args = Vec::new();
        for (column, value) in conditions {
            if let Some(value) = value {
                args.push(value.clone());
                clauses.push(format!("{} = ?{}", column, args.len()));
            }
        }

        let mut sql = format!("SELECT {} FROM {}", columns, table);
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY ");
        sql.push_str(order_by);

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(args.iter()), map)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }
}

impl Store for SqliteStore {
    fn add_user(&self, user: &User) -> Result<i64> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO users (credit, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                user.credit,
                user.name,
                Self::format_datetime(&user.created_at),
                Self::format_datetime(&user.updated_at)
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    fn find_users(&self, filter: &UserFilter) -> Result<Vec<User>> {
        self.select_where(
            USER_COLUMNS,
            "users",
            &[("credit", filter.credit.clone())],
            "id",
            Self::user_from_row,
        )
    }

    fn add_channel(&self, channel: &Channel) -> Result<i64> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO channels (platform, name, description, owner_urls, thumbnails, channel_credit, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                channel.platform,
                channel.name,
                channel.description,
                Self::join_list(&channel.owner_urls),
                Self::join_list(&channel.thumbnails),
                channel.channel_credit,
                Self::format_datetime(&channel.created_at),
                Self::format_datetime(&channel.updated_at)
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    fn find_channels(&self, filter: &ChannelFilter) -> Result<Vec<Channel>> {
        self.select_where(
            CHANNEL_COLUMNS,
            "channels",
            &[("channel_credit", filter.channel_credit.clone())],
            "id",
            Self::channel_from_row,
        )
    }

    fn update_channel(&self, id: i64, update: &ChannelUpdate) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let exists: i64 = tx.query_row(
            "SELECT COUNT(*) FROM channels WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        if exists == 0 {
            return Err(ListenError::NotFound(format!("channel #{}", id)));
        }

        if let Some(ref name) = update.name {
            tx.execute("UPDATE channels SET name = ?1 WHERE id = ?2", params![name, id])?;
        }
        if let Some(ref description) = update.description {
            tx.execute(
                "UPDATE channels SET description = ?1 WHERE id = ?2",
                params![description, id],
            )?;
        }
        if let Some(ref updated_at) = update.updated_at {
            tx.execute(
                "UPDATE channels SET updated_at = ?1 WHERE id = ?2",
                params![Self::format_datetime(updated_at), id],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn add_subscription(&self, subscription: &Subscription) -> Result<i64> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO subscriptions (user_credit, channel_credit, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                subscription.user_credit,
                subscription.channel_credit,
                Self::format_datetime(&subscription.created_at),
                Self::format_datetime(&subscription.updated_at)
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    fn find_subscriptions(&self, filter: &SubscriptionFilter) -> Result<Vec<Subscription>> {
        self.select_where(
            SUBSCRIPTION_COLUMNS,
            "subscriptions",
            &[
                ("user_credit", filter.user_credit.clone()),
                ("channel_credit", filter.channel_credit.clone()),
            ],
            "id",
            Self::subscription_from_row,
        )
    }

    fn delete_subscription(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;

        let deleted = conn.execute("DELETE FROM subscriptions WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(ListenError::NotFound(format!("subscription #{}", id)));
        }
        Ok(())
    }

    fn subscribed_channel_credits(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT DISTINCT channel_credit FROM subscriptions ORDER BY channel_credit",
        )?;

        let credits = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;

        Ok(credits)
    }

    fn add_content(&self, content: &Content) -> Result<i64> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO contents (platform, channel_credit, title, thumbnail, content_credit, state, info,
                                   published_at, duration_secs, path, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                content.platform,
                content.channel_credit,
                content.title,
                content.thumbnail,
                content.content_credit,
                content.state.as_str(),
                content.info,
                Self::format_datetime(&content.published_at),
                content.duration.as_secs() as i64,
                content.path,
                Self::format_datetime(&content.created_at),
                Self::format_datetime(&content.updated_at)
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    fn find_contents(&self, filter: &ContentFilter) -> Result<Vec<Content>> {
        self.select_where(
            CONTENT_COLUMNS,
            "contents",
            &[
                ("content_credit", filter.content_credit.clone()),
                ("channel_credit", filter.channel_credit.clone()),
                ("state", filter.state.map(|s| s.as_str().to_string())),
            ],
            "published_at DESC, id DESC",
            Self::content_from_row,
        )
    }

    fn update_content(&self, id: i64, update: &ContentUpdate) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let exists: i64 = tx.query_row(
            "SELECT COUNT(*) FROM contents WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        if exists == 0 {
            return Err(ListenError::NotFound(format!("content #{}", id)));
        }

        if let Some(state) = update.state {
            tx.execute(
                "UPDATE contents SET state = ?1 WHERE id = ?2",
                params![state.as_str(), id],
            )?;
        }
        if let Some(ref info) = update.info {
            tx.execute("UPDATE contents SET info = ?1 WHERE id = ?2", params![info, id])?;
        }
        if let Some(ref path) = update.path {
            tx.execute("UPDATE contents SET path = ?1 WHERE id = ?2", params![path, id])?;
        }
        if let Some(ref updated_at) = update.updated_at {
            tx.execute(
                "UPDATE contents SET updated_at = ?1 WHERE id = ?2",
                params![Self::format_datetime(updated_at), id],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn next_pending_content(&self) -> Result<Option<Content>> {
        let conn = self.conn()?;

        let sql = format!(
            "SELECT {} FROM contents WHERE state = ?1 ORDER BY published_at ASC, id ASC LIMIT 1",
            CONTENT_COLUMNS
        );
        let result = conn
            .query_row(
                &sql,
                params![ContentState::Pending.as_str()],
                Self::content_from_row,
            )
            .optional()?;

        Ok(result)
    }

    fn contents_for_channels(
        &self,
        channel_credits: &[String],
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Content>> {
        if channel_credits.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.conn()?;

        let placeholders = (1..=channel_credits.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {} FROM contents WHERE channel_credit IN ({})
             ORDER BY published_at DESC, id DESC LIMIT {} OFFSET {}",
            CONTENT_COLUMNS, placeholders, limit, offset
        );

        let mut stmt = conn.prepare(&sql)?;
        let contents = stmt
            .query_map(params_from_iter(channel_credits.iter()), Self::content_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(contents)
    }

    fn stale_downloading(&self, before: DateTime<Utc>) -> Result<Vec<Content>> {
        let conn = self.conn()?;

        let sql = format!(
            "SELECT {} FROM contents WHERE state = ?1 AND updated_at < ?2 ORDER BY id",
            CONTENT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let contents = stmt
            .query_map(
                params![
                    ContentState::Downloading.as_str(),
                    Self::format_datetime(&before)
                ],
                Self::content_from_row,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(contents)
    }
}

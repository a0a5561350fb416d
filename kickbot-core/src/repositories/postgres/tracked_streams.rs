// kickbot-core/src/repositories/postgres/tracked_streams.rs
//
// Stores tracked-stream records in the "tracked_streams" table, keyed by
// (guild_id, streamer_id). Add rejects an existing key rather than
// upserting; update replaces the full row.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};

use kickbot_common::error::Error;
use kickbot_common::models::tracking::TrackedStream;
use kickbot_common::traits::repository_traits::TrackedStreamRepository;

#[derive(Clone)]
pub struct PostgresTrackedStreamRepository {
    pool: Pool<Postgres>,
}

impl PostgresTrackedStreamRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn row_to_record(r: &sqlx::postgres::PgRow) -> Result<TrackedStream, Error> {
    Ok(TrackedStream {
        guild_id:                r.try_get("guild_id")?,
        channel_id:              r.try_get("channel_id")?,
        streamer_id:             r.try_get("streamer_id")?,
        streamer_name:           r.try_get("streamer_name")?,
        was_live:                r.try_get("was_live")?,
        last_stream_started_at:  r.try_get("last_stream_started_at")?,
        last_stream_title:       r.try_get("last_stream_title")?,
        last_stream_thumbnail:   r.try_get("last_stream_thumbnail")?,
        role_id:                 r.try_get("role_id")?,
        custom_message:          r.try_get("custom_message")?,
        notification_message_id: r.try_get("notification_message_id")?,
        last_category:           r.try_get("last_category")?,
        created_at:              r.try_get("created_at")?,
        updated_at:              r.try_get("updated_at")?,
    })
}

const SELECT_COLUMNS: &str = r#"
    guild_id, channel_id, streamer_id, streamer_name, was_live,
    last_stream_started_at, last_stream_title, last_stream_thumbnail,
    role_id, custom_message, notification_message_id, last_category,
    created_at, updated_at
"#;

#[async_trait]
impl TrackedStreamRepository for PostgresTrackedStreamRepository {
    async fn add(&self, record: &TrackedStream) -> Result<(), Error> {
        let q = r#"
            INSERT INTO tracked_streams (
                guild_id, channel_id, streamer_id, streamer_name, was_live,
                last_stream_started_at, last_stream_title, last_stream_thumbnail,
                role_id, custom_message, notification_message_id, last_category,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        "#;
        let res = sqlx::query(q)
            .bind(&record.guild_id)
            .bind(&record.channel_id)
            .bind(record.streamer_id)
            .bind(&record.streamer_name)
            .bind(record.was_live)
            .bind(record.last_stream_started_at)
            .bind(&record.last_stream_title)
            .bind(&record.last_stream_thumbnail)
            .bind(&record.role_id)
            .bind(&record.custom_message)
            .bind(&record.notification_message_id)
            .bind(&record.last_category)
            .bind(record.created_at)
            .bind(record.updated_at)
            .execute(&self.pool)
            .await;

        match res {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(Error::Duplicate(format!(
                    "'{}' is already tracked in guild {}",
                    record.streamer_name, record.guild_id
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn remove(&self, guild_id: &str, streamer_id: i64) -> Result<(), Error> {
        let q = r#"
            DELETE FROM tracked_streams
            WHERE guild_id = $1
              AND streamer_id = $2
        "#;
        let result = sqlx::query(q)
            .bind(guild_id)
            .bind(streamer_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!(
                "no tracked stream for streamer {streamer_id} in guild {guild_id}"
            )));
        }
        Ok(())
    }

    async fn get(&self, guild_id: &str, streamer_id: i64) -> Result<Option<TrackedStream>, Error> {
        let q = format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM tracked_streams
            WHERE guild_id = $1
              AND streamer_id = $2
            "#
        );
        let row_opt = sqlx::query(&q)
            .bind(guild_id)
            .bind(streamer_id)
            .fetch_optional(&self.pool)
            .await?;

        match row_opt {
            Some(r) => Ok(Some(row_to_record(&r)?)),
            None => Ok(None),
        }
    }

    async fn list_all(&self) -> Result<Vec<TrackedStream>, Error> {
        let q = format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM tracked_streams
            "#
        );
        let rows = sqlx::query(&q).fetch_all(&self.pool).await?;

        let mut out = Vec::with_capacity(rows.len());
        for r in rows {
            out.push(row_to_record(&r)?);
        }
        Ok(out)
    }

    async fn list_for_guild(&self, guild_id: &str) -> Result<Vec<TrackedStream>, Error> {
        let q = format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM tracked_streams
            WHERE guild_id = $1
            ORDER BY streamer_name
            "#
        );
        let rows = sqlx::query(&q)
            .bind(guild_id)
            .fetch_all(&self.pool)
            .await?;

        let mut out = Vec::with_capacity(rows.len());
        for r in rows {
            out.push(row_to_record(&r)?);
        }
        Ok(out)
    }

    async fn update(&self, record: &TrackedStream) -> Result<(), Error> {
        let q = r#"
            UPDATE tracked_streams
            SET channel_id              = $3,
                streamer_name           = $4,
                was_live                = $5,
                last_stream_started_at  = $6,
                last_stream_title       = $7,
                last_stream_thumbnail   = $8,
                role_id                 = $9,
                custom_message          = $10,
                notification_message_id = $11,
                last_category           = $12,
                updated_at              = $13
            WHERE guild_id = $1
              AND streamer_id = $2
        "#;
        let result = sqlx::query(q)
            .bind(&record.guild_id)
            .bind(record.streamer_id)
            .bind(&record.channel_id)
            .bind(&record.streamer_name)
            .bind(record.was_live)
            .bind(record.last_stream_started_at)
            .bind(&record.last_stream_title)
            .bind(&record.last_stream_thumbnail)
            .bind(&record.role_id)
            .bind(&record.custom_message)
            .bind(&record.notification_message_id)
            .bind(&record.last_category)
            .bind(record.updated_at)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!(
                "no tracked stream for key {}",
                record.key()
            )));
        }
        Ok(())
    }
}

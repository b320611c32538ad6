use rusqlite::Connection;

use crate::error::Result;

/// Initialise the campaign schema in `conn`.
///
/// Creates the campaigns, events and posts tables (idempotent) plus indexes
/// on the date columns the pipeline polls by.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS campaigns (
            id          TEXT    NOT NULL PRIMARY KEY,
            name        TEXT    NOT NULL,
            theme       TEXT    NOT NULL,
            start_date  TEXT    NOT NULL,   -- ISO-8601 date
            end_date    TEXT    NOT NULL,   -- ISO-8601 date
            channels    TEXT    NOT NULL,   -- JSON array of channel names
            lead_days   INTEGER NOT NULL DEFAULT 0,
            color       TEXT    NOT NULL DEFAULT '',
            medias      TEXT    NOT NULL,   -- JSON array of media references
            recurrence  TEXT,               -- JSON-encoded RecurrenceRule, NULL for one-shot
            created_at  TEXT    NOT NULL,
            updated_at  TEXT    NOT NULL
        ) STRICT;

        CREATE TABLE IF NOT EXISTS events (
            id          TEXT    NOT NULL PRIMARY KEY,
            campaign_id TEXT    NOT NULL,
            title       TEXT    NOT NULL,
            color       TEXT    NOT NULL DEFAULT '',
            start_date  TEXT    NOT NULL,
            end_date    TEXT    NOT NULL,
            scheduled   INTEGER NOT NULL DEFAULT 0
        ) STRICT;

        -- Efficient range queries and per-campaign replacement
        CREATE INDEX IF NOT EXISTS idx_events_start ON events (start_date);
        CREATE INDEX IF NOT EXISTS idx_events_campaign ON events (campaign_id);

        CREATE TABLE IF NOT EXISTS posts (
            campaign_id TEXT NOT NULL,
            event_id    TEXT NOT NULL,
            event_date  TEXT NOT NULL,
            body        TEXT NOT NULL,
            status      TEXT NOT NULL DEFAULT 'draft',
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL,
            PRIMARY KEY (campaign_id, event_id)
        ) STRICT;

        CREATE INDEX IF NOT EXISTS idx_posts_date ON posts (campaign_id, event_date);
        ",
    )?;
    Ok(())
}

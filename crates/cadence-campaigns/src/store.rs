use std::sync::Mutex;

use chrono::{NaiveDate, Utc};
use rusqlite::Connection;
use tracing::info;

use cadence_core::{CampaignId, EventId};

use crate::db::init_db;
use crate::error::{CampaignError, Result};
use crate::recurrence::expand;
use crate::types::{Campaign, CalendarEvent, Post, PostStatus, RecurrenceRule};

/// Record-oriented facade over campaigns, their derived events, and
/// generated posts.
///
/// Thread-safe: wraps the SQLite connection in a Mutex so the background
/// manager and on-demand callers can share one store. `save_campaign` is
/// atomic with respect to the campaign's derived events — readers never
/// observe a partial expansion.
pub struct CampaignStore {
    conn: Mutex<Connection>,
}

// Column list shared by every campaign SELECT.
const CAMPAIGN_COLS: &str =
    "id, name, theme, start_date, end_date, channels, lead_days, color, medias, recurrence";

type CampaignRow = (
    String,         // id
    String,         // name
    String,         // theme
    String,         // start_date
    String,         // end_date
    String,         // channels JSON
    i64,            // lead_days
    String,         // color
    String,         // medias JSON
    Option<String>, // recurrence JSON
);

impl CampaignStore {
    /// Open a store over `conn`, initialising the schema if needed.
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    // --- campaigns ---------------------------------------------------------

    /// Return all campaigns ordered by creation time.
    pub fn list_campaigns(&self) -> Result<Vec<Campaign>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {CAMPAIGN_COLS} FROM campaigns ORDER BY created_at, id"
        ))?;
        let campaigns = stmt
            .query_map([], campaign_row)?
            .filter_map(|r| r.ok())
            .filter_map(|row| campaign_from_row(row).ok())
            .collect();
        Ok(campaigns)
    }

    pub fn get_campaign(&self, id: &CampaignId) -> Result<Campaign> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                &format!("SELECT {CAMPAIGN_COLS} FROM campaigns WHERE id = ?1"),
                [id.as_str()],
                campaign_row,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => CampaignError::CampaignNotFound {
                    id: id.to_string(),
                },
                other => other.into(),
            })?;
        campaign_from_row(row)
    }

    /// Create or replace a campaign and its derived events.
    ///
    /// The rule is expanded before any write; the campaign upsert, the
    /// deletion of stale events and the insertion of the new expansion all
    /// happen in one transaction.
    pub fn save_campaign(&self, campaign: &Campaign) -> Result<Campaign> {
        let events = expand(campaign)?;

        let channels = serde_json::to_string(&campaign.channels)?;
        let medias = serde_json::to_string(&campaign.medias)?;
        let recurrence = campaign
            .recurrence
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();

        // Preserve created_at on replace.
        let created_at: String = tx
            .query_row(
                "SELECT created_at FROM campaigns WHERE id = ?1",
                [campaign.id.as_str()],
                |row| row.get(0),
            )
            .unwrap_or_else(|_| now.clone());

        tx.execute(
            "INSERT OR REPLACE INTO campaigns
             (id, name, theme, start_date, end_date, channels, lead_days,
              color, medias, recurrence, created_at, updated_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12)",
            rusqlite::params![
                campaign.id.as_str(),
                campaign.name,
                campaign.theme,
                campaign.start.to_string(),
                campaign.end.to_string(),
                channels,
                campaign.lead_days,
                campaign.color,
                medias,
                recurrence,
                created_at,
                now,
            ],
        )?;

        tx.execute(
            "DELETE FROM events WHERE campaign_id = ?1",
            [campaign.id.as_str()],
        )?;
        for event in &events {
            tx.execute(
                "INSERT INTO events
                 (id, campaign_id, title, color, start_date, end_date, scheduled)
                 VALUES (?1,?2,?3,?4,?5,?6,0)",
                rusqlite::params![
                    event.id.as_str(),
                    event.campaign_id.as_str(),
                    event.title,
                    event.color,
                    event.start.to_string(),
                    event.end.to_string(),
                ],
            )?;
        }
        tx.commit()?;

        info!(campaign_id = %campaign.id, events = events.len(), "campaign saved");
        Ok(campaign.clone())
    }

    /// Remove a campaign together with its events and posts.
    pub fn delete_campaign(&self, id: &CampaignId) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM posts WHERE campaign_id = ?1", [id.as_str()])?;
        tx.execute("DELETE FROM events WHERE campaign_id = ?1", [id.as_str()])?;
        let n = tx.execute("DELETE FROM campaigns WHERE id = ?1", [id.as_str()])?;
        if n == 0 {
            return Err(CampaignError::CampaignNotFound { id: id.to_string() });
        }
        tx.commit()?;
        info!(campaign_id = %id, "campaign deleted");
        Ok(())
    }

    // --- events ------------------------------------------------------------

    /// Events whose start falls inside `[start, end]`, ordered by start.
    pub fn list_events_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<CalendarEvent>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, campaign_id, title, color, start_date, end_date, scheduled
             FROM events
             WHERE start_date >= ?1 AND start_date <= ?2
             ORDER BY start_date, id",
        )?;
        let events = stmt
            .query_map([start.to_string(), end.to_string()], event_row)?
            .filter_map(|r| r.ok())
            .filter_map(|row| event_from_row(row).ok())
            .collect();
        Ok(events)
    }

    pub fn list_events_for_campaign(&self, id: &CampaignId) -> Result<Vec<CalendarEvent>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, campaign_id, title, color, start_date, end_date, scheduled
             FROM events WHERE campaign_id = ?1
             ORDER BY start_date, id",
        )?;
        let events = stmt
            .query_map([id.as_str()], event_row)?
            .filter_map(|r| r.ok())
            .filter_map(|row| event_from_row(row).ok())
            .collect();
        Ok(events)
    }

    /// Mark an event scheduled. Returns `false` when the event was already
    /// scheduled (the operation is an idempotent no-op in that case).
    pub fn mark_event_scheduled(&self, id: &EventId) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute(
            "UPDATE events SET scheduled = 1 WHERE id = ?1 AND scheduled = 0",
            [id.as_str()],
        )?;
        if n == 1 {
            return Ok(true);
        }
        match conn.query_row(
            "SELECT scheduled FROM events WHERE id = ?1",
            [id.as_str()],
            |row| row.get::<_, i64>(0),
        ) {
            Ok(_) => Ok(false),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                Err(CampaignError::EventNotFound { id: id.to_string() })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Scheduled events that have no post yet, oldest start first — the
    /// Generate stage's work set.
    pub fn list_events_awaiting_content(&self) -> Result<Vec<CalendarEvent>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT e.id, e.campaign_id, e.title, e.color, e.start_date, e.end_date, e.scheduled
             FROM events e
             LEFT JOIN posts p
                    ON p.event_id = e.id AND p.campaign_id = e.campaign_id
             WHERE e.scheduled = 1 AND p.event_id IS NULL
             ORDER BY e.start_date, e.id",
        )?;
        let events = stmt
            .query_map([], event_row)?
            .filter_map(|r| r.ok())
            .filter_map(|row| event_from_row(row).ok())
            .collect();
        Ok(events)
    }

    /// Events with a draft post whose start has arrived, oldest start first —
    /// the Publish stage's work set.
    pub fn list_publishable_events(
        &self,
        today: NaiveDate,
    ) -> Result<Vec<(CalendarEvent, Post)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT e.id, e.campaign_id, e.title, e.color, e.start_date, e.end_date, e.scheduled,
                    p.event_date, p.body, p.status, p.created_at, p.updated_at
             FROM events e
             JOIN posts p
                   ON p.event_id = e.id AND p.campaign_id = e.campaign_id
             WHERE p.status = 'draft' AND e.start_date <= ?1
             ORDER BY e.start_date, e.id",
        )?;
        let rows = stmt
            .query_map([today.to_string()], |row| {
                Ok((
                    event_row(row)?,
                    (
                        row.get::<_, String>(7)?,  // event_date
                        row.get::<_, String>(8)?,  // body
                        row.get::<_, String>(9)?,  // status
                        row.get::<_, String>(10)?, // created_at
                        row.get::<_, String>(11)?, // updated_at
                    ),
                ))
            })?
            .filter_map(|r| r.ok())
            .filter_map(|(ev, (event_date, body, status, created_at, updated_at))| {
                let event = event_from_row(ev).ok()?;
                let post = Post {
                    campaign_id: event.campaign_id.clone(),
                    event_id: event.id.clone(),
                    event_date: event_date.parse().ok()?,
                    body,
                    status: status.parse().ok()?,
                    created_at,
                    updated_at,
                };
                Some((event, post))
            })
            .collect();
        Ok(rows)
    }

    // --- posts -------------------------------------------------------------

    /// Insert or replace the post for an event, preserving `created_at` on
    /// replace.
    pub fn upsert_post(&self, post: &Post) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO posts
             (campaign_id, event_id, event_date, body, status, created_at, updated_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7)
             ON CONFLICT(campaign_id, event_id) DO UPDATE SET
                 event_date = excluded.event_date,
                 body       = excluded.body,
                 status     = excluded.status,
                 updated_at = excluded.updated_at",
            rusqlite::params![
                post.campaign_id.as_str(),
                post.event_id.as_str(),
                post.event_date.to_string(),
                post.body,
                post.status.to_string(),
                post.created_at,
                post.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Look up the post for a campaign by the owning event's date.
    pub fn get_post(&self, campaign_id: &CampaignId, event_date: NaiveDate) -> Result<Post> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT campaign_id, event_id, event_date, body, status, created_at, updated_at
                 FROM posts WHERE campaign_id = ?1 AND event_date = ?2",
                rusqlite::params![campaign_id.as_str(), event_date.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                },
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => CampaignError::PostNotFound {
                    key: format!("{campaign_id}@{event_date}"),
                },
                other => other.into(),
            })?;

        let (campaign_id, event_id, event_date, body, status, created_at, updated_at) = row;
        Ok(Post {
            campaign_id: CampaignId::from(campaign_id),
            event_id: EventId::from(event_id),
            event_date: parse_date(&event_date)?,
            body,
            status: parse_status(&status)?,
            created_at,
            updated_at,
        })
    }

    pub fn set_post_status(
        &self,
        campaign_id: &CampaignId,
        event_id: &EventId,
        status: PostStatus,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        let n = conn.execute(
            "UPDATE posts SET status = ?1, updated_at = ?2
             WHERE campaign_id = ?3 AND event_id = ?4",
            rusqlite::params![status.to_string(), now, campaign_id.as_str(), event_id.as_str()],
        )?;
        if n == 0 {
            return Err(CampaignError::PostNotFound {
                key: event_id.to_string(),
            });
        }
        Ok(())
    }
}

// --- row mapping -----------------------------------------------------------

fn campaign_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CampaignRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
    ))
}

fn campaign_from_row(row: CampaignRow) -> Result<Campaign> {
    let (id, name, theme, start, end, channels, lead_days, color, medias, recurrence) = row;
    let recurrence: Option<RecurrenceRule> = recurrence
        .as_deref()
        .map(serde_json::from_str)
        .transpose()?;
    Ok(Campaign {
        id: CampaignId::from(id),
        name,
        theme,
        start: parse_date(&start)?,
        end: parse_date(&end)?,
        channels: serde_json::from_str(&channels)?,
        lead_days,
        color,
        medias: serde_json::from_str(&medias)?,
        recurrence,
    })
}

type EventRow = (String, String, String, String, String, String, i64);

fn event_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EventRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn event_from_row(row: EventRow) -> Result<CalendarEvent> {
    let (id, campaign_id, title, color, start, end, scheduled) = row;
    Ok(CalendarEvent {
        id: EventId::from(id),
        campaign_id: CampaignId::from(campaign_id),
        title,
        color,
        start: parse_date(&start)?,
        end: parse_date(&end)?,
        scheduled: scheduled != 0,
    })
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    s.parse()
        .map_err(|e| CampaignError::Validation(format!("stored date {s:?} is invalid: {e}")))
}

fn parse_status(s: &str) -> Result<PostStatus> {
    s.parse().map_err(CampaignError::Validation)
}

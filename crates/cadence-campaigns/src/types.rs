use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use cadence_core::{CampaignId, EventId};

/// How often a recurring campaign repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Yearly => "yearly",
        };
        write!(f, "{s}")
    }
}

/// Weekday token as used in `by_day` (`"MON"` … `"SUN"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Weekday {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl Weekday {
    pub fn to_chrono(self) -> chrono::Weekday {
        match self {
            Weekday::Mon => chrono::Weekday::Mon,
            Weekday::Tue => chrono::Weekday::Tue,
            Weekday::Wed => chrono::Weekday::Wed,
            Weekday::Thu => chrono::Weekday::Thu,
            Weekday::Fri => chrono::Weekday::Fri,
            Weekday::Sat => chrono::Weekday::Sat,
            Weekday::Sun => chrono::Weekday::Sun,
        }
    }
}

fn default_interval() -> u32 {
    1
}

/// Recurrence rule attached to a campaign.
///
/// `frequency` is required; a rule without one is rejected during
/// deserialization. When both `count` and `until` are set, expansion stops
/// at whichever bound is reached first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    /// Step between occurrences in units of `frequency`. Must be ≥ 1.
    #[serde(default = "default_interval")]
    pub interval: u32,
    /// Weekday filter — meaningful only for `weekly`, ignored otherwise.
    #[serde(default)]
    pub by_day: Vec<Weekday>,
    /// Maximum number of occurrences.
    pub count: Option<u32>,
    /// Inclusive end date bound.
    pub until: Option<NaiveDate>,
}

/// A marketing initiative with a date range, publish channels, and an
/// optional recurrence rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub name: String,
    pub theme: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Publish target names, matched against the publisher registry.
    #[serde(default)]
    pub channels: Vec<String>,
    /// Days before `start` that scheduling should begin.
    #[serde(default)]
    pub lead_days: i64,
    /// UI tag, passed through to derived events.
    #[serde(default)]
    pub color: String,
    /// Ordered media references handed to the content generator.
    #[serde(default)]
    pub medias: Vec<String>,
    pub recurrence: Option<RecurrenceRule>,
}

/// One concrete time-boxed occurrence derived from a campaign.
///
/// Produced exclusively by the recurrence expander; a campaign re-save
/// replaces all of that campaign's events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: EventId,
    pub campaign_id: CampaignId,
    pub title: String,
    pub color: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Set by the Schedule stage; never unset by pipeline code.
    pub scheduled: bool,
}

/// Lifecycle state of a generated post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    /// Content generated, not yet delivered to every channel.
    Draft,
    /// Delivered to every channel of the owning campaign.
    Published,
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for PostStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PostStatus::Draft),
            "published" => Ok(PostStatus::Published),
            other => Err(format!("unknown post status: {other}")),
        }
    }
}

/// Generated content for one calendar event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub campaign_id: CampaignId,
    pub event_id: EventId,
    /// Start date of the owning event — posts are also looked up by date.
    pub event_date: NaiveDate,
    pub body: String,
    pub status: PostStatus,
    /// ISO-8601 timestamp of first generation.
    pub created_at: String,
    /// ISO-8601 timestamp of the last content or status change.
    pub updated_at: String,
}

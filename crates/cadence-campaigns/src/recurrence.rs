use chrono::{Datelike, Days, Months, NaiveDate};

use cadence_core::EventId;

use crate::error::{CampaignError, Result};
use crate::types::{Campaign, CalendarEvent, Frequency, RecurrenceRule};

/// Hard ceiling applied when a rule carries neither `count` nor `until`.
///
/// Guarantees termination for open-ended rules; a campaign that genuinely
/// needs more occurrences must carry an explicit bound.
pub const MAX_OCCURRENCES: usize = 1000;

/// Expand `campaign` into its ordered sequence of calendar events.
///
/// Pure and deterministic: identical input yields identical output, no I/O.
/// Validation runs first — a malformed campaign produces an error and no
/// partial output.
pub fn expand(campaign: &Campaign) -> Result<Vec<CalendarEvent>> {
    validate(campaign)?;

    let duration_days = (campaign.end - campaign.start).num_days() as u64;

    let Some(rule) = &campaign.recurrence else {
        return Ok(vec![make_event(
            campaign,
            0,
            campaign.start,
            campaign.end,
        )]);
    };

    let cap = rule
        .count
        .map(|c| c as usize)
        .unwrap_or(MAX_OCCURRENCES)
        .min(MAX_OCCURRENCES);

    let occurrences = if rule.frequency == Frequency::Weekly && !rule.by_day.is_empty() {
        weekly_by_day(rule, campaign.start, duration_days, cap)
    } else {
        indexed(rule, campaign.start, duration_days, cap)
    };

    Ok(occurrences
        .into_iter()
        .enumerate()
        .map(|(i, (start, end))| make_event(campaign, i, start, end))
        .collect())
}

fn validate(campaign: &Campaign) -> Result<()> {
    if campaign.id.as_str().is_empty() {
        return Err(CampaignError::Validation("campaign id is required".into()));
    }
    if campaign.end < campaign.start {
        return Err(CampaignError::Validation(format!(
            "campaign end {} precedes start {}",
            campaign.end, campaign.start
        )));
    }
    if campaign.lead_days < 0 {
        return Err(CampaignError::Validation(
            "lead_days must not be negative".into(),
        ));
    }
    if let Some(rule) = &campaign.recurrence {
        if rule.interval < 1 {
            return Err(CampaignError::Validation(
                "recurrence interval must be >= 1".into(),
            ));
        }
        if rule.count == Some(0) {
            return Err(CampaignError::Validation(
                "recurrence count must be >= 1".into(),
            ));
        }
    }
    Ok(())
}

/// Anchor for occurrence `k`, always computed from the original start so
/// month-end clamping never compounds (Jan 31 + 2 months is Mar 31, not the
/// Mar 28 an iterated Feb-clamp would give).
fn nth_anchor(rule: &RecurrenceRule, start: NaiveDate, k: u32) -> Option<NaiveDate> {
    let step = u64::from(k) * u64::from(rule.interval);
    match rule.frequency {
        Frequency::Daily => start.checked_add_days(Days::new(step)),
        Frequency::Weekly => start.checked_add_days(Days::new(step * 7)),
        Frequency::Monthly => start.checked_add_months(Months::new(k.checked_mul(rule.interval)?)),
        Frequency::Yearly => {
            let months = k.checked_mul(rule.interval)?.checked_mul(12)?;
            start.checked_add_months(Months::new(months))
        }
    }
}

/// Daily / plain-weekly / monthly / yearly expansion: one occurrence per
/// index until a bound is hit.
fn indexed(
    rule: &RecurrenceRule,
    start: NaiveDate,
    duration_days: u64,
    cap: usize,
) -> Vec<(NaiveDate, NaiveDate)> {
    let mut out = Vec::new();
    for k in 0..cap as u32 {
        let Some(anchor) = nth_anchor(rule, start, k) else {
            break;
        };
        if rule.until.is_some_and(|u| anchor > u) {
            break;
        }
        let Some(end) = anchor.checked_add_days(Days::new(duration_days)) else {
            break;
        };
        out.push((anchor, end));
    }
    out
}

/// Weekly expansion with a weekday filter: windows of `interval` weeks are
/// anchored at the campaign start; each 7-day window is scanned in date
/// order and matching weekdays are emitted. Starts are therefore strictly
/// increasing, and the first occurrence is the first matching weekday on or
/// after the campaign start.
fn weekly_by_day(
    rule: &RecurrenceRule,
    start: NaiveDate,
    duration_days: u64,
    cap: usize,
) -> Vec<(NaiveDate, NaiveDate)> {
    let window_days = u64::from(rule.interval) * 7;
    let mut out = Vec::new();

    'windows: for w in 0u64.. {
        let Some(window_start) = w
            .checked_mul(window_days)
            .and_then(|d| start.checked_add_days(Days::new(d)))
        else {
            break;
        };
        if rule.until.is_some_and(|u| window_start > u) {
            break;
        }
        for offset in 0..7u64 {
            let Some(day) = window_start.checked_add_days(Days::new(offset)) else {
                break 'windows;
            };
            if !rule.by_day.iter().any(|d| d.to_chrono() == day.weekday()) {
                continue;
            }
            if rule.until.is_some_and(|u| day > u) {
                break 'windows;
            }
            let Some(end) = day.checked_add_days(Days::new(duration_days)) else {
                break 'windows;
            };
            out.push((day, end));
            if out.len() >= cap {
                break 'windows;
            }
        }
    }
    out
}

fn make_event(campaign: &Campaign, index: usize, start: NaiveDate, end: NaiveDate) -> CalendarEvent {
    CalendarEvent {
        id: EventId::derived(&campaign.id, index),
        campaign_id: campaign.id.clone(),
        title: campaign.name.clone(),
        color: campaign.color.clone(),
        start,
        end,
        scheduled: false,
    }
}

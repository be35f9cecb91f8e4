//! Post-query reductions behind the dashboards.
//!
//! Every query returns plain rows; the numbers shown on a page are computed
//! here so the rounding rules live in one place:
//!
//! - percentages use integer division (`num * 100 / den`) and are `0` when
//!   the denominator is not positive,
//! - averages are rounded to one decimal, exact halves going to the even
//!   digit,
//! - "most common" rankings are stable, so the first row seen wins a tie.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::models::{Event, FeedbackView, RegistrationView};
use crate::validation::{MAX_RATING, MIN_RATING};

pub const HIGHLIGHT_COUNT: usize = 3;
pub const UNKNOWN_DEPARTMENT: &str = "Unknown";

pub fn percent(numerator: i64, denominator: i64) -> i64 {
    if denominator > 0 {
        numerator * 100 / denominator
    } else {
        0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EventStatus {
    Open,
    Full,
}

pub fn event_status(registered: i64, max_seats: Option<i32>) -> EventStatus {
    match max_seats {
        Some(seats) if registered >= i64::from(seats) => EventStatus::Full,
        _ => EventStatus::Open,
    }
}

pub fn fill_percent(registered: i64, max_seats: Option<i32>) -> i64 {
    percent(registered, max_seats.map_or(0, i64::from))
}

/// An event shaped for display.
#[derive(Debug, Clone, Serialize)]
pub struct EventCard {
    #[serde(flatten)]
    pub event: Event,
    pub capacity: i64,
    pub fill_percent: i64,
    pub status: EventStatus,
    pub seats_left: Option<i64>,
}

impl From<Event> for EventCard {
    fn from(event: Event) -> Self {
        let capacity = event.max_seats.map_or(0, i64::from);
        Self {
            capacity,
            fill_percent: fill_percent(event.registered, event.max_seats),
            status: event_status(event.registered, event.max_seats),
            seats_left: event
                .max_seats
                .map(|seats| (i64::from(seats) - event.registered).max(0)),
            event,
        }
    }
}

pub fn event_cards(events: Vec<Event>) -> Vec<EventCard> {
    events.into_iter().map(EventCard::from).collect()
}

/// Totals for the admin events dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EventsOverview {
    pub total_events: usize,
    pub total_capacity: i64,
    pub seats_filled: i64,
    pub avg_fill: i64,
    pub upcoming: usize,
}

pub fn events_overview(cards: &[EventCard], today: NaiveDate) -> EventsOverview {
    let total_capacity = cards.iter().map(|card| card.capacity).sum();
    let seats_filled = cards.iter().map(|card| card.event.registered).sum();
    EventsOverview {
        total_events: cards.len(),
        total_capacity,
        seats_filled,
        avg_fill: percent(seats_filled, total_capacity),
        upcoming: cards
            .iter()
            .filter(|card| card.event.date.map_or(true, |date| date >= today))
            .count(),
    }
}

/// Totals for the public events listing, where "upcoming" means open for
/// registration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PublicEventStats {
    pub total_events: usize,
    pub upcoming: usize,
    pub total_registrations: i64,
    pub total_capacity: i64,
    pub avg_fill: i64,
}

pub fn public_event_stats(cards: &[EventCard]) -> PublicEventStats {
    let total_capacity = cards.iter().map(|card| card.capacity).sum();
    let total_registrations = cards.iter().map(|card| card.event.registered).sum();
    PublicEventStats {
        total_events: cards.len(),
        upcoming: cards
            .iter()
            .filter(|card| card.status == EventStatus::Open)
            .count(),
        total_registrations,
        total_capacity,
        avg_fill: percent(total_registrations, total_capacity),
    }
}

pub fn highlights(cards: &[EventCard], limit: usize) -> Vec<EventCard> {
    let mut ranked = cards.to_vec();
    ranked.sort_by(|a, b| b.fill_percent.cmp(&a.fill_percent));
    ranked.truncate(limit);
    ranked
}

/// Counts occurrences, most frequent first; ties keep first-seen order.
pub fn most_common<I, K>(items: I) -> Vec<(K, usize)>
where
    I: IntoIterator<Item = K>,
    K: Eq + Hash + Clone,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut counts: Vec<(K, usize)> = Vec::new();
    for item in items {
        match index.get(&item) {
            Some(&slot) => counts[slot].1 += 1,
            None => {
                index.insert(item.clone(), counts.len());
                counts.push((item, 1));
            }
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedCount {
    pub name: String,
    pub count: usize,
}

impl From<(String, usize)> for NamedCount {
    fn from((name, count): (String, usize)) -> Self {
        Self { name, count }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RegistrationStats {
    pub visible: usize,
    pub unique_students: usize,
    pub per_department: Vec<NamedCount>,
    pub latest_registration: Option<RegistrationView>,
    pub busiest_event: Option<NamedCount>,
}

/// Expects rows newest first, as the dashboard query returns them.
pub fn registration_stats(rows: &[RegistrationView]) -> RegistrationStats {
    if rows.is_empty() {
        return RegistrationStats::default();
    }

    let unique_students: HashSet<&str> = rows.iter().map(|row| row.usn.as_str()).collect();
    let busiest_event = most_common(rows.iter().map(|row| row.event_name.clone()))
        .into_iter()
        .next()
        .map(NamedCount::from);
    let per_department = most_common(rows.iter().map(|row| {
        row.department
            .clone()
            .unwrap_or_else(|| UNKNOWN_DEPARTMENT.to_string())
    }))
    .into_iter()
    .map(NamedCount::from)
    .collect();

    RegistrationStats {
        visible: rows.len(),
        unique_students: unique_students.len(),
        per_department,
        latest_registration: rows.first().cloned(),
        busiest_event,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RatingBucket {
    pub rating: i16,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedbackStats {
    pub total: usize,
    pub avg_rating: Option<f64>,
    pub positive_pct: i64,
    pub trending_event: Option<NamedCount>,
    pub rating_distribution: Vec<RatingBucket>,
}

pub fn rating_distribution(ratings: impl IntoIterator<Item = i16>) -> Vec<RatingBucket> {
    let mut buckets: Vec<RatingBucket> = (MIN_RATING..=MAX_RATING)
        .map(|rating| RatingBucket { rating, count: 0 })
        .collect();
    for rating in ratings {
        // the table constraint keeps ratings in range; anything else is skipped
        if let Some(bucket) = buckets.iter_mut().find(|bucket| bucket.rating == rating) {
            bucket.count += 1;
        }
    }
    buckets
}

pub fn average_rating(ratings: &[i16]) -> Option<f64> {
    if ratings.is_empty() {
        return None;
    }
    let total: i64 = ratings.iter().map(|&r| i64::from(r)).sum();
    let mean = total as f64 / ratings.len() as f64;
    // Rounds the exact binary value of the mean, halves to even: 13/4 is
    // 3.2, and 23/20 (stored just under 1.15) is 1.1.
    Decimal::from_f64_retain(mean)
        .map(|exact| exact.round_dp_with_strategy(1, RoundingStrategy::MidpointNearestEven))
        .and_then(|rounded| rounded.to_f64())
}

pub fn feedback_stats(rows: &[FeedbackView]) -> FeedbackStats {
    let ratings: Vec<i16> = rows.iter().map(|row| row.rating).collect();
    let positive = ratings.iter().filter(|&&rating| rating >= 4).count();

    FeedbackStats {
        total: rows.len(),
        avg_rating: average_rating(&ratings),
        positive_pct: percent(positive as i64, rows.len() as i64),
        trending_event: most_common(rows.iter().map(|row| row.event_name.clone()))
            .into_iter()
            .next()
            .map(NamedCount::from),
        rating_distribution: rating_distribution(ratings),
    }
}

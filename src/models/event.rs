use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// An event row together with its live registration count.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub event_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub venue: Option<String>,
    pub organizer: Option<String>,
    /// `None` means unlimited seats.
    pub max_seats: Option<i32>,
    pub registered: i64,
    pub avg_rating: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EventSummary {
    pub event_id: i32,
    pub name: String,
}

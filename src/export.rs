use axum::http::header;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};

use crate::models::{FeedbackView, RegistrationView};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A row type that can be written as one CSV record under a fixed header.
pub trait CsvRecord {
    const FILENAME: &'static str;
    const HEADER: &'static [&'static str];

    fn record(&self) -> Vec<String>;
}

fn timestamp(value: &DateTime<Utc>) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

impl CsvRecord for RegistrationView {
    const FILENAME: &'static str = "registrations.csv";
    const HEADER: &'static [&'static str] = &[
        "Registration ID",
        "Event",
        "USN",
        "Student",
        "Department",
        "Registered At",
    ];

    fn record(&self) -> Vec<String> {
        vec![
            self.reg_id.to_string(),
            self.event_name.clone(),
            self.usn.clone(),
            self.student_name.clone(),
            self.department.clone().unwrap_or_default(),
            timestamp(&self.registration_date),
        ]
    }
}

impl CsvRecord for FeedbackView {
    const FILENAME: &'static str = "feedback.csv";
    const HEADER: &'static [&'static str] = &[
        "Feedback ID",
        "Event",
        "USN",
        "Student",
        "Rating",
        "Comment",
        "Submitted At",
    ];

    fn record(&self) -> Vec<String> {
        vec![
            self.feedback_id.to_string(),
            self.event_name.clone(),
            self.usn.clone(),
            self.student_name.clone(),
            self.rating.to_string(),
            self.comment.clone().unwrap_or_default(),
            timestamp(&self.submitted_at),
        ]
    }
}

/// Header row first, then one record per row.
pub fn to_csv<T: CsvRecord>(rows: &[T]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(T::HEADER)?;
    for row in rows {
        writer.write_record(row.record())?;
    }
    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}

pub fn csv_download<T: CsvRecord>(payload: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", T::FILENAME),
            ),
        ],
        payload,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn registration(reg_id: i32, department: Option<&str>) -> RegistrationView {
        RegistrationView {
            reg_id,
            registration_date: Utc.with_ymd_and_hms(2024, 2, 10, 14, 5, 0).unwrap(),
            event_id: 2,
            event_name: "Robotics, Advanced".into(),
            usn: "1RV21CS010".into(),
            student_name: "Ravi".into(),
            department: department.map(str::to_string),
        }
    }

    fn parse(payload: &[u8]) -> Vec<csv::StringRecord> {
        csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(payload)
            .records()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn test_header_always_present() {
        let payload = to_csv::<RegistrationView>(&[]).unwrap();
        let records = parse(&payload);
        assert_eq!(records.len(), 1);
        assert_eq!(&records[0][0], "Registration ID");
        assert_eq!(records[0].len(), RegistrationView::HEADER.len());
    }

    #[test]
    fn test_one_record_per_row() {
        let rows: Vec<RegistrationView> = (1..=4).map(|i| registration(i, Some("ECE"))).collect();
        let records = parse(&to_csv(&rows).unwrap());
        assert_eq!(records.len(), rows.len() + 1);
        assert_eq!(&records[1][1], "Robotics, Advanced");
        assert_eq!(&records[1][5], "2024-02-10 14:05:00");
    }

    #[test]
    fn test_feedback_missing_comment_is_empty_field() {
        let row = FeedbackView {
            feedback_id: 9,
            rating: 4,
            comment: None,
            submitted_at: Utc.with_ymd_and_hms(2024, 2, 11, 8, 0, 0).unwrap(),
            event_id: 2,
            event_name: "Expo".into(),
            usn: "1RV21CS010".into(),
            student_name: "Ravi".into(),
        };
        let records = parse(&to_csv(&[row]).unwrap());
        assert_eq!(&records[1][4], "4");
        assert_eq!(&records[1][5], "");
    }

    #[tokio::test]
    async fn test_download_headers() {
        let response = csv_download::<FeedbackView>(b"a,b\n".to_vec());
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=feedback.csv"
        );
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/csv; charset=utf-8"
        );
    }
}

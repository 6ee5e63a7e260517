use chrono::{DateTime, FixedOffset, Utc};
use livebus_blob::UploadPolicy;
use serde::de::DeserializeOwned;
use serde::Serialize;
use validator::Validate;

/// The three record families of the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Trip,
    Accommodation,
    Budget,
}

impl RecordKind {
    pub fn collection(&self) -> &'static str {
        match self {
            RecordKind::Trip => "night_buses",
            RecordKind::Accommodation => "accommodations",
            RecordKind::Budget => "budgets",
        }
    }

    /// Storage folder for the record's images. Budgets carry none.
    pub fn image_prefix(&self) -> Option<&'static str> {
        match self {
            RecordKind::Trip => Some("nightbus_images"),
            RecordKind::Accommodation => Some("accommodation_images"),
            RecordKind::Budget => None,
        }
    }

    /// Trips keep whatever photos made it; accommodations are all-or-nothing.
    pub fn upload_policy(&self) -> UploadPolicy {
        match self {
            RecordKind::Trip => UploadPolicy::BestEffort,
            RecordKind::Accommodation | RecordKind::Budget => UploadPolicy::Strict,
        }
    }

    /// Document field the derived display name is written to.
    pub fn display_field(&self) -> &'static str {
        match self {
            RecordKind::Trip => "tripName",
            RecordKind::Accommodation => "accommodationName",
            RecordKind::Budget => "budgetName",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RecordKind::Trip => "夜行バス",
            RecordKind::Accommodation => "宿泊先",
            RecordKind::Budget => "予算",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.collection())
    }
}

/// A persisted planner record.
///
/// Implementors decode tolerantly (see [`crate::lenient`]) and declare their
/// form rules with `validator` attributes.
pub trait Record: Serialize + DeserializeOwned + Validate + Default + Clone + Send + Sync + 'static {
    const KIND: RecordKind;

    fn owner_id(&self) -> &str;
    fn set_owner_id(&mut self, owner_id: String);

    fn created_at(&self) -> DateTime<Utc>;
    fn set_created_at(&mut self, created_at: DateTime<Utc>);

    fn images(&self) -> &[String] {
        &[]
    }

    fn set_images(&mut self, _images: Vec<String>) {}

    fn display_name(&self) -> String;
}

/// Dates are shown the way the Japanese locale prints them: `2024/8/1`.
pub fn date_label(date: Option<DateTime<Utc>>) -> String {
    match date {
        Some(ts) => match FixedOffset::east_opt(9 * 3600) {
            Some(jst) => ts.with_timezone(&jst).format("%Y/%-m/%-d").to_string(),
            None => ts.format("%Y/%-m/%-d").to_string(),
        },
        None => "未定".to_string(),
    }
}

/// Whole yen with thousands separators.
pub fn yen(amount: f64) -> String {
    let rounded = amount.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn kinds_know_their_storage() {
        assert_eq!(RecordKind::Trip.collection(), "night_buses");
        assert_eq!(RecordKind::Accommodation.image_prefix(), Some("accommodation_images"));
        assert_eq!(RecordKind::Budget.image_prefix(), None);
        assert_eq!(RecordKind::Trip.upload_policy(), UploadPolicy::BestEffort);
        assert_eq!(RecordKind::Accommodation.upload_policy(), UploadPolicy::Strict);
    }

    #[test]
    fn dates_render_in_japan_time() {
        // 16:00 UTC is already the next day in Tokyo
        let late = Utc.with_ymd_and_hms(2024, 8, 1, 16, 0, 0).unwrap();
        assert_eq!(date_label(Some(late)), "2024/8/2");
        assert_eq!(date_label(None), "未定");
    }

    #[test]
    fn yen_groups_thousands() {
        assert_eq!(yen(0.0), "0");
        assert_eq!(yen(999.0), "999");
        assert_eq!(yen(12000.0), "12,000");
        assert_eq!(yen(1234567.4), "1,234,567");
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::kind::{date_label, Record, RecordKind};
use crate::lenient;

/// A night-bus leg.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct Trip {
    #[serde(deserialize_with = "lenient::text")]
    pub owner_id: String,

    #[validate(length(min = 1, message = "出発地を入力してください。"))]
    #[serde(deserialize_with = "lenient::text")]
    pub from: String,

    #[validate(length(min = 1, message = "到着地を入力してください。"))]
    #[serde(deserialize_with = "lenient::text")]
    pub to: String,

    #[validate(length(min = 1, message = "出発バス停を入力してください。"))]
    #[serde(deserialize_with = "lenient::text")]
    pub from_station: String,

    #[validate(length(min = 1, message = "到着バス停を入力してください。"))]
    #[serde(deserialize_with = "lenient::text")]
    pub to_station: String,

    #[serde(deserialize_with = "lenient::text")]
    pub bus_name: String,

    #[validate(range(min = 0.0, message = "バス料金は0以上の数値を入力してください。"))]
    #[serde(deserialize_with = "lenient::amount")]
    pub bus_price: f64,

    #[validate(required(message = "出発日を選択してください。"))]
    #[serde(deserialize_with = "lenient::timestamp", serialize_with = "lenient::serialize_timestamp")]
    pub from_date: Option<DateTime<Utc>>,

    #[serde(deserialize_with = "lenient::timestamp", serialize_with = "lenient::serialize_timestamp")]
    pub to_date: Option<DateTime<Utc>>,

    #[serde(deserialize_with = "lenient::amount")]
    pub amount: f64,

    #[serde(deserialize_with = "lenient::text")]
    pub note: String,

    #[serde(deserialize_with = "lenient::urls")]
    pub images: Vec<String>,

    #[serde(deserialize_with = "lenient::created_at")]
    pub created_at: DateTime<Utc>,
}

impl Record for Trip {
    const KIND: RecordKind = RecordKind::Trip;

    fn owner_id(&self) -> &str {
        &self.owner_id
    }

    fn set_owner_id(&mut self, owner_id: String) {
        self.owner_id = owner_id;
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn set_created_at(&mut self, created_at: DateTime<Utc>) {
        self.created_at = created_at;
    }

    fn images(&self) -> &[String] {
        &self.images
    }

    fn set_images(&mut self, images: Vec<String>) {
        self.images = images;
    }

    fn display_name(&self) -> String {
        format!("{} → {} ({})", self.from_station, self.to_station, date_label(self.from_date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{decode, form, Saved};
    use chrono::TimeZone;
    use livebus_core::StoredDocument;
    use serde_json::json;

    fn valid() -> Trip {
        Trip {
            from: "東京".into(),
            to: "大阪".into(),
            from_station: "バスタ新宿".into(),
            to_station: "大阪駅".into(),
            bus_price: 4500.0,
            from_date: Some(Utc.with_ymd_and_hms(2024, 8, 1, 13, 0, 0).unwrap()),
            ..Trip::default()
        }
    }

    #[test]
    fn display_name_uses_stations_and_departure() {
        assert_eq!(valid().display_name(), "バスタ新宿 → 大阪駅 (2024/8/1)");

        let undecided = Trip {
            from_date: None,
            ..valid()
        };
        assert_eq!(undecided.display_name(), "バスタ新宿 → 大阪駅 (未定)");
    }

    #[test]
    fn form_rules() {
        assert!(form::check(&valid()).is_ok());

        let missing = Trip {
            from_station: String::new(),
            from_date: None,
            bus_price: -1.0,
            ..valid()
        };
        let err = form::check(&missing).unwrap_err();
        assert_eq!(err.reasons.len(), 3);
        assert!(err.reasons.iter().any(|r| r.contains("出発日")));
    }

    #[test]
    fn decodes_legacy_documents() {
        let data = json!({
            "userId": "u1",
            "fromStation": "バスタ新宿",
            "busPrice": "3,800",
            "fromDate": {"seconds": 1722517200, "nanoseconds": 0},
            "images": ["https://a", 7, ""],
            "createdAt": "not a date",
            "tripName": "ignored"
        });
        let saved: Saved<Trip> = decode(StoredDocument {
            id: "t1".into(),
            data: data.as_object().cloned().unwrap(),
        });
        let trip = saved.record;

        assert_eq!(trip.owner_id, "u1");
        assert_eq!(trip.bus_price, 3800.0);
        assert!(trip.from_date.is_some());
        assert_eq!(trip.images, vec!["https://a".to_string()]);
        assert_eq!(trip.created_at, DateTime::<Utc>::default());
        assert_eq!(trip.to, "");
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::kind::{date_label, Record, RecordKind};
use crate::lenient;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct Accommodation {
    #[serde(deserialize_with = "lenient::text")]
    pub owner_id: String,

    #[validate(length(min = 1, message = "宿泊先名を入力してください。"))]
    #[serde(deserialize_with = "lenient::text")]
    pub name: String,

    #[serde(deserialize_with = "lenient::text")]
    pub address: String,

    /// Check-in time as typed, e.g. `15:00`.
    #[serde(deserialize_with = "lenient::text")]
    pub check_in: String,

    #[serde(deserialize_with = "lenient::text")]
    pub check_out: String,

    #[validate(range(min = 0.0, message = "料金は0以上の数値を入力してください。"))]
    #[serde(deserialize_with = "lenient::amount")]
    pub price: f64,

    #[serde(deserialize_with = "lenient::timestamp", serialize_with = "lenient::serialize_timestamp")]
    pub from_date: Option<DateTime<Utc>>,

    #[serde(deserialize_with = "lenient::timestamp", serialize_with = "lenient::serialize_timestamp")]
    pub to_date: Option<DateTime<Utc>>,

    #[serde(deserialize_with = "lenient::text")]
    pub note: String,

    #[serde(deserialize_with = "lenient::urls")]
    pub images: Vec<String>,

    #[serde(deserialize_with = "lenient::created_at")]
    pub created_at: DateTime<Utc>,
}

impl Record for Accommodation {
    const KIND: RecordKind = RecordKind::Accommodation;

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
        format!("{} ({})", self.name, date_label(self.from_date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form;
    use serde_json::json;

    #[test]
    fn display_name_falls_back_to_undecided() {
        let stay = Accommodation {
            name: "ホテル梅田".into(),
            ..Default::default()
        };
        assert_eq!(stay.display_name(), "ホテル梅田 (未定)");
    }

    #[test]
    fn name_is_required_and_price_non_negative() {
        let err = form::check(&Accommodation {
            price: -100.0,
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(
            err.reasons,
            vec![
                "宿泊先名を入力してください。".to_string(),
                "料金は0以上の数値を入力してください。".to_string(),
            ]
        );
    }

    #[test]
    fn price_stored_as_text_still_decodes() {
        let stay: Accommodation = serde_json::from_value(json!({
            "ownerId": "u1",
            "name": "ホテル梅田",
            "price": "8800",
            "checkIn": "15:00"
        }))
        .unwrap();
        assert_eq!(stay.price, 8800.0);
        assert_eq!(stay.check_in, "15:00");
        assert!(stay.images.is_empty());
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::kind::{date_label, yen, Record, RecordKind};
use crate::lenient;

/// Planned spending for one outing. Older clients stored the amounts as
/// strings straight from the input boxes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct Budget {
    #[serde(deserialize_with = "lenient::text")]
    pub owner_id: String,

    #[validate(range(min = 0.0, message = "交通料金は0以上の数値を入力してください。"))]
    #[serde(deserialize_with = "lenient::amount")]
    pub bus: f64,
    #[validate(range(min = 0.0, message = "宿泊先料金は0以上の数値を入力してください。"))]
    #[serde(deserialize_with = "lenient::amount")]
    pub hotel: f64,
    #[validate(range(min = 0.0, message = "チケット料金は0以上の数値を入力してください。"))]
    #[serde(deserialize_with = "lenient::amount")]
    pub ticket: f64,
    #[validate(range(min = 0.0, message = "グッズ料金は0以上の数値を入力してください。"))]
    #[serde(deserialize_with = "lenient::amount")]
    pub goods: f64,

    #[serde(deserialize_with = "lenient::text")]
    pub bus_memo: String,
    #[serde(deserialize_with = "lenient::text")]
    pub hotel_memo: String,
    #[serde(deserialize_with = "lenient::text")]
    pub ticket_memo: String,
    #[serde(deserialize_with = "lenient::text")]
    pub goods_memo: String,
    #[serde(deserialize_with = "lenient::text")]
    pub total_memo: String,

    #[serde(deserialize_with = "lenient::timestamp", serialize_with = "lenient::serialize_timestamp")]
    pub from_date: Option<DateTime<Utc>>,

    #[serde(deserialize_with = "lenient::timestamp", serialize_with = "lenient::serialize_timestamp")]
    pub to_date: Option<DateTime<Utc>>,

    #[serde(deserialize_with = "lenient::created_at")]
    pub created_at: DateTime<Utc>,
}

impl Budget {
    pub fn total(&self) -> f64 {
        self.bus + self.hotel + self.ticket + self.goods
    }

    /// `(label, amount)` per category, in display order.
    pub fn breakdown(&self) -> [(&'static str, f64); 4] {
        [
            ("夜行バス料金", self.bus),
            ("宿泊先料金", self.hotel),
            ("チケット料金", self.ticket),
            ("グッズ料金", self.goods),
        ]
    }
}

impl Record for Budget {
    const KIND: RecordKind = RecordKind::Budget;

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

    fn display_name(&self) -> String {
        format!("予算 {} (¥{})", date_label(self.from_date), yen(self.total()))
    }
}

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct PriceDetail {
    pub currency_code: String,
    pub units: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct PriceRange {
    #[serde(default)]
    pub start_price: Option<PriceDetail>,
    #[serde(default)]
    pub end_price: Option<PriceDetail>,
}

impl PriceRange {
    /// Render the range as e.g. `100-200 TRY`, `from 100 TRY` or `up to 200 TRY`.
    pub fn display(&self) -> Option<String> {
        match (&self.start_price, &self.end_price) {
            (Some(start), Some(end)) if start.currency_code == end.currency_code => Some(format!(
                "{}-{} {}",
                start.units, end.units, start.currency_code
            )),
            (Some(start), Some(end)) => Some(format!(
                "{} {} - {} {}",
                start.units, start.currency_code, end.units, end.currency_code
            )),
            (Some(start), None) => Some(format!("from {} {}", start.units, start.currency_code)),
            (None, Some(end)) => Some(format!("up to {} {}", end.units, end.currency_code)),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct OpeningHours {
    #[serde(default)]
    pub open_now: Option<bool>,
    #[serde(default)]
    pub weekday_descriptions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Cafe {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub google_maps_uri: Option<String>,
    #[serde(default)]
    pub business_status: Option<String>,
    #[serde(default)]
    pub primary_type: Option<String>,
    #[serde(default)]
    pub price_range: Option<PriceRange>,
    #[serde(default)]
    pub opening_hours: Option<OpeningHours>,
    #[serde(default)]
    pub photos: Vec<String>,
    #[serde(default)]
    pub allows_dogs: Option<bool>,
    #[serde(default)]
    pub delivery: Option<bool>,
    #[serde(default)]
    pub reservable: Option<bool>,
    #[serde(default)]
    pub serves_breakfast: Option<bool>,
    #[serde(default)]
    pub serves_lunch: Option<bool>,
    #[serde(default)]
    pub serves_dinner: Option<bool>,
    #[serde(default)]
    pub serves_vegetarian_food: Option<bool>,
}

impl Cafe {
    pub fn rating_display(&self) -> String {
        match self.rating {
            Some(rating) => format!("{:.1}", rating),
            None => "-".to_string(),
        }
    }

    pub fn is_open_now(&self) -> Option<bool> {
        self.opening_hours.as_ref().and_then(|h| h.open_now)
    }

    pub fn price_display(&self) -> Option<String> {
        self.price_range.as_ref().and_then(PriceRange::display)
    }

    /// Meals the cafe is known to serve, in service order.
    pub fn meals(&self) -> Vec<&'static str> {
        [
            (self.serves_breakfast, "Breakfast"),
            (self.serves_lunch, "Lunch"),
            (self.serves_dinner, "Dinner"),
        ]
        .into_iter()
        .filter(|(served, _)| *served == Some(true))
        .map(|(_, meal)| meal)
        .collect()
    }

    pub fn is_operational(&self) -> bool {
        self.business_status
            .as_deref()
            .map(|s| s == "OPERATIONAL")
            .unwrap_or(true)
    }
}

/// Response body of the search, top-places and favorites endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct CafeList {
    #[serde(default)]
    pub cafes: Vec<Cafe>,
    #[serde(default)]
    pub total: u32,
}

pub type SearchResponse = CafeList;
pub type FavoritesResponse = CafeList;

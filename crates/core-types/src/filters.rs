use serde::{Deserialize, Serialize};

/// `userLocation{lat, lng}` from the submission interface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UserLocation {
    pub lat: f64,
    pub lng: f64,
}

impl UserLocation {
    pub fn validate(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }
}

/// `filters{openNow?, priceLevel?, dietary?, mustHave?}` from the submission
/// interface.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_now: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_level: Option<u8>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dietary: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub must_have: Vec<String>,
}

impl Filters {
    pub fn validate(&self) -> bool {
        self.price_level.map_or(true, |p| (1..=4).contains(&p))
    }
}

/// The request submission body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub query: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub user_location: Option<UserLocation>,
    #[serde(default)]
    pub filters: Option<Filters>,
    #[serde(default)]
    pub clear_context: bool,
}

impl Submission {
    /// `query (1..500 chars)`.
    pub fn validate(&self) -> bool {
        let len = self.query.chars().count();
        if !(1..=500).contains(&len) {
            return false;
        }
        if let Some(loc) = &self.user_location {
            if !loc.validate() {
                return false;
            }
        }
        if let Some(f) = &self.filters {
            if !f.validate() {
                return false;
            }
        }
        true
    }
}

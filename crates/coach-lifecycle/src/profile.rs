// profile.rs — Records attached to a request over its life: the biometric
// profile, chat messages, and progress samples.
//
// Photo and receipt uploads are opaque reference strings here; storing the
// bytes is someone else's job.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LifecycleError;

/// Maximum number of photo references on a biometric profile.
pub const MAX_PHOTOS: usize = 3;

/// Body measurements in centimetres.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Measurements {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chest: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hip: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thigh: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waist: Option<f64>,
}

/// Structured intake the subject submits once payment is confirmed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BiometricProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    /// Height in centimetres.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    /// Weight in kilograms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blood_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplement_history: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wake_up_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sleep_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub training_time_pref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub injury_history: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
    #[serde(default)]
    pub measurements: Measurements,
    /// Opaque photo references, at most [`MAX_PHOTOS`].
    #[serde(default)]
    pub photos: Vec<String>,
}

impl BiometricProfile {
    pub fn validate(&self) -> Result<(), LifecycleError> {
        if self.photos.len() > MAX_PHOTOS {
            return Err(LifecycleError::TooManyPhotos {
                count: self.photos.len(),
                max: MAX_PHOTOS,
            });
        }
        Ok(())
    }

    /// Body-mass index, or `None` when height or weight is missing or zero.
    pub fn bmi(&self) -> Option<f64> {
        let height_m = self.height.filter(|h| *h > 0.0)? / 100.0;
        let weight = self.weight.filter(|w| *w > 0.0)?;
        Some(weight / (height_m * height_m))
    }
}

/// One chat message on a request. The list is append-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub sender_id: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub is_read: bool,
}

impl Message {
    pub fn new(sender_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender_id: sender_id.into(),
            text: text.into(),
            timestamp: Utc::now(),
            is_read: false,
        }
    }
}

/// A dated body-weight sample. The log is append-only, in date order of entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSample {
    pub date: NaiveDate,
    pub weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waist: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arm: Option<f64>,
}

impl ProgressSample {
    pub fn new(date: NaiveDate, weight: f64) -> Self {
        Self {
            date,
            weight,
            waist: None,
            arm: None,
        }
    }
}

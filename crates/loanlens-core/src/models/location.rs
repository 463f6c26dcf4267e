use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::permission::PermissionStatus;

/// A single GPS reading. Replaced wholesale whenever a fresh fix arrives.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoFix {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp_millis: i64,
}

impl GeoFix {
    pub fn new(latitude: f64, longitude: f64, timestamp_millis: i64) -> Self {
        Self {
            latitude,
            longitude,
            timestamp_millis,
        }
    }

    /// Capture instant of the fix; out-of-range timestamps fall back to now.
    pub fn captured_at(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.timestamp_millis)
            .single()
            .unwrap_or_else(Utc::now)
    }
}

/// Label for the GPS indicator shown while the camera is live.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocationStatus {
    Fixed { latitude: f64, longitude: f64 },
    PermissionRequired,
    Acquiring,
}

impl LocationStatus {
    pub fn from_parts(fix: Option<&GeoFix>, permission: PermissionStatus) -> Self {
        match fix {
            Some(fix) => LocationStatus::Fixed {
                latitude: fix.latitude,
                longitude: fix.longitude,
            },
            None if permission.is_denied() => LocationStatus::PermissionRequired,
            None => LocationStatus::Acquiring,
        }
    }
}

impl fmt::Display for LocationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationStatus::Fixed {
                latitude,
                longitude,
            } => write!(f, "{:.4}, {:.4}", latitude, longitude),
            LocationStatus::PermissionRequired => write!(f, "Location permission required"),
            LocationStatus::Acquiring => write!(f, "Fetching GPS lock…"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captured_at_uses_fix_timestamp() {
        let fix = GeoFix::new(12.97, 77.59, 1_700_000_000_000);
        assert_eq!(
            fix.captured_at().to_rfc3339(),
            "2023-11-14T22:13:20+00:00"
        );
    }

    #[test]
    fn status_labels() {
        let fix = GeoFix::new(12.97, 77.59, 0);
        assert_eq!(
            LocationStatus::from_parts(Some(&fix), PermissionStatus::Granted).to_string(),
            "12.9700, 77.5900"
        );
        assert_eq!(
            LocationStatus::from_parts(None, PermissionStatus::Denied).to_string(),
            "Location permission required"
        );
        assert_eq!(
            LocationStatus::from_parts(None, PermissionStatus::Unknown),
            LocationStatus::Acquiring
        );
    }
}

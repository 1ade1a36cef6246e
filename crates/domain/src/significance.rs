//! Significance filter — decides whether a session write deserves a notification.
//!
//! Session topics are fed by sensors that repeat themselves constantly.
//! A write is only fanned out when it carries news:
//! - the first write to a topic always notifies;
//! - a value equal to the current one never notifies;
//! - a GPS coordinate that moves the known position by no more than
//!   [`GPS_THRESHOLD_KM`] within [`GPS_WINDOW_MINUTES`] of the previous
//!   write does not notify.

use chrono::Duration;

use crate::gps::{GeoPoint, LAT_TOPIC, LNG_TOPIC};
use crate::time::{Timestamp, within};
use crate::topic::Topic;
use crate::value::Value;

/// Minimum displacement, in kilometres, for a GPS write to notify.
pub const GPS_THRESHOLD_KM: f64 = 0.1;

/// GPS writes older than this are always significant.
pub const GPS_WINDOW_MINUTES: i64 = 15;

/// Everything the filter needs to know about one write.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub topic: &'a Topic,
    /// Value held before this write, `None` on the first write.
    pub old: Option<&'a Value>,
    pub new: &'a Value,
    /// When the topic was previously written.
    pub previous_write: Option<Timestamp>,
    /// Current `gps.lat` before this write.
    pub lat: Option<&'a Value>,
    /// Current `gps.lng` before this write.
    pub lng: Option<&'a Value>,
    pub now: Timestamp,
}

/// Outcome of filtering one write.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    /// Fan the write out to subscribers.
    Notify,
    /// Same value as before.
    Unchanged,
    /// A GPS write that moved less than the threshold.
    Insignificant { distance_km: f64 },
    /// A GPS write whose coordinates could not be read as numbers.
    Unparsable,
}

impl Verdict {
    #[must_use]
    pub fn should_notify(self) -> bool {
        matches!(self, Self::Notify)
    }
}

/// Tunable significance policy for the ephemeral store.
#[derive(Debug, Clone, Copy)]
pub struct SignificanceFilter {
    pub gps_window: Duration,
    pub gps_threshold_km: f64,
}

impl Default for SignificanceFilter {
    fn default() -> Self {
        Self {
            gps_window: Duration::minutes(GPS_WINDOW_MINUTES),
            gps_threshold_km: GPS_THRESHOLD_KM,
        }
    }
}

impl SignificanceFilter {
    #[must_use]
    pub fn evaluate(&self, write: &Candidate<'_>) -> Verdict {
        let Some(old) = write.old else {
            return Verdict::Notify;
        };
        if old == write.new {
            return Verdict::Unchanged;
        }

        let is_gps = matches!(write.topic.as_str(), LAT_TOPIC | LNG_TOPIC);
        let recent = write
            .previous_write
            .is_some_and(|at| within(at, write.now, self.gps_window));
        match (is_gps && recent, write.lat, write.lng) {
            (true, Some(lat), Some(lng)) => self.compare_positions(write, lat, lng),
            _ => Verdict::Notify,
        }
    }

    fn compare_positions(&self, write: &Candidate<'_>, lat: &Value, lng: &Value) -> Verdict {
        let (Some(old_lat), Some(old_lng), Some(new)) =
            (lat.as_f64(), lng.as_f64(), write.new.as_f64())
        else {
            return Verdict::Unparsable;
        };
        let old_point = GeoPoint::new(old_lat, old_lng);
        let new_point = if write.topic.as_str() == LAT_TOPIC {
            GeoPoint::new(new, old_lng)
        } else {
            GeoPoint::new(old_lat, new)
        };

        let distance_km = old_point.great_circle_distance(new_point);
        if distance_km > self.gps_threshold_km {
            Verdict::Notify
        } else {
            Verdict::Insignificant { distance_km }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::now;

    fn gps_write<'a>(
        topic: &'a Topic,
        old: &'a Value,
        new: &'a Value,
        lat: &'a Value,
        lng: &'a Value,
        age: Duration,
    ) -> Candidate<'a> {
        let now = now();
        Candidate {
            topic,
            old: Some(old),
            new,
            previous_write: Some(now - age),
            lat: Some(lat),
            lng: Some(lng),
            now,
        }
    }

    #[test]
    fn should_notify_first_write() {
        let topic = Topic::new("acc_power");
        let new = Value::Bool(true);
        let write = Candidate {
            topic: &topic,
            old: None,
            new: &new,
            previous_write: None,
            lat: None,
            lng: None,
            now: now(),
        };
        assert_eq!(SignificanceFilter::default().evaluate(&write), Verdict::Notify);
    }

    #[test]
    fn should_suppress_unchanged_value() {
        let topic = Topic::new("acc_power");
        let value = Value::Bool(true);
        let write = Candidate {
            topic: &topic,
            old: Some(&value),
            new: &value,
            previous_write: Some(now()),
            lat: None,
            lng: None,
            now: now(),
        };
        assert_eq!(
            SignificanceFilter::default().evaluate(&write),
            Verdict::Unchanged
        );
    }

    #[test]
    fn should_notify_changed_value() {
        let topic = Topic::new("acc_power");
        let old = Value::Bool(false);
        let new = Value::Bool(true);
        let write = Candidate {
            topic: &topic,
            old: Some(&old),
            new: &new,
            previous_write: Some(now()),
            lat: None,
            lng: None,
            now: now(),
        };
        assert!(SignificanceFilter::default().evaluate(&write).should_notify());
    }

    #[test]
    fn should_suppress_gps_move_within_threshold() {
        let topic = Topic::new("gps.lat");
        let lat = Value::from("40.0000");
        let lng = Value::from("-75.0000");
        let new = Value::from("40.0005");
        let write = gps_write(&topic, &lat, &new, &lat, &lng, Duration::minutes(1));
        let verdict = SignificanceFilter::default().evaluate(&write);
        assert!(matches!(verdict, Verdict::Insignificant { distance_km } if distance_km <= 0.1));
    }

    #[test]
    fn should_notify_gps_move_beyond_threshold() {
        let topic = Topic::new("gps.lat");
        let lat = Value::from("40.0000");
        let lng = Value::from("-75.0000");
        let new = Value::from("40.0100");
        let write = gps_write(&topic, &lat, &new, &lat, &lng, Duration::minutes(1));
        assert_eq!(SignificanceFilter::default().evaluate(&write), Verdict::Notify);
    }

    #[test]
    fn should_compare_longitude_moves_against_old_latitude() {
        let topic = Topic::new("gps.lng");
        let lat = Value::from("40.0000");
        let lng = Value::from("-75.0000");
        let new = Value::from("-75.0005");
        let write = gps_write(&topic, &lng, &new, &lat, &lng, Duration::minutes(1));
        assert!(matches!(
            SignificanceFilter::default().evaluate(&write),
            Verdict::Insignificant { .. }
        ));
    }

    #[test]
    fn should_notify_small_gps_move_after_window() {
        let topic = Topic::new("gps.lat");
        let lat = Value::from("40.0000");
        let lng = Value::from("-75.0000");
        let new = Value::from("40.0005");
        let write = gps_write(&topic, &lat, &new, &lat, &lng, Duration::minutes(16));
        assert_eq!(SignificanceFilter::default().evaluate(&write), Verdict::Notify);
    }

    #[test]
    fn should_notify_gps_when_other_coordinate_unknown() {
        let topic = Topic::new("gps.lat");
        let old = Value::from("40.0000");
        let new = Value::from("40.0005");
        let now = now();
        let write = Candidate {
            topic: &topic,
            old: Some(&old),
            new: &new,
            previous_write: Some(now),
            lat: Some(&old),
            lng: None,
            now,
        };
        assert_eq!(SignificanceFilter::default().evaluate(&write), Verdict::Notify);
    }

    #[test]
    fn should_flag_unparsable_coordinates() {
        let topic = Topic::new("gps.lat");
        let lat = Value::from("40.0000");
        let lng = Value::from("-75.0000");
        let new = Value::from("no fix");
        let write = gps_write(&topic, &lat, &new, &lat, &lng, Duration::minutes(1));
        assert_eq!(
            SignificanceFilter::default().evaluate(&write),
            Verdict::Unparsable
        );
    }
}

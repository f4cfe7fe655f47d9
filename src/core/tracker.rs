use crate::core::models::TrackedItem;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerConfig {
    pub cooldown: Duration,
    pub max_notifications: u32,
    pub retention: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            cooldown: Duration::hours(24),
            max_notifications: 3,
            retention: Duration::days(7),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Never observed before.
    First,
    /// Tracked, under the cap and past the cooldown.
    Repeat { notification_count: u32 },
    Suppressed(Suppression),
}

impl Decision {
    pub fn is_eligible(&self) -> bool {
        !matches!(self, Decision::Suppressed(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suppression {
    CapReached,
    Cooldown { remaining: Duration },
}

/// Serializable copy of the tracker state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerSnapshot {
    pub saved_at: DateTime<Utc>,
    pub items: Vec<TrackedItem>,
}

/// Decides whether an observed identifier should trigger a notification and
/// keeps the per-identifier lifecycle state.
///
/// The cooldown is measured from the last *observation*, not the last
/// notification: an item that keeps showing up never becomes eligible again
/// until it has been absent for a full cooldown window.
#[derive(Debug, Clone, Default)]
pub struct VinTracker {
    config: TrackerConfig,
    items: HashMap<String, TrackedItem>,
}

impl VinTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            items: HashMap::new(),
        }
    }

    pub fn restore(config: TrackerConfig, snapshot: TrackerSnapshot) -> Self {
        let mut items = HashMap::with_capacity(snapshot.items.len());
        for item in snapshot.items {
            // Last write wins if a hand-edited snapshot repeats an id.
            items.insert(item.id.clone(), item);
        }
        Self { config, items }
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> TrackerSnapshot {
        let mut items: Vec<TrackedItem> = self.items.values().cloned().collect();
        items.sort_by(|a, b| a.first_seen.cmp(&b.first_seen).then_with(|| a.id.cmp(&b.id)));
        TrackerSnapshot {
            saved_at: now,
            items,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn decide(&self, id: &str, now: DateTime<Utc>) -> Decision {
        let Some(item) = self.items.get(id) else {
            return Decision::First;
        };

        if item.notification_count >= self.config.max_notifications {
            return Decision::Suppressed(Suppression::CapReached);
        }

        let elapsed = now - item.last_seen;
        if elapsed >= self.config.cooldown {
            Decision::Repeat {
                notification_count: item.notification_count,
            }
        } else {
            Decision::Suppressed(Suppression::Cooldown {
                remaining: self
                    .config
                    .cooldown
                    .checked_sub(&elapsed)
                    .unwrap_or(Duration::MAX),
            })
        }
    }

    pub fn should_notify(&self, id: &str, now: DateTime<Utc>) -> bool {
        self.decide(id, now).is_eligible()
    }

    /// Must be called once per observed item per cycle, whether or not a
    /// notification went out.
    pub fn record_observation(&mut self, id: &str, now: DateTime<Utc>, notified: bool) {
        match self.items.get_mut(id) {
            Some(item) => {
                if now > item.last_seen {
                    item.last_seen = now;
                }
                if notified {
                    item.notification_count = item.notification_count.saturating_add(1);
                }
            }
            None => {
                self.items.insert(
                    id.to_string(),
                    TrackedItem {
                        id: id.to_string(),
                        first_seen: now,
                        last_seen: now,
                        notification_count: u32::from(notified),
                    },
                );
            }
        }
    }

    /// Drops every item idle for longer than the retention window and returns
    /// how many were removed.
    pub fn cleanup(&mut self, now: DateTime<Utc>) -> usize {
        // A retention reaching past the earliest representable time keeps everything.
        let Some(threshold) = now.checked_sub_signed(self.config.retention) else {
            return 0;
        };
        let before = self.items.len();
        self.items.retain(|_, item| item.last_seen >= threshold);
        let removed = before - self.items.len();

        if removed > 0 {
            tracing::info!(
                removed,
                remaining = self.items.len(),
                "Cleaned up stale VIN records"
            );
        }

        removed
    }

    pub fn is_tracked(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&TrackedItem> {
        self.items.get(id)
    }

    pub fn items(&self) -> impl Iterator<Item = &TrackedItem> {
        self.items.values()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn tracker() -> VinTracker {
        VinTracker::new(TrackerConfig::default())
    }

    #[test]
    fn test_unknown_id_is_eligible() {
        let tracker = tracker();
        assert!(tracker.should_notify("A", t0()));
        assert_eq!(tracker.decide("A", t0()), Decision::First);
        assert!(!tracker.is_tracked("A"));
    }

    #[test]
    fn test_should_notify_does_not_mutate() {
        let tracker = tracker();
        tracker.should_notify("A", t0());
        tracker.decide("A", t0());
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_first_observation_creates_item() {
        let mut tracker = tracker();
        tracker.record_observation("A", t0(), true);
        tracker.record_observation("B", t0(), false);

        let a = tracker.get("A").unwrap();
        assert_eq!(a.first_seen, t0());
        assert_eq!(a.last_seen, t0());
        assert_eq!(a.notification_count, 1);
        assert_eq!(tracker.get("B").unwrap().notification_count, 0);
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn test_cooldown_boundary_is_inclusive() {
        let mut tracker = tracker();
        tracker.record_observation("A", t0(), true);

        let at_boundary = t0() + Duration::hours(24);
        assert!(tracker.should_notify("A", at_boundary));
        assert_eq!(
            tracker.decide("A", at_boundary),
            Decision::Repeat {
                notification_count: 1
            }
        );

        let just_before = at_boundary - Duration::nanoseconds(1);
        assert!(!tracker.should_notify("A", just_before));
        assert_eq!(
            tracker.decide("A", just_before),
            Decision::Suppressed(Suppression::Cooldown {
                remaining: Duration::nanoseconds(1)
            })
        );
    }

    #[test]
    fn test_cap_is_permanent() {
        let mut tracker = tracker();
        tracker.record_observation("A", t0(), true);
        tracker.record_observation("A", t0() + Duration::hours(24), true);
        tracker.record_observation("A", t0() + Duration::hours(48), true);

        for days in [3, 30, 365] {
            let later = t0() + Duration::days(days);
            assert!(!tracker.should_notify("A", later));
            assert_eq!(
                tracker.decide("A", later),
                Decision::Suppressed(Suppression::CapReached)
            );
        }
    }

    #[test]
    fn test_first_seen_fixed_and_last_seen_monotonic() {
        let mut tracker = tracker();
        tracker.record_observation("A", t0(), false);
        tracker.record_observation("A", t0() + Duration::hours(2), true);
        // Clock stepped backwards.
        tracker.record_observation("A", t0() + Duration::hours(1), false);

        let a = tracker.get("A").unwrap();
        assert_eq!(a.first_seen, t0());
        assert_eq!(a.last_seen, t0() + Duration::hours(2));
        assert_eq!(a.notification_count, 1);
    }

    #[test]
    fn test_notify_cycle_until_cap() {
        let mut tracker = tracker();
        let hour = Duration::hours(1);

        assert!(tracker.should_notify("A", t0()));
        tracker.record_observation("A", t0(), true);
        assert_eq!(tracker.get("A").unwrap().notification_count, 1);

        assert!(!tracker.should_notify("A", t0() + hour));

        let day1 = t0() + Duration::hours(24);
        assert!(tracker.should_notify("A", day1));
        tracker.record_observation("A", day1, true);
        assert_eq!(tracker.get("A").unwrap().notification_count, 2);

        let day2 = t0() + Duration::hours(48);
        assert!(tracker.should_notify("A", day2));
        tracker.record_observation("A", day2, true);

        let day3 = t0() + Duration::hours(72);
        assert_eq!(tracker.get("A").unwrap().notification_count, 3);
        assert!(!tracker.should_notify("A", day3));
        assert!(!tracker.should_notify("A", day3 + Duration::days(100)));
    }

    #[test]
    fn test_repeated_sightings_keep_resetting_cooldown() {
        let mut tracker = tracker();
        tracker.record_observation("B", t0(), false);

        for hour in 1..=10 {
            let now = t0() + Duration::hours(hour);
            assert!(!tracker.should_notify("B", now));
            tracker.record_observation("B", now, false);
            assert_eq!(tracker.get("B").unwrap().last_seen, now);
        }

        assert_eq!(tracker.get("B").unwrap().notification_count, 0);
    }

    #[test]
    fn test_cleanup_removes_only_stale_items() {
        let mut tracker = tracker();
        let now = t0() + Duration::days(8);
        tracker.record_observation("C", t0(), true);
        tracker.record_observation("D", t0() + Duration::days(2), true);
        tracker.record_observation("D", t0() + Duration::days(2), true);

        let before_d = tracker.get("D").cloned().unwrap();
        assert_eq!(tracker.cleanup(now), 1);

        assert!(!tracker.is_tracked("C"));
        assert_eq!(tracker.get("D"), Some(&before_d));
    }

    #[test]
    fn test_cleanup_retention_boundary() {
        let mut tracker = tracker();
        tracker.record_observation("E", t0(), false);

        // Exactly at the threshold is kept; strictly older is removed.
        assert_eq!(tracker.cleanup(t0() + Duration::days(7)), 0);
        assert_eq!(
            tracker.cleanup(t0() + Duration::days(7) + Duration::seconds(1)),
            1
        );
    }

    #[test]
    fn test_cleanup_with_unbounded_retention_keeps_everything() {
        let mut tracker = VinTracker::new(TrackerConfig {
            retention: Duration::MAX,
            ..TrackerConfig::default()
        });
        tracker.record_observation("A", t0(), true);

        assert_eq!(tracker.cleanup(t0() + Duration::days(365)), 0);
        assert!(tracker.is_tracked("A"));
    }

    #[test]
    fn test_huge_cooldown_with_clock_stepping_back() {
        let tracker_config = TrackerConfig {
            cooldown: Duration::MAX,
            ..TrackerConfig::default()
        };
        let mut tracker = VinTracker::new(tracker_config);
        tracker.record_observation("A", t0(), true);

        let earlier = t0() - Duration::hours(1);
        assert_eq!(
            tracker.decide("A", earlier),
            Decision::Suppressed(Suppression::Cooldown {
                remaining: Duration::MAX
            })
        );
        assert!(!tracker.should_notify("A", t0() + Duration::days(365)));
    }

    #[test]
    fn test_cleanup_is_idempotent() {
        let mut tracker = tracker();
        tracker.record_observation("C", t0(), false);
        let now = t0() + Duration::days(10);
        assert_eq!(tracker.cleanup(now), 1);
        assert_eq!(tracker.cleanup(now), 0);
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_evicted_item_is_new_again() {
        let mut tracker = tracker();
        for day in 0..3 {
            tracker.record_observation("A", t0() + Duration::days(day), true);
        }
        let later = t0() + Duration::days(20);
        assert!(!tracker.should_notify("A", later));

        tracker.cleanup(later);
        assert_eq!(tracker.decide("A", later), Decision::First);
    }

    #[test]
    fn test_snapshot_restore() {
        let mut tracker = tracker();
        tracker.record_observation("A", t0(), true);
        tracker.record_observation("B", t0() + Duration::hours(1), false);

        let snapshot = tracker.snapshot(t0() + Duration::hours(2));
        assert_eq!(snapshot.items.len(), 2);
        assert_eq!(snapshot.items[0].id, "A");

        let restored = VinTracker::restore(TrackerConfig::default(), snapshot);
        assert_eq!(restored.get("A"), tracker.get("A"));
        assert_eq!(restored.get("B"), tracker.get("B"));
    }
}

use std::fmt;

use jiff::{tz::TimeZone, Timestamp};

/// Id reported for a zone that resolved without an IANA name.
pub const UNNAMED_ZONE_ID: &str = "Etc/Unknown";

/// Wall-clock components of an instant in a particular time zone.
///
/// A snapshot: it is recomputed wholesale on every tick and never adjusted in
/// place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClockState {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl ClockState {
    /// Derives the zone-local wall-clock components of `instant`.
    pub fn derive(instant: Timestamp, zone: &TimeZone) -> Self {
        let local = zone.to_datetime(instant);
        Self {
            hour: local.hour() as u8,
            minute: local.minute() as u8,
            second: local.second() as u8,
        }
    }

    /// Resolves `zone_id` and derives the clock state for `instant`.
    ///
    /// Never fails: an unknown zone id falls back to the system zone.
    pub fn update(instant: Timestamp, zone_id: &str) -> Self {
        let resolved = resolve_zone(Some(zone_id));
        Self::derive(instant, resolved.zone())
    }
}

impl fmt::Display for ClockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hour, self.minute, self.second)
    }
}

/// Records that a requested zone id could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneFallback {
    pub requested: String,
    pub reason: String,
}

/// A zone id paired with the rule set it resolved to.
#[derive(Debug, Clone)]
pub struct ResolvedZone {
    id: String,
    zone: TimeZone,
    fallback: Option<ZoneFallback>,
}

impl ResolvedZone {
    /// The host's local system zone.
    pub fn system() -> Self {
        let zone = TimeZone::system();
        Self {
            id: zone_name(&zone),
            zone,
            fallback: None,
        }
    }

    /// Identifier of the zone actually in use.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn zone(&self) -> &TimeZone {
        &self.zone
    }

    /// Set when the requested id was replaced by the system zone.
    pub fn fallback(&self) -> Option<&ZoneFallback> {
        self.fallback.as_ref()
    }
}

impl Default for ResolvedZone {
    fn default() -> Self {
        Self::system()
    }
}

/// Resolves a zone id, substituting the system zone when it is absent or
/// unknown. The substitution is logged and recorded on the result.
pub fn resolve_zone(requested: Option<&str>) -> ResolvedZone {
    let Some(requested) = requested else {
        return ResolvedZone::system();
    };

    match TimeZone::get(requested) {
        Ok(zone) => ResolvedZone {
            id: zone
                .iana_name()
                .map(str::to_string)
                .unwrap_or_else(|| requested.to_string()),
            zone,
            fallback: None,
        },
        Err(err) => {
            tracing::warn!(
                zone_id = requested,
                error = %err,
                "failed to resolve time zone, using system zone"
            );
            let system = ResolvedZone::system();
            ResolvedZone {
                fallback: Some(ZoneFallback {
                    requested: requested.to_string(),
                    reason: err.to_string(),
                }),
                ..system
            }
        }
    }
}

fn zone_name(zone: &TimeZone) -> String {
    zone.iana_name().unwrap_or(UNNAMED_ZONE_ID).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(instant: &str) -> Timestamp {
        instant.parse().unwrap()
    }

    fn state(hour: u8, minute: u8, second: u8) -> ClockState {
        ClockState {
            hour,
            minute,
            second,
        }
    }

    #[test]
    fn derives_local_components_for_named_zones() {
        let instant = at("2024-01-15T12:34:56Z");

        assert_eq!(ClockState::update(instant, "UTC"), state(12, 34, 56));
        assert_eq!(
            ClockState::update(instant, "America/New_York"),
            state(7, 34, 56)
        );
        assert_eq!(
            ClockState::update(instant, "Asia/Kolkata"),
            state(18, 4, 56)
        );
        assert_eq!(
            ClockState::update(instant, "Australia/Sydney"),
            state(23, 34, 56)
        );
    }

    #[test]
    fn follows_daylight_saving_rules() {
        let summer = at("2024-07-01T12:00:00Z");
        assert_eq!(ClockState::update(summer, "America/New_York"), state(8, 0, 0));
        assert_eq!(ClockState::update(summer, "Europe/London"), state(13, 0, 0));
    }

    #[test]
    fn components_stay_in_range_across_a_day() {
        let start = at("2024-03-09T00:00:00Z").as_second();
        for step in 0..(48 * 60) {
            let instant = Timestamp::from_second(start + step * 37).unwrap();
            for zone in ["America/New_York", "Asia/Kathmandu", "Pacific/Chatham"] {
                let derived = ClockState::update(instant, zone);
                assert!(derived.hour <= 23);
                assert!(derived.minute <= 59);
                assert!(derived.second <= 59);

                let reference = instant.to_zoned(TimeZone::get(zone).unwrap());
                assert_eq!(derived.hour as i8, reference.hour());
                assert_eq!(derived.minute as i8, reference.minute());
                assert_eq!(derived.second as i8, reference.second());
            }
        }
    }

    #[test]
    fn unknown_zone_falls_back_to_system_zone() {
        let instant = at("2024-01-15T12:34:56Z");
        let expected = ClockState::derive(instant, &TimeZone::system());

        assert_eq!(ClockState::update(instant, "Not/A_Zone"), expected);
        assert_eq!(ClockState::update(instant, ""), expected);
    }

    #[test]
    fn resolution_records_fallback() {
        let resolved = resolve_zone(Some("Mars/Olympus_Mons"));
        let fallback = resolved.fallback().expect("fallback should be recorded");
        assert_eq!(fallback.requested, "Mars/Olympus_Mons");
        assert_eq!(resolved.id(), ResolvedZone::system().id());

        let named = resolve_zone(Some("America/New_York"));
        assert!(named.fallback().is_none());
        assert_eq!(named.id(), "America/New_York");

        assert!(resolve_zone(None).fallback().is_none());
    }

    #[test]
    fn formats_as_wall_clock_time() {
        assert_eq!(state(7, 5, 9).to_string(), "07:05:09");
    }
}

use serde::{Deserialize, Serialize};

const RELAY_KEY: &str = "RELAY";
const TIME_KEY: &str = "TIME";
const ALARMS_KEY: &str = "ALARMS";

/// Raw fields found in one inbound status blob
///
/// `None` means the field did not appear (or never had a recognisable
/// value). When a field appears several times the last occurrence wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusFields {
    pub relay: Option<bool>,
    pub time: Option<String>,
    pub alarms: Option<u32>,
}

impl StatusFields {
    /// Scan free text for `RELAY=`, `TIME=` and `ALARMS=` fields
    pub fn parse(text: &str) -> Self {
        Self {
            relay: values_of(text, RELAY_KEY).filter_map(relay_token).last(),
            time: values_of(text, TIME_KEY)
                .filter_map(time_token)
                .last()
                .map(str::to_string),
            alarms: values_of(text, ALARMS_KEY).filter_map(count_token).last(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.relay.is_none() && self.time.is_none() && self.alarms.is_none()
    }
}

/// What to do with a field that is missing from a status blob
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MissingFieldPolicy {
    /// Fall back to the field default (off, empty time, zero alarms)
    #[default]
    Reset,
    /// Keep the previously known value
    KeepLast,
}

/// Per-field missing-value policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusPolicy {
    #[serde(default)]
    pub relay: MissingFieldPolicy,
    #[serde(default)]
    pub time: MissingFieldPolicy,
    #[serde(default)]
    pub alarms: MissingFieldPolicy,
}

/// Device status as last decoded
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub relay_on: bool,
    /// `H:MM:SS` as reported by the device, empty if unknown
    pub device_time: String,
    pub alarm_count: u32,
}

impl StatusSnapshot {
    /// Decode a blob with every missing field reset to its default
    pub fn parse(text: &str) -> Self {
        Self::default().merge(StatusFields::parse(text), StatusPolicy::default())
    }

    /// Apply freshly parsed fields on top of this snapshot
    pub fn merge(&self, fields: StatusFields, policy: StatusPolicy) -> Self {
        Self {
            relay_on: pick(fields.relay, &self.relay_on, policy.relay),
            device_time: pick(fields.time, &self.device_time, policy.time),
            alarm_count: pick(fields.alarms, &self.alarm_count, policy.alarms),
        }
    }
}

fn pick<T: Clone + Default>(found: Option<T>, previous: &T, policy: MissingFieldPolicy) -> T {
    match (found, policy) {
        (Some(value), _) => value,
        (None, MissingFieldPolicy::Reset) => T::default(),
        (None, MissingFieldPolicy::KeepLast) => previous.clone(),
    }
}

/// Text following each `KEY=` occurrence, with spaces around `=` skipped
fn values_of<'a>(text: &'a str, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    text.match_indices(key).filter_map(move |(idx, _)| {
        let rest = text[idx + key.len()..].trim_start_matches([' ', '\t']);
        let value = rest.strip_prefix('=')?;
        Some(value.trim_start_matches([' ', '\t']))
    })
}

fn leading(s: &str, pred: impl Fn(char) -> bool) -> &str {
    let end = s.find(|c: char| !pred(c)).unwrap_or(s.len());
    &s[..end]
}

fn relay_token(value: &str) -> Option<bool> {
    let token = leading(value, |c| c.is_ascii_uppercase());
    if token.contains("OFF") {
        Some(false)
    } else if token.contains("ON") {
        Some(true)
    } else {
        None
    }
}

/// `digits:digits:digits`
fn time_token(value: &str) -> Option<&str> {
    let mut end = 0;
    for group in 0..3 {
        if group > 0 {
            if !value[end..].starts_with(':') {
                return None;
            }
            end += 1;
        }
        let digits = leading(&value[end..], |c| c.is_ascii_digit());
        if digits.is_empty() {
            return None;
        }
        end += digits.len();
    }
    Some(&value[..end])
}

fn count_token(value: &str) -> Option<u32> {
    leading(value, |c| c.is_ascii_digit()).parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_status_line() {
        let s = StatusSnapshot::parse("STATUS:RELAY=ON TIME=03:07:00 ALARMS=2");
        assert!(s.relay_on);
        assert_eq!(s.device_time, "03:07:00");
        assert_eq!(s.alarm_count, 2);
    }

    #[test]
    fn test_no_fields_yields_defaults() {
        let s = StatusSnapshot::parse("hello from the switch\r\n");
        assert_eq!(s, StatusSnapshot::default());
        assert!(!s.relay_on);
        assert_eq!(s.device_time, "");
        assert_eq!(s.alarm_count, 0);
        assert!(StatusFields::parse("").is_empty());
    }

    #[test]
    fn test_relay_off() {
        let f = StatusFields::parse("STATUS:RELAY=OFF");
        assert_eq!(f.relay, Some(false));
    }

    #[test]
    fn test_last_match_wins() {
        let text = "RELAY=ON ALARMS=1 TIME=1:02:03\nRELAY=OFF ALARMS=7 TIME=23:59:59";
        let f = StatusFields::parse(text);
        assert_eq!(f.relay, Some(false));
        assert_eq!(f.alarms, Some(7));
        assert_eq!(f.time.as_deref(), Some("23:59:59"));
    }

    #[test]
    fn test_unrecognised_values_are_skipped() {
        let f = StatusFields::parse("RELAY=MAYBE TIME=12:30 ALARMS=many");
        assert_eq!(f, StatusFields::default());

        // A bad later value does not erase an earlier good one
        let f = StatusFields::parse("RELAY=ON RELAY=??");
        assert_eq!(f.relay, Some(true));
    }

    #[test]
    fn test_whitespace_around_equals() {
        let f = StatusFields::parse("STATUS:RELAY = ON  ALARMS= 4");
        assert_eq!(f.relay, Some(true));
        assert_eq!(f.alarms, Some(4));
    }

    #[test]
    fn test_time_keeps_device_formatting() {
        let f = StatusFields::parse("TIME=3:07:00,");
        assert_eq!(f.time.as_deref(), Some("3:07:00"));
    }

    #[test]
    fn test_alarm_overflow_is_ignored() {
        let f = StatusFields::parse("ALARMS=99999999999999");
        assert_eq!(f.alarms, None);
    }

    #[test]
    fn test_reset_policy_clears_missing_relay() {
        let prev = StatusSnapshot::parse("RELAY=ON TIME=10:00:00 ALARMS=3");
        let next = prev.merge(StatusFields::parse("ALARMS=3"), StatusPolicy::default());
        assert!(!next.relay_on);
        assert_eq!(next.device_time, "");
    }

    #[test]
    fn test_keep_last_policy_preserves_missing_fields() {
        let policy = StatusPolicy {
            relay: MissingFieldPolicy::KeepLast,
            time: MissingFieldPolicy::KeepLast,
            alarms: MissingFieldPolicy::Reset,
        };
        let prev = StatusSnapshot::parse("RELAY=ON TIME=10:00:00 ALARMS=3");
        let next = prev.merge(StatusFields::parse("garbled"), policy);
        assert!(next.relay_on);
        assert_eq!(next.device_time, "10:00:00");
        assert_eq!(next.alarm_count, 0);
    }
}

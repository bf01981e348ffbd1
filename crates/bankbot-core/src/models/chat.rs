use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A bot message. `time` is milliseconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatLine {
    pub content: String,
    pub time: i64,
}

impl ChatLine {
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.time)
    }

    /// "HH:MM" in UTC, or empty if the time is out of range
    pub fn time_display(&self) -> String {
        self.timestamp()
            .map(|t| t.format("%H:%M").to_string())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageRequest<'a> {
    pub content: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignRequest<'a> {
    pub username: &'a str,
    pub pwd: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_display() {
        let line = ChatLine {
            content: "hello".into(),
            time: 1_700_000_000_000,
        };
        assert_eq!(line.time_display(), "22:13");
    }
}

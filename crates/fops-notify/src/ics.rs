use chrono::{DateTime, NaiveDateTime, Utc};

use fops_core::{Reservation, Slot};

/// Calendar artifact attached to confirmation and modification notices.
/// External calendar clients parse this literally, so field layout and text
/// escaping follow the calendar grammar exactly.
#[derive(Clone, Debug, PartialEq)]
pub struct IcsEvent {
    pub uid: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub summary: String,
    pub location: Option<String>,
}

impl IcsEvent {
    pub fn for_reservation(reservation: &Reservation, slot: &Slot, summary: impl Into<String>) -> Self {
        Self {
            uid: format!("{}@fieldops", reservation.id.as_str()),
            starts_at: NaiveDateTime::new(slot.date, slot.start).and_utc(),
            ends_at: NaiveDateTime::new(slot.date, slot.end).and_utc(),
            summary: summary.into(),
            location: slot.location.clone(),
        }
    }

    /// Serialize as a VCALENDAR with display alarms one day and one hour
    /// before the event.
    pub fn render(&self) -> String {
        let mut s = String::new();
        s.push_str("BEGIN:VCALENDAR\r\n");
        s.push_str("VERSION:2.0\r\n");
        s.push_str("PRODID:-//fieldops//booking//EN\r\n");
        s.push_str("BEGIN:VEVENT\r\n");
        s.push_str(&format!("UID:{}\r\n", escape_text(&self.uid)));
        s.push_str(&format!("DTSTART:{}\r\n", self.starts_at.format("%Y%m%dT%H%M%SZ")));
        s.push_str(&format!("DTEND:{}\r\n", self.ends_at.format("%Y%m%dT%H%M%SZ")));
        s.push_str(&format!("SUMMARY:{}\r\n", escape_text(&self.summary)));
        if let Some(location) = &self.location {
            s.push_str(&format!("LOCATION:{}\r\n", escape_text(location)));
        }
        for trigger in ["-P1D", "-PT1H"] {
            s.push_str("BEGIN:VALARM\r\n");
            s.push_str("ACTION:DISPLAY\r\n");
            s.push_str("DESCRIPTION:Reminder\r\n");
            s.push_str(&format!("TRIGGER:{}\r\n", trigger));
            s.push_str("END:VALARM\r\n");
        }
        s.push_str("END:VEVENT\r\n");
        s.push_str("END:VCALENDAR\r\n");
        s
    }
}

/// TEXT escaping per the calendar format: backslash first, then semicolon,
/// comma, and newline.
fn escape_text(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace(';', "\\;")
        .replace(',', "\\,")
        .replace('\n', "\\n")
}

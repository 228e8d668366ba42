use chrono::{Datelike, NaiveDate, NaiveTime};

use fops_core::{CampaignId, SegmentId, Slot, SlotId};

/// A same-day booking window, e.g. 09:00-12:00.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }
}

/// Morning and afternoon windows with the 12:00-14:00 lunch break between
/// them. Slots are tiled inside each window, so nothing ever crosses lunch.
pub fn default_windows() -> Vec<TimeWindow> {
    vec![
        TimeWindow::new(hm(9, 0), hm(12, 0)),
        TimeWindow::new(hm(14, 0), hm(17, 0)),
    ]
}

/// Tile bookable slots over [start_date, end_date], weekends excluded.
/// Each window is filled with back-to-back slots of exactly
/// `duration_minutes`; a trailing remainder shorter than the duration is
/// dropped rather than truncated.
#[allow(clippy::too_many_arguments)]
pub fn generate_range(
    campaign_id: &CampaignId,
    start_date: NaiveDate,
    end_date: NaiveDate,
    duration_minutes: u32,
    capacity: u32,
    location: Option<String>,
    segment_id: Option<SegmentId>,
    windows: Option<&[TimeWindow]>,
) -> Vec<Slot> {
    if duration_minutes == 0 || capacity == 0 {
        return Vec::new();
    }
    let defaults = default_windows();
    let windows = windows.unwrap_or(&defaults);

    let mut slots = Vec::new();
    let mut day = start_date;
    while day <= end_date {
        if day.weekday().number_from_monday() < 6 {
            for w in windows {
                let end_min = minutes_of(w.end);
                let mut cursor = minutes_of(w.start);
                while cursor + duration_minutes <= end_min {
                    let (start, end) = match (time_at(cursor), time_at(cursor + duration_minutes)) {
                        (Some(s), Some(e)) => (s, e),
                        _ => break,
                    };
                    slots.push(Slot {
                        id: SlotId::new(),
                        campaign_id: campaign_id.clone(),
                        date: day,
                        start,
                        end,
                        capacity,
                        location: location.clone(),
                        segment_id: segment_id.clone(),
                        locked: false,
                    });
                    cursor += duration_minutes;
                }
            }
        }
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }
    slots
}

fn minutes_of(t: NaiveTime) -> u32 {
    use chrono::Timelike;
    t.hour() * 60 + t.minute()
}

fn time_at(minutes: u32) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0)
}

fn hm(h: u32, m: u32) -> NaiveTime {
    // constants above stay well inside the valid range
    NaiveTime::from_hms_opt(h, m, 0).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn campaign() -> CampaignId {
        CampaignId::from_str("camp-1")
    }

    #[test]
    fn one_weekday_default_windows_thirty_minutes_gives_twelve_slots() {
        // 2026-02-02 is a Monday
        let slots = generate_range(&campaign(), date(2026, 2, 2), date(2026, 2, 2), 30, 1, None, None, None);
        assert_eq!(slots.len(), 12);
        let morning = slots.iter().filter(|s| s.start < hm(12, 0)).count();
        assert_eq!(morning, 6);
    }

    #[test]
    fn no_slot_starts_inside_the_lunch_break() {
        let slots = generate_range(&campaign(), date(2026, 2, 2), date(2026, 2, 2), 30, 1, None, None, None);
        for s in &slots {
            assert!(
                s.start < hm(12, 0) || s.start >= hm(14, 0),
                "slot starting {} crosses lunch",
                s.start
            );
            assert!(s.end <= hm(12, 0) || s.end > hm(14, 0));
        }
    }

    #[test]
    fn weekend_only_range_yields_nothing() {
        // 2026-02-07/08 are Saturday and Sunday
        let slots = generate_range(&campaign(), date(2026, 2, 7), date(2026, 2, 8), 30, 1, None, None, None);
        assert!(slots.is_empty());
    }

    #[test]
    fn sixty_minute_slots_on_a_monday_with_capacity_two() {
        let slots = generate_range(&campaign(), date(2026, 2, 2), date(2026, 2, 2), 60, 2, None, None, None);
        assert_eq!(slots.len(), 6);
        assert!(slots.iter().all(|s| s.capacity == 2));
        assert!(slots.iter().all(|s| !s.locked));
    }

    #[test]
    fn partial_trailing_slot_is_dropped() {
        // 50-minute slots in a 3h window: 3 fit (150min), the 30min tail is dropped
        let slots = generate_range(&campaign(), date(2026, 2, 2), date(2026, 2, 2), 50, 1, None, None, None);
        assert_eq!(slots.len(), 6); // 3 per window
        assert!(slots.iter().all(|s| minutes_of(s.end) - minutes_of(s.start) == 50));
    }

    #[test]
    fn full_week_skips_saturday_and_sunday() {
        // Mon 2026-02-02 .. Sun 2026-02-08: five working days
        let slots = generate_range(&campaign(), date(2026, 2, 2), date(2026, 2, 8), 60, 1, None, None, None);
        assert_eq!(slots.len(), 5 * 6);
        assert!(slots.iter().all(|s| s.date.weekday().number_from_monday() < 6));
    }

    #[test]
    fn custom_windows_and_inherited_attributes() {
        let windows = [TimeWindow::new(hm(8, 0), hm(10, 0))];
        let seg = SegmentId::from_str("seg-1");
        let slots = generate_range(
            &campaign(),
            date(2026, 2, 2),
            date(2026, 2, 2),
            30,
            3,
            Some("Building B".to_string()),
            Some(seg.clone()),
            Some(&windows),
        );
        assert_eq!(slots.len(), 4);
        assert!(slots.iter().all(|s| s.location.as_deref() == Some("Building B")));
        assert!(slots.iter().all(|s| s.segment_id.as_ref() == Some(&seg)));
    }

    #[test]
    fn zero_duration_generates_nothing() {
        let slots = generate_range(&campaign(), date(2026, 2, 2), date(2026, 2, 2), 0, 1, None, None, None);
        assert!(slots.is_empty());
    }
}

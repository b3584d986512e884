//! Daily journal: one entry per calendar day, never rewritten once created.
//!
//! The whole `date → entry` map is persisted as a single blob and rewritten
//! in full whenever an entry is added.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::mood::Mood;
use crate::storage::{StorageError, Store, JOURNAL_KEY};
use crate::summarizer::GratitudePoints;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    pub date: NaiveDate,
    pub mood: Mood,
    pub gratitude_points: GratitudePoints,
    pub discovery: String,
    /// Elapsed session length, `m:ss`.
    pub session_time: String,
    /// Number of user messages in the session.
    pub conversation_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Journal {
    entries: BTreeMap<NaiveDate, JournalEntry>,
}

impl Journal {
    pub fn load(store: &Store) -> Result<Self, StorageError> {
        Ok(store.get(JOURNAL_KEY)?.unwrap_or_default())
    }

    pub fn save(&self, store: &Store) -> Result<(), StorageError> {
        store.set(JOURNAL_KEY, self)
    }

    pub fn get(&self, date: NaiveDate) -> Option<&JournalEntry> {
        self.entries.get(&date)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.entries.contains_key(&date)
    }

    /// Add `entry` unless its day already has one. Returns whether it was added.
    pub fn insert_if_absent(&mut self, entry: JournalEntry) -> bool {
        if self.entries.contains_key(&entry.date) {
            debug!("Journal already has an entry for {}", entry.date);
            return false;
        }
        info!("New journal entry for {} ({})", entry.date, entry.mood);
        self.entries.insert(entry.date, entry);
        true
    }

    /// Oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &JournalEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sunday-first month grid; `None` pads the days before the 1st.
    pub fn month_grid(&self, year: i32, month: u32) -> Option<Vec<Option<CalendarDay>>> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        let leading = first.weekday().num_days_from_sunday() as usize;

        let mut cells: Vec<Option<CalendarDay>> = vec![None; leading];
        cells.extend(
            first
                .iter_days()
                .take_while(|d| d.month() == month)
                .map(|date| {
                    Some(CalendarDay {
                        day: date.day(),
                        date,
                        has_entry: self.contains(date),
                    })
                }),
        );
        Some(cells)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarDay {
    pub day: u32,
    pub date: NaiveDate,
    pub has_entry: bool,
}

/// `m:ss`, minutes uncapped.
pub fn format_session_time(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// Plain-text month view; days with an entry are starred.
pub fn render_calendar(year: i32, month: u32, cells: &[Option<CalendarDay>]) -> String {
    let mut out = format!("{year}-{month:02}\n Sun  Mon  Tue  Wed  Thu  Fri  Sat\n");
    for week in cells.chunks(7) {
        let row: Vec<String> = week
            .iter()
            .map(|cell| match cell {
                Some(d) if d.has_entry => format!("{:>3}*", d.day),
                Some(d) => format!("{:>3} ", d.day),
                None => "    ".to_string(),
            })
            .collect();
        out.push_str(row.join(" ").trim_end());
        out.push('\n');
    }
    out
}

/// Markdown report for one day.
pub fn render_report(entry: &JournalEntry) -> String {
    let mut lines = vec![
        format!("# Thanks to Me - {}", entry.date.format("%A, %B %-d, %Y")),
        String::new(),
        format!("- **Mood**: {}", entry.mood),
        format!("- **Session time**: {}", entry.session_time),
        format!("- **Messages**: {}", entry.conversation_count),
        String::new(),
        "## Gratitude highlights".to_string(),
    ];

    if entry.gratitude_points.is_empty() {
        lines.push("- (none)".to_string());
    } else {
        lines.extend(entry.gratitude_points.as_slice().iter().map(|p| format!("- {p}")));
    }

    lines.extend([
        String::new(),
        "## Today's discovery".to_string(),
        entry.discovery.clone(),
    ]);
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn entry(day: NaiveDate, discovery: &str) -> JournalEntry {
        JournalEntry {
            date: day,
            mood: Mood::Positive,
            gratitude_points: GratitudePoints::new(vec!["산책".to_string()]),
            discovery: discovery.into(),
            session_time: "8:42".into(),
            conversation_count: 4,
        }
    }

    #[test]
    fn second_entry_for_same_day_is_rejected() {
        let mut journal = Journal::default();
        let day = date(2024, 1, 15);
        assert!(journal.insert_if_absent(entry(day, "first")));
        assert!(!journal.insert_if_absent(entry(day, "second")));
        assert_eq!(journal.get(day).unwrap().discovery, "first");
        assert_eq!(journal.len(), 1);
    }

    #[test]
    fn persists_as_date_keyed_object() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();

        let mut journal = Journal::default();
        journal.insert_if_absent(entry(date(2024, 1, 15), "d"));
        journal.save(&store).unwrap();

        let raw: serde_json::Value = store.get(JOURNAL_KEY).unwrap().unwrap();
        let e = &raw["2024-01-15"];
        assert_eq!(e["mood"], "positive");
        assert_eq!(e["gratitudePoints"][0], "산책");
        assert_eq!(e["sessionTime"], "8:42");
        assert_eq!(e["conversationCount"], 4);

        assert_eq!(Journal::load(&store).unwrap(), journal);
    }

    #[test]
    fn empty_store_loads_empty_journal() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        assert!(Journal::load(&store).unwrap().is_empty());
    }

    #[test]
    fn month_grid_pads_to_first_weekday() {
        let mut journal = Journal::default();
        journal.insert_if_absent(entry(date(2024, 1, 15), "d"));

        // 2024-01-01 is a Monday
        let grid = journal.month_grid(2024, 1).unwrap();
        assert_eq!(grid.len(), 1 + 31);
        assert!(grid[0].is_none());
        assert_eq!(grid[1].unwrap().day, 1);
        assert!(grid[15].unwrap().has_entry);
        assert!(!grid[14].unwrap().has_entry);

        // Leap February
        let feb = journal.month_grid(2024, 2).unwrap();
        assert_eq!(feb.iter().flatten().count(), 29);

        assert!(journal.month_grid(2024, 13).is_none());
    }

    #[test]
    fn session_time_is_minutes_and_seconds() {
        assert_eq!(format_session_time(Duration::from_secs(522)), "8:42");
        assert_eq!(format_session_time(Duration::from_secs(5)), "0:05");
        assert_eq!(format_session_time(Duration::from_secs(3600)), "60:00");
    }

    #[test]
    fn calendar_marks_entries() {
        let mut journal = Journal::default();
        journal.insert_if_absent(entry(date(2024, 1, 15), "d"));
        let text = render_calendar(2024, 1, &journal.month_grid(2024, 1).unwrap());
        assert!(text.starts_with("2024-01\n"));
        assert!(text.contains(" 15*"));
        assert!(!text.contains(" 14*"));
    }

    #[test]
    fn report_lists_points_and_discovery() {
        let report = render_report(&entry(date(2024, 1, 15), "작은 친절"));
        assert!(report.starts_with("# Thanks to Me - Monday, January 15, 2024"));
        assert!(report.contains("- 산책"));
        assert!(report.contains("- **Mood**: positive"));
        assert!(report.ends_with("작은 친절"));
    }
}

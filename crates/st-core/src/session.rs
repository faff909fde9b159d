//! Recorded study sessions and their store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::storage::{SESSIONS_KEY, Storage, StoreError, load_json, save_json};
use crate::types::Subject;

/// One completed interval of study time.
///
/// Sessions are immutable once created and are only ever appended to the
/// [`SessionStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudySession {
    pub subject: Subject,

    /// Studied time in whole seconds.
    pub duration: u64,

    /// When timing began. Older data stored this as `date`.
    #[serde(alias = "date")]
    pub started_at: DateTime<Utc>,

    #[serde(default)]
    pub notes: String,

    #[serde(default, deserialize_with = "list_or_csv")]
    pub links: Vec<String>,

    #[serde(default)]
    pub footnote: String,

    #[serde(default, deserialize_with = "list_or_csv")]
    pub images: Vec<String>,
}

impl StudySession {
    /// Builds a session from a timer run and the user's free-form input.
    pub fn new(
        subject: Subject,
        duration: u64,
        started_at: DateTime<Utc>,
        details: SessionDetails,
    ) -> Self {
        Self {
            subject,
            duration,
            started_at,
            notes: details.notes,
            links: split_list(&details.links),
            footnote: details.footnote,
            images: split_list(&details.images),
        }
    }

    /// Duration rounded to the nearest minute (half up).
    pub const fn minutes(&self) -> u64 {
        crate::report::seconds_to_minutes(self.duration)
    }
}

/// Free-form metadata entered while a session is being timed.
///
/// `links` and `images` are raw comma-separated input; they are normalized
/// with [`split_list`] when the session is created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionDetails {
    pub notes: String,
    pub links: String,
    pub footnote: String,
    pub images: String,
}

/// Splits comma-separated input into trimmed, non-empty entries.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

/// Accepts either a JSON array or a raw comma-separated string.
fn list_or_csv<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ListOrCsv {
        List(Vec<String>),
        Csv(String),
    }

    Ok(match Option::<ListOrCsv>::deserialize(deserializer)? {
        Some(ListOrCsv::List(items)) => items,
        Some(ListOrCsv::Csv(raw)) => split_list(&raw),
        None => Vec::new(),
    })
}

/// Append-only, write-through list of recorded sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStore {
    sessions: Vec<StudySession>,
}

impl SessionStore {
    /// Loads stored sessions.
    ///
    /// Never fails: a missing or unparseable document yields an empty store,
    /// and individual records that don't decode are skipped.
    pub fn load<S: Storage + ?Sized>(storage: &S) -> Self {
        let stored: Vec<serde_json::Value> = load_json(storage, SESSIONS_KEY).unwrap_or_default();
        let sessions = stored
            .into_iter()
            .enumerate()
            .filter_map(|(index, value)| match serde_json::from_value(value) {
                Ok(session) => Some(session),
                Err(e) => {
                    tracing::warn!(index, error = %e, "skipping malformed stored session");
                    None
                }
            })
            .collect();
        Self { sessions }
    }

    /// Appends `session` and persists the full list.
    ///
    /// A failed write keeps the session in memory; the next successful
    /// append persists it along with everything else.
    pub fn append<S: Storage + ?Sized>(
        &mut self,
        storage: &S,
        session: StudySession,
    ) -> Result<(), StoreError> {
        self.sessions.push(session);
        save_json(storage, SESSIONS_KEY, &self.sessions)
    }

    /// All sessions in creation order.
    pub fn all(&self) -> &[StudySession] {
        &self.sessions
    }

    pub fn get(&self, index: usize) -> Option<&StudySession> {
        self.sessions.get(index)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use crate::storage::testing::BrokenStorage;
    use chrono::TimeZone;

    fn session(subject: &str, duration: u64) -> StudySession {
        StudySession::new(
            Subject::new(subject).unwrap(),
            duration,
            Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0).unwrap(),
            SessionDetails::default(),
        )
    }

    #[test]
    fn split_list_trims_and_drops_empties() {
        assert_eq!(
            split_list(" https://a.example , ,https://b.example,"),
            vec!["https://a.example", "https://b.example"]
        );
        assert!(split_list("").is_empty());
        assert!(split_list(" , ").is_empty());
    }

    #[test]
    fn new_normalizes_links_and_images_alike() {
        let details = SessionDetails {
            notes: "chapter 3".into(),
            links: "https://docs.example, https://wiki.example".into(),
            footnote: "ask about q4".into(),
            images: "https://img.example/1.png,,https://img.example/2.png ".into(),
        };
        let session = StudySession::new(
            Subject::new("Math").unwrap(),
            130,
            Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0).unwrap(),
            details,
        );

        assert_eq!(session.links, vec!["https://docs.example", "https://wiki.example"]);
        assert_eq!(
            session.images,
            vec!["https://img.example/1.png", "https://img.example/2.png"]
        );
        assert_eq!(session.notes, "chapter 3");
        assert_eq!(session.footnote, "ask about q4");
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let json = serde_json::to_value(session("Math", 130)).unwrap();
        assert_eq!(json["subject"], "Math");
        assert_eq!(json["duration"], 130);
        assert_eq!(json["startedAt"], "2025-03-14T09:30:00Z");
        assert!(json["links"].is_array());
        assert!(json["images"].is_array());
    }

    #[test]
    fn deserializes_legacy_record() {
        let json = r#"{
            "subject": "History",
            "duration": 300,
            "date": "2024-11-02T18:04:05.123Z",
            "notes": "",
            "links": "https://a.example, https://b.example",
            "footnote": "",
            "images": ["https://img.example/x.png"]
        }"#;
        let parsed: StudySession = serde_json::from_str(json).unwrap();

        assert_eq!(parsed.subject.as_str(), "History");
        assert_eq!(parsed.duration, 300);
        assert_eq!(parsed.links, vec!["https://a.example", "https://b.example"]);
        assert_eq!(parsed.images, vec!["https://img.example/x.png"]);
    }

    #[test]
    fn deserializes_missing_metadata_as_empty() {
        let json = r#"{"subject":"Art","duration":60,"startedAt":"2025-01-01T00:00:00Z","links":null}"#;
        let parsed: StudySession = serde_json::from_str(json).unwrap();
        assert!(parsed.links.is_empty());
        assert!(parsed.images.is_empty());
        assert_eq!(parsed.notes, "");
    }

    #[test]
    fn minutes_round_half_up() {
        assert_eq!(session("Math", 130).minutes(), 2);
        assert_eq!(session("Math", 150).minutes(), 3);
        assert_eq!(session("Math", 29).minutes(), 0);
    }

    #[test]
    fn append_persists_and_reloads_in_order() {
        let storage = MemoryStorage::new();
        let mut store = SessionStore::load(&storage);
        assert!(store.is_empty());

        store.append(&storage, session("Math", 130)).unwrap();
        store.append(&storage, session("Physics", 600)).unwrap();

        let reloaded = SessionStore::load(&storage);
        assert_eq!(reloaded, store);
        assert_eq!(reloaded.all()[0].subject.as_str(), "Math");
        assert_eq!(reloaded.all()[1].subject.as_str(), "Physics");
    }

    #[test]
    fn load_malformed_document_starts_empty() {
        let storage = MemoryStorage::new().with_entry(SESSIONS_KEY, "[{oops");
        assert!(SessionStore::load(&storage).is_empty());
    }

    #[test]
    fn load_skips_malformed_records() {
        let storage = MemoryStorage::new().with_entry(
            SESSIONS_KEY,
            r#"[
                {"subject":"Math","duration":60,"startedAt":"2025-01-01T00:00:00Z"},
                {"subject":"","duration":60,"startedAt":"2025-01-01T00:00:00Z"},
                {"subject":"Art","duration":-5,"startedAt":"2025-01-01T00:00:00Z"},
                {"subject":"Art","duration":90,"startedAt":"2025-01-02T00:00:00Z"}
            ]"#,
        );
        let store = SessionStore::load(&storage);

        assert_eq!(store.len(), 2);
        assert_eq!(store.all()[0].subject.as_str(), "Math");
        assert_eq!(store.all()[1].duration, 90);
    }

    #[test]
    fn failed_append_surfaces_and_keeps_session() {
        let mut store = SessionStore::load(&BrokenStorage);

        let result = store.append(&BrokenStorage, session("Math", 60));

        assert!(result.is_err());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn append_after_failure_persists_everything() {
        let mut store = SessionStore::default();
        let _ = store.append(&BrokenStorage, session("Math", 60));

        let storage = MemoryStorage::new();
        store.append(&storage, session("Art", 120)).unwrap();

        assert_eq!(SessionStore::load(&storage).len(), 2);
    }
}

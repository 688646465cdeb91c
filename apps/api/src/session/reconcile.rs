//! Server-authoritative merge of placeholder state.
//!
//! Clients send their copy of the placeholder list with every chat and download
//! call. That copy is only compared against the stored list so divergence shows
//! up in logs; fill state is changed exclusively by values the resolver extracted.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::warn;

use crate::models::{Placeholder, Session};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// Client lists a name the server never extracted.
    UnknownPlaceholder,
    /// Client marks a placeholder filled that the server has not filled.
    ForgedFill,
    /// Both sides filled, with different values.
    ValueMismatch,
    /// Server has a value the client has not seen yet.
    StaleClient,
    /// Server placeholder absent from a non-empty client list.
    MissingFromClient,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceholderConflict {
    pub name: String,
    pub kind: ConflictKind,
}

/// Compares a client-submitted list against the authoritative one.
/// An empty client list is treated as "no hint" and yields no conflicts.
pub fn detect_conflicts(
    authoritative: &[Placeholder],
    client: &[Placeholder],
) -> Vec<PlaceholderConflict> {
    if client.is_empty() {
        return Vec::new();
    }

    let stored: HashMap<&str, &Placeholder> =
        authoritative.iter().map(|p| (p.name.as_str(), p)).collect();
    let mut conflicts = Vec::new();

    for hint in client {
        let conflict = match stored.get(hint.name.as_str()) {
            None => Some(ConflictKind::UnknownPlaceholder),
            Some(server) => match (server.is_filled(), hint.filled) {
                (false, true) => Some(ConflictKind::ForgedFill),
                (true, false) => Some(ConflictKind::StaleClient),
                (true, true) if server.value != hint.value => Some(ConflictKind::ValueMismatch),
                _ => None,
            },
        };
        if let Some(kind) = conflict {
            conflicts.push(PlaceholderConflict {
                name: hint.name.clone(),
                kind,
            });
        }
    }

    for server in authoritative {
        if !client.iter().any(|c| c.name == server.name) {
            conflicts.push(PlaceholderConflict {
                name: server.name.clone(),
                kind: ConflictKind::MissingFromClient,
            });
        }
    }

    conflicts
}

/// Logs client/server divergence for a session. Returns the conflicts for callers that
/// want to surface them.
pub fn log_conflicts(session: &Session, client: &[Placeholder]) -> Vec<PlaceholderConflict> {
    let conflicts = detect_conflicts(&session.placeholders, client);
    for conflict in &conflicts {
        warn!(
            "Session {}: client placeholder [{}] diverges from server ({:?}); server state wins",
            session.id, conflict.name, conflict.kind
        );
    }
    conflicts
}

/// Commits extracted values into the session.
///
/// Keys are matched case-insensitively against stored names; unknown keys and empty
/// values are dropped. Returns the committed values keyed by exact stored name.
pub fn merge_extracted(
    session: &mut Session,
    extracted: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut committed = BTreeMap::new();
    for (name, value) in extracted {
        match session.commit_value(name, value) {
            Some(exact) => {
                let stored = session.filled_values.get(&exact).cloned().unwrap_or_default();
                committed.insert(exact, stored);
            }
            None => warn!(
                "Session {}: dropping extracted value for unknown or empty field '{name}'",
                session.id
            ),
        }
    }
    committed
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn placeholder(name: &str, value: Option<&str>) -> Placeholder {
        let mut p = Placeholder::new(name, "");
        if let Some(v) = value {
            p.fill(v);
        }
        p
    }

    fn session() -> Session {
        Session::new(
            "x.docx".to_string(),
            Bytes::new(),
            vec![placeholder("Company Name", None), placeholder("Date", None)],
        )
    }

    #[test]
    fn test_matching_lists_have_no_conflicts() {
        let s = session();
        assert!(detect_conflicts(&s.placeholders, &s.placeholders).is_empty());
        assert!(detect_conflicts(&s.placeholders, &[]).is_empty());
    }

    #[test]
    fn test_forged_fill_is_detected_and_not_applied() {
        let s = session();
        let client = vec![
            placeholder("Company Name", Some("Evil Corp")),
            placeholder("Date", None),
        ];
        let conflicts = log_conflicts(&s, &client);
        assert_eq!(
            conflicts,
            vec![PlaceholderConflict {
                name: "Company Name".to_string(),
                kind: ConflictKind::ForgedFill
            }]
        );
        assert!(!s.placeholders[0].is_filled());
    }

    #[test]
    fn test_unknown_and_missing_names() {
        let s = session();
        let client = vec![placeholder("Company Name", None), placeholder("Extra", None)];
        let kinds: Vec<_> = detect_conflicts(&s.placeholders, &client)
            .into_iter()
            .map(|c| (c.name, c.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("Extra".to_string(), ConflictKind::UnknownPlaceholder),
                ("Date".to_string(), ConflictKind::MissingFromClient),
            ]
        );
    }

    #[test]
    fn test_value_mismatch_and_stale_client() {
        let mut s = session();
        s.commit_value("Company Name", "Acme");
        s.commit_value("Date", "Jan 1");
        let client = vec![
            placeholder("Company Name", Some("Other")),
            placeholder("Date", None),
        ];
        let kinds: Vec<_> = detect_conflicts(&s.placeholders, &client)
            .into_iter()
            .map(|c| c.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![ConflictKind::ValueMismatch, ConflictKind::StaleClient]
        );
    }

    #[test]
    fn test_merge_uses_exact_names_and_drops_unknown() {
        let mut s = session();
        let extracted = BTreeMap::from([
            ("company name".to_string(), " Acme Corp ".to_string()),
            ("Signature".to_string(), "x".to_string()),
            ("Date".to_string(), "".to_string()),
        ]);
        let committed = merge_extracted(&mut s, &extracted);
        assert_eq!(
            committed,
            BTreeMap::from([("Company Name".to_string(), "Acme Corp".to_string())])
        );
        assert!(s.placeholders[0].is_filled());
        assert!(!s.placeholders[1].is_filled());
        assert!(!s.filled_values.contains_key("Signature"));
    }
}

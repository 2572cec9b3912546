use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use super::domain::{normalize_word, AffinityScore, InvalidScore, TopicKind, UserId, UserProfile};

/// Failure while importing a `user_id,kind,word,score` roster export.
#[derive(Debug, thiserror::Error)]
pub enum RosterImportError {
    #[error("failed to read roster: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid roster CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("line {line}: {source}")]
    InvalidScore { line: u64, source: InvalidScore },
    #[error("line {line}: unknown topic kind '{kind}' (expected interest or value)")]
    InvalidKind { line: u64, kind: String },
    #[error("line {line}: topic word is empty")]
    EmptyWord { line: u64 },
    #[error("line {line}: user id is empty")]
    EmptyUser { line: u64 },
    #[error("line {line}: score is missing for '{word}'")]
    MissingScore { line: u64, word: String },
    #[error("line {line}: '{word}' is already rated as {existing}")]
    KindConflict {
        line: u64,
        word: String,
        existing: TopicKind,
    },
}

#[derive(Debug, Deserialize)]
struct RosterRow {
    user_id: String,
    #[serde(default)]
    kind: String,
    #[serde(default)]
    word: String,
    #[serde(default)]
    score: Option<i64>,
}

/// Parse a roster into profiles, keeping first-appearance order.
///
/// A row with blank `kind`, `word` and `score` registers a member with no ratings yet. A word
/// keeps one kind per user; a later row for the same word and kind replaces the score.
pub fn parse_roster<R: Read>(reader: R) -> Result<Vec<UserProfile>, RosterImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut profiles: Vec<UserProfile> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (offset, row) in csv_reader.deserialize::<RosterRow>().enumerate() {
        let row = row?;
        let line = offset as u64 + 2;

        if row.user_id.is_empty() {
            return Err(RosterImportError::EmptyUser { line });
        }
        let slot = *index.entry(row.user_id.clone()).or_insert_with(|| {
            profiles.push(UserProfile::new(row.user_id.clone()));
            profiles.len() - 1
        });

        if row.kind.is_empty() && row.word.is_empty() && row.score.is_none() {
            continue;
        }

        let kind = parse_kind(&row.kind).ok_or_else(|| RosterImportError::InvalidKind {
            line,
            kind: row.kind.clone(),
        })?;
        let word = normalize_word(&row.word).ok_or(RosterImportError::EmptyWord { line })?;
        let raw_score = row
            .score
            .ok_or_else(|| RosterImportError::MissingScore {
                line,
                word: word.clone(),
            })?;
        let score = AffinityScore::new(raw_score)
            .map_err(|source| RosterImportError::InvalidScore { line, source })?;

        let profile = &mut profiles[slot];
        if let Some(existing) = profile.rated_kind(&word).filter(|existing| *existing != kind) {
            return Err(RosterImportError::KindConflict {
                line,
                word,
                existing,
            });
        }
        match kind {
            TopicKind::Interest => profile.interests.insert(word, score),
            TopicKind::Value => profile.values.insert(word, score),
        };
    }

    Ok(profiles)
}

pub fn load_roster<P: AsRef<Path>>(path: P) -> Result<Vec<UserProfile>, RosterImportError> {
    let file = File::open(path)?;
    parse_roster(file)
}

pub fn member_ids(profiles: &[UserProfile]) -> Vec<UserId> {
    profiles.iter().map(|profile| profile.id.clone()).collect()
}

fn parse_kind(raw: &str) -> Option<TopicKind> {
    match raw.to_ascii_lowercase().as_str() {
        "interest" | "interests" => Some(TopicKind::Interest),
        "value" | "values" => Some(TopicKind::Value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parses_profiles_in_first_seen_order() {
        let csv = "user_id,kind,word,score\n\
u2,interest,Hiking,2\n\
u1,value,honesty,1\n\
u2,value, Kindness ,-1\n";
        let profiles = parse_roster(Cursor::new(csv)).expect("roster parses");

        assert_eq!(member_ids(&profiles), vec![UserId("u2".into()), UserId("u1".into())]);
        assert_eq!(profiles[0].interests["hiking"].value(), 2);
        assert_eq!(profiles[0].values["kindness"].value(), -1);
        assert_eq!(profiles[1].values["honesty"].value(), 1);
    }

    #[test]
    fn blank_rows_register_members_without_ratings() {
        let csv = "user_id,kind,word,score\nu3,,,\n";
        let profiles = parse_roster(Cursor::new(csv)).expect("roster parses");
        assert_eq!(profiles.len(), 1);
        assert!(profiles[0].interests.is_empty());
        assert!(profiles[0].values.is_empty());
    }

    #[test]
    fn rejects_scores_outside_the_scale() {
        let csv = "user_id,kind,word,score\nu1,interest,chess,1\nu1,interest,golf,3\n";
        match parse_roster(Cursor::new(csv)) {
            Err(RosterImportError::InvalidScore { line: 3, source }) => {
                assert_eq!(source, InvalidScore(3));
            }
            other => panic!("expected invalid score, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_kinds() {
        let csv = "user_id,kind,word,score\nu1,hobby,chess,1\n";
        assert!(matches!(
            parse_roster(Cursor::new(csv)),
            Err(RosterImportError::InvalidKind { line: 2, .. })
        ));
    }

    #[test]
    fn rejects_rows_without_a_score() {
        let csv = "user_id,kind,word,score\nu1,interest,chess,\n";
        match parse_roster(Cursor::new(csv)) {
            Err(RosterImportError::MissingScore { line: 2, word }) => assert_eq!(word, "chess"),
            other => panic!("expected missing score, got {other:?}"),
        }
    }

    #[test]
    fn rejects_a_word_rated_under_both_kinds() {
        let csv = "user_id,kind,word,score\n\
u1,interest,Music,1\n\
u2,value,music,2\n\
u1,value,music,-1\n";
        match parse_roster(Cursor::new(csv)) {
            Err(RosterImportError::KindConflict {
                line: 4,
                word,
                existing: TopicKind::Interest,
            }) => assert_eq!(word, "music"),
            other => panic!("expected kind conflict, got {other:?}"),
        }
    }

    #[test]
    fn repeated_rows_of_one_kind_keep_the_last_score() {
        let csv = "user_id,kind,word,score\nu1,interest,chess,1\nu1,interest,Chess,-2\n";
        let profiles = parse_roster(Cursor::new(csv)).expect("roster parses");
        assert_eq!(profiles[0].interests["chess"].value(), -2);
        assert!(profiles[0].values.is_empty());
    }

    #[test]
    fn load_roster_propagates_io_errors() {
        match load_roster("./does-not-exist.csv") {
            Err(RosterImportError::Io(_)) => {}
            other => panic!("expected io error, got {other:?}"),
        }
    }
}

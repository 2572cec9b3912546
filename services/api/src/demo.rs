use crate::infra::InMemoryProfileStore;
use clap::Args;
use kindred::config::MatchingConfig;
use kindred::error::AppError;
use kindred::matching::{
    load_roster, parse_roster, AnswerOutcome, GroupId, MatchingService, ProfileStore,
    RevealOutcome, UserId,
};
use std::path::PathBuf;
use std::sync::Arc;

const DEMO_ROSTER: &str = include_str!("../data/demo_roster.csv");
const DEMO_GROUP_ID: &str = "demo";

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Optional `user_id,kind,word,score` roster (defaults to the bundled sample group)
    #[arg(long)]
    pub(crate) roster: Option<PathBuf>,
    /// Member who takes the survey (defaults to the first roster entry)
    #[arg(long)]
    pub(crate) user: Option<String>,
    /// Number of questions to answer before stopping
    #[arg(long, default_value_t = 5)]
    pub(crate) answers: usize,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        roster,
        user,
        answers,
    } = args;

    let profiles = match roster {
        Some(path) => load_roster(path)?,
        None => parse_roster(DEMO_ROSTER.as_bytes())?,
    };
    let Some(first) = profiles.first() else {
        println!("Roster is empty; nothing to match");
        return Ok(());
    };
    let user_id = UserId(user.unwrap_or_else(|| first.id.0.clone()));
    let group_id = GroupId(DEMO_GROUP_ID.to_string());

    let store = Arc::new(InMemoryProfileStore::default());
    let group = store
        .seed(DEMO_GROUP_ID, "Demo group", profiles)
        .map_err(|err| AppError::Matching(err.into()))?;
    let config = MatchingConfig {
        rng_seed: Some(42),
        ..MatchingConfig::default()
    };
    let service = MatchingService::new(store.clone(), config);

    println!("Kindred matching demo");
    println!(
        "- Group '{}' with {} members, surveying {}",
        group.id,
        group.members.len(),
        user_id
    );

    let ranking = service.compatibility_ranking(&user_id, &group_id)?;
    println!("\nCompatibility ranking");
    if ranking.is_empty() {
        println!("  (nobody else in the group)");
    }
    for (position, entry) in ranking.iter().enumerate() {
        println!(
            "  {}. {} {:.1}%{}",
            position + 1,
            entry.other_user_id,
            entry.percent,
            if entry.full_overlap { " (full overlap)" } else { "" }
        );
    }

    let questions = service.topic_queue_snapshot(&user_id, &group_id, None)?;
    println!("\nQuestion queue");
    for topic in &questions {
        println!("  - {} [{}]", topic.word, topic.kind);
    }

    println!("\nSurvey answers");
    let mut next = questions.into_iter().next();
    for index in 0..answers {
        let Some(topic) = next.take().or_else(|| {
            service
                .topic_queue_snapshot(&user_id, &group_id, Some(1))
                .ok()
                .and_then(|shown| shown.into_iter().next())
        }) else {
            println!("  Question supply exhausted");
            break;
        };
        let score = demo_score(index);
        let outcome = service.record_answer(&user_id, topic, score)?;
        render_answer(&outcome);
        next = outcome.next_question.clone();
    }

    let profile = store
        .get_profile(&user_id)
        .map_err(|err| AppError::Matching(err.into()))?;
    println!(
        "\nProgress {}% | matches revealed so far: {}",
        profile.match_progress,
        if profile.current_matches.is_empty() {
            "none".to_string()
        } else {
            profile
                .current_matches
                .iter()
                .map(|id| id.0.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        }
    );

    if let Some(matched) = profile.current_matches.last() {
        let common = service.common_affinities(&user_id, matched)?;
        if !common.is_empty() {
            let words: Vec<&str> = common.iter().map(|topic| topic.word.as_str()).collect();
            println!("  You and {} both love: {}", matched, words.join(", "));
        }
    }

    Ok(())
}

/// Cycles through the rating scale so the demo exercises agreement and disagreement.
fn demo_score(index: usize) -> i64 {
    (index % 5) as i64 - 2
}

fn render_answer(outcome: &AnswerOutcome) {
    println!(
        "  - {} [{}] rated {} -> progress {}% ({} to go)",
        outcome.topic.word,
        outcome.topic.kind,
        i64::from(outcome.score),
        outcome.progress.value(),
        outcome.questions_remaining
    );
    match &outcome.reveal {
        Some(RevealOutcome::Revealed(revealed)) => println!(
            "    Match revealed: {} at {:.1}%",
            revealed.user_id, revealed.percent
        ),
        Some(RevealOutcome::NoCandidate) => {
            println!("    Everyone in the group has already been revealed")
        }
        Some(RevealOutcome::NotReady { .. }) | None => {}
    }
}

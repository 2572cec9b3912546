use serde::{Deserialize, Serialize};

use super::domain::{UserId, UserProfile};
use super::scoring::score;

/// One row of a ranking: how well another member fits the querying user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityResult {
    pub other_user_id: UserId,
    pub percent: f64,
    pub full_overlap: bool,
}

/// Rank every other member against `current`, best first.
///
/// The sort is stable, so equal percentages keep the members' enumeration order.
pub fn rank(current: &UserProfile, members: &[UserProfile]) -> Vec<CompatibilityResult> {
    let mut ranking: Vec<CompatibilityResult> = members
        .iter()
        .filter(|member| member.id != current.id)
        .map(|member| {
            let compatibility = score(current, member);
            CompatibilityResult {
                other_user_id: member.id.clone(),
                percent: compatibility.percent,
                full_overlap: compatibility.full_overlap,
            }
        })
        .collect();

    ranking.sort_by(|a, b| b.percent.total_cmp(&a.percent));
    ranking
}

/// First ranked entry not already revealed to the user.
pub fn next_candidate<'a>(
    ranking: &'a [CompatibilityResult],
    seen: &[UserId],
) -> Option<&'a CompatibilityResult> {
    ranking
        .iter()
        .find(|entry| !seen.contains(&entry.other_user_id))
}

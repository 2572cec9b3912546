use crate::matching::domain::{Topic, UserProfile};
use crate::matching::scoring::{common_affinities, score, COMMON_AFFINITY_MIN};

#[test]
fn identical_single_interest_scores_full_overlap() {
    let u1 = UserProfile::new("u1").with_interest("hiking", 2);
    let u2 = UserProfile::new("u2").with_interest("hiking", 2);

    let result = score(&u1, &u2);
    assert_eq!(result.percent, 100.0);
    assert!(result.full_overlap);
}

#[test]
fn missing_key_costs_half_its_weight() {
    let u1 = UserProfile::new("u1").with_interest("hiking", 2);
    let u3 = UserProfile::new("u3");

    let result = score(&u1, &u3);
    assert_eq!(result.percent, 50.0);
    assert!(!result.full_overlap);
}

#[test]
fn profile_scored_against_itself_is_one_hundred() {
    let profile = UserProfile::new("u1")
        .with_interest("chess", -2)
        .with_interest("cooking", 1)
        .with_value("honesty", 2)
        .with_value("ambition", 0);

    let result = score(&profile, &profile);
    assert_eq!(result.percent, 100.0);
    assert!(result.full_overlap);
}

#[test]
fn empty_subject_is_defined_as_full_overlap() {
    let empty = UserProfile::new("empty");
    let other = UserProfile::new("other")
        .with_interest("hiking", -2)
        .with_value("honesty", 2);

    let result = score(&empty, &other);
    assert_eq!(result.percent, 100.0);
    assert!(result.full_overlap);
    assert!(!result.percent.is_nan());
}

#[test]
fn score_is_directional() {
    let broad = UserProfile::new("broad")
        .with_interest("hiking", 2)
        .with_interest("chess", 1);
    let narrow = UserProfile::new("narrow").with_interest("hiking", 2);

    let broad_view = score(&broad, &narrow);
    assert_eq!(broad_view.percent, 75.0);
    assert!(!broad_view.full_overlap);

    let narrow_view = score(&narrow, &broad);
    assert_eq!(narrow_view.percent, 100.0);
    assert!(narrow_view.full_overlap);
}

#[test]
fn each_notch_of_disagreement_costs_score() {
    let me = UserProfile::new("me").with_interest("chess", 2);
    let percents: Vec<f64> = [2, 1, 0, -1, -2]
        .into_iter()
        .map(|rating| score(&me, &UserProfile::new("other").with_interest("chess", rating)).percent)
        .collect();
    assert_eq!(percents, vec![100.0, 75.0, 50.0, 25.0, 0.0]);
}

#[test]
fn two_notches_apart_cost_as_much_as_a_missing_key() {
    let me = UserProfile::new("me").with_interest("chess", 2);
    let missing = score(&me, &UserProfile::new("missing")).percent;
    let two_off = score(&me, &UserProfile::new("two-off").with_interest("chess", 0)).percent;
    let one_off = score(&me, &UserProfile::new("one-off").with_interest("chess", 1)).percent;
    assert_eq!(missing, two_off);
    assert!(one_off > missing);
}

#[test]
fn interests_and_values_are_scored_as_one_map() {
    let a = UserProfile::new("a").with_interest("music", 2);
    let b = UserProfile::new("b").with_value("music", 2);

    let result = score(&a, &b);
    assert_eq!(result.percent, 100.0);
    assert!(result.full_overlap);
}

#[test]
fn common_affinities_require_both_users_above_minimum() {
    let a = UserProfile::new("a")
        .with_interest("hiking", 2)
        .with_interest("chess", 2)
        .with_value("honesty", 2);
    let b = UserProfile::new("b")
        .with_interest("hiking", 2)
        .with_interest("chess", 1)
        .with_value("honesty", 2);

    let common = common_affinities(&a, &b, COMMON_AFFINITY_MIN);
    assert_eq!(common, vec![Topic::interest("hiking"), Topic::value("honesty")]);
}

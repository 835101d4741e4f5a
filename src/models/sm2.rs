//! SM-2 (SuperMemo 2) spaced repetition scheduling.
//!
//! Each review updates two pieces of per-card state from a recall grade:
//! - Quality grades 3-5: the repetition count grows and the ease factor moves by
//!   `0.1 - (5 - q) * (0.08 + (5 - q) * 0.02)` (up for 5, flat for 4, down for 3)
//! - Quality grades 0-2: a lapse; repetitions reset to 0 and the ease drops by 0.2
//! - The ease factor never falls below 1.3 and has no ceiling
//! - Interval: 1 day, then 6 days, then `round((repetitions - 1) * ease)` days
//!
//! Because a lapse resets repetitions, the next success always restarts at 1 day.

use chrono::{DateTime, TimeDelta, Utc};

use super::{Flashcard, Quality, ReviewOutcome};

/// Ease factor floor
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// Ease lost on a lapse
pub const LAPSE_PENALTY: f64 = 0.2;

/// Reviews `card` with `quality` at `now`. Pure: persisting the outcome is up to the caller.
pub fn review(card: &Flashcard, quality: Quality, now: DateTime<Utc>) -> ReviewOutcome {
    calculate_next_review(card.repetitions, card.ease_factor, quality, now)
}

/// Calculates new review state from the card's current repetitions and ease.
pub fn calculate_next_review(
    repetitions: u32,
    ease_factor: f64,
    quality: Quality,
    now: DateTime<Utc>,
) -> ReviewOutcome {
    let (new_repetitions, new_ease) = if quality.is_success() {
        let distance = (Quality::MAX - quality.value()) as f64;
        (
            repetitions.saturating_add(1),
            ease_factor + (0.1 - distance * (0.08 + distance * 0.02)),
        )
    } else {
        (0, ease_factor - LAPSE_PENALTY)
    };

    // NaN.max(1.3) is 1.3, so a corrupt stored ease also lands on the floor
    let new_ease = new_ease.max(MIN_EASE_FACTOR);

    let interval = interval_days(new_repetitions, new_ease);
    let next_review = TimeDelta::try_days(interval)
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);

    ReviewOutcome {
        repetitions: new_repetitions,
        ease_factor: new_ease,
        interval_days: interval,
        last_reviewed: now,
        next_review,
    }
}

/// Days until the next review for a card that now has `repetitions` successes.
///
/// A freshly lapsed card (0 repetitions) comes back after one day, same as a first success.
pub fn interval_days(repetitions: u32, ease_factor: f64) -> i64 {
    match repetitions {
        0 | 1 => 1,
        2 => 6,
        n => ((n - 1) as f64 * ease_factor.max(MIN_EASE_FACTOR)).round() as i64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CardId, Difficulty};
    use chrono::{Duration, TimeZone};

    const EPS: f64 = 1e-9;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 8, 30, 0).unwrap()
    }

    fn q(value: u8) -> Quality {
        Quality::new(value).unwrap()
    }

    fn card(repetitions: u32, ease_factor: f64) -> Flashcard {
        Flashcard {
            id: CardId::new(),
            user_id: "user".to_string(),
            front: "front".to_string(),
            back: "back".to_string(),
            subject: None,
            difficulty: Difficulty::Medium,
            repetitions,
            ease_factor,
            last_reviewed: None,
            next_review: None,
            created_at: now(),
            updated_at: now(),
        }
    }

    #[test]
    fn test_first_review() {
        let next = review(&card(0, 2.5), q(5), now());

        assert_eq!(next.repetitions, 1);
        assert!((next.ease_factor - 2.6).abs() < EPS);
        assert_eq!(next.interval_days, 1);
        assert_eq!(next.next_review, now() + Duration::days(1));
        assert_eq!(next.last_reviewed, now());
    }

    #[test]
    fn test_second_review() {
        let next = review(&card(1, 2.5), q(4), now());
        assert_eq!(next.repetitions, 2);
        assert_eq!(next.interval_days, 6);
        assert_eq!(next.next_review, now() + Duration::days(6));
    }

    #[test]
    fn test_third_review_uses_ease() {
        // grade 4 leaves the ease unchanged: 0.1 - 1 * (0.08 + 0.02) == 0
        let next = review(&card(2, 2.5), q(4), now());

        assert_eq!(next.repetitions, 3);
        assert!((next.ease_factor - 2.5).abs() < EPS);
        assert_eq!(next.interval_days, 5);
        assert_eq!(next.next_review, now() + Duration::days(5));
    }

    #[test]
    fn test_grade_three_lowers_ease() {
        // 0.1 - 2 * (0.08 + 2 * 0.02) = -0.14
        let next = review(&card(6, 2.5), q(3), now());
        assert!((next.ease_factor - 2.36).abs() < EPS);
        assert_eq!(next.interval_days, (6.0 * 2.36f64).round() as i64);
    }

    #[test]
    fn test_quality_below_3_resets() {
        let next = review(&card(4, 2.0), q(1), now());

        assert_eq!(next.repetitions, 0);
        assert!((next.ease_factor - 1.8).abs() < EPS);
        assert_eq!(next.interval_days, 1);
    }

    #[test]
    fn test_ef_floor() {
        let next = review(&card(5, 1.35), q(0), now());
        assert_eq!(next.ease_factor, MIN_EASE_FACTOR);

        let next = review(&card(1, MIN_EASE_FACTOR), q(3), now());
        assert_eq!(next.ease_factor, MIN_EASE_FACTOR);
    }

    #[test]
    fn test_ease_floor_holds_for_every_grade() {
        for reps in [0, 1, 2, 3, 10] {
            for ease in [1.3, 1.31, 1.5, 2.5, 4.0] {
                for grade in 0..=5 {
                    let next = calculate_next_review(reps, ease, q(grade), now());
                    assert!(next.ease_factor >= MIN_EASE_FACTOR);
                    assert!(next.interval_days >= 1);
                    assert_eq!(next.next_review, now() + Duration::days(next.interval_days));
                }
            }
        }
    }

    #[test]
    fn test_lapse_law() {
        for ease in [1.3, 1.4, 1.5, 2.5, 3.1] {
            for grade in 0..3 {
                let next = calculate_next_review(7, ease, q(grade), now());
                assert_eq!(next.repetitions, 0);
                assert!((next.ease_factor - (ease - 0.2).max(1.3)).abs() < EPS);
            }
        }
    }

    #[test]
    fn test_success_increments_repetitions() {
        for reps in [0, 1, 5, 40] {
            for grade in 3..=5 {
                let next = calculate_next_review(reps, 2.5, q(grade), now());
                assert_eq!(next.repetitions, reps + 1);
            }
        }
    }

    #[test]
    fn test_restart_after_lapse() {
        let mut state = card(9, 2.9);
        let lapse = review(&state, q(2), now());
        state.repetitions = lapse.repetitions;
        state.ease_factor = lapse.ease_factor;

        let later = lapse.next_review;
        let next = review(&state, q(5), later);
        assert_eq!(next.repetitions, 1);
        assert_eq!(next.interval_days, 1);
        assert_eq!(next.next_review, later + Duration::days(1));
    }

    #[test]
    fn test_interval_law() {
        assert_eq!(interval_days(1, 2.5), 1);
        assert_eq!(interval_days(2, 2.5), 6);
        assert_eq!(interval_days(3, 2.5), 5);
        assert_eq!(interval_days(4, 2.5), 8);
        assert_eq!(interval_days(3, 1.3), 3);
        assert_eq!(interval_days(11, 1.9), 19);
    }

    #[test]
    fn test_caller_supplied_ease_below_floor_is_reclamped() {
        let next = review(&card(0, 0.5), q(5), now());
        assert_eq!(next.ease_factor, MIN_EASE_FACTOR);
    }

    #[test]
    fn test_huge_interval_saturates() {
        let next = calculate_next_review(u32::MAX - 1, 1e12, q(5), now());
        assert_eq!(next.next_review, DateTime::<Utc>::MAX_UTC);
    }
}

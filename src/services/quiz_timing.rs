//! Availability and deadline arithmetic for quiz attempts.
//!
//! Everything here is pure: callers load the quiz, attempt and student rows, pass the
//! relevant fields in, and persist whatever [`AvailabilityOutcome`] says changed. The
//! locking and persistence half lives in `services::attempt_lifecycle`.

use time::PrimitiveDateTime;

use crate::core::time::add_minutes;
use crate::db::models::Quiz;
use crate::db::types::AttemptState;

/// Timing fields of a quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct QuizTiming {
    pub(crate) open_time: Option<PrimitiveDateTime>,
    pub(crate) time_limit: i32,
    pub(crate) time_window: Option<i32>,
}

impl QuizTiming {
    pub(crate) fn from_quiz(quiz: &Quiz) -> Self {
        Self {
            open_time: quiz.open_time_date,
            time_limit: quiz.time_limit,
            time_window: quiz.time_window,
        }
    }

    fn window(&self) -> i32 {
        self.time_window.unwrap_or(0).max(0)
    }

    /// `open_time + time_limit + time_window`, the latest instant anyone may still work.
    pub(crate) fn close_time(&self) -> Option<PrimitiveDateTime> {
        self.open_time.map(|open| add_minutes(add_minutes(open, self.time_limit), self.window()))
    }

    /// End time for a student who started at `time_start`, before extensions.
    pub(crate) fn end_time_for(&self, time_start: PrimitiveDateTime) -> PrimitiveDateTime {
        let own_limit = add_minutes(time_start, self.time_limit);
        match self.close_time() {
            Some(close) if close < own_limit => close,
            _ => own_limit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AvailabilityInput {
    pub(crate) timing: QuizTiming,
    pub(crate) state: AttemptState,
    pub(crate) time_start: PrimitiveDateTime,
    pub(crate) dead_line: Option<PrimitiveDateTime>,
    pub(crate) extension_minutes: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Availability {
    Available,
    NotStarted,
    Finished,
    Submitted,
}

impl Availability {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Availability::Available => "available",
            Availability::NotStarted => "not_started",
            Availability::Finished => "finished",
            Availability::Submitted => "submitted",
        }
    }

    pub(crate) fn message(self) -> &'static str {
        match self {
            Availability::Available => "Quiz is available",
            Availability::NotStarted => "Quiz has not started yet",
            Availability::Finished => "Quiz has finished",
            Availability::Submitted => "Quiz attempt has already been submitted",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AvailabilityOutcome {
    pub(crate) availability: Availability,
    pub(crate) state: AttemptState,
    pub(crate) dead_line: Option<PrimitiveDateTime>,
    /// The student's extension balance was spent and must be reset to zero.
    pub(crate) consumed_extension: bool,
}

impl AvailabilityOutcome {
    pub(crate) fn is_available(&self) -> bool {
        self.availability == Availability::Available
    }

    fn unchanged(input: &AvailabilityInput, availability: Availability) -> Self {
        Self {
            availability,
            state: input.state,
            dead_line: input.dead_line,
            consumed_extension: false,
        }
    }
}

/// Decides whether the attempt can be worked on at `now` and what to persist.
///
/// * Submitted and completed attempts are terminal and are never recomputed; a pending
///   extension stays untouched for them.
/// * Before the quiz opens nothing changes.
/// * Otherwise the end time is `min(open + limit + window, time_start + limit)`, replaced by
///   `now + extension` when an extension is pending. The stored deadline only moves later.
/// * The attempt becomes `InProgress` when available and `Completed` when not.
pub(crate) fn evaluate_availability(
    input: &AvailabilityInput,
    now: PrimitiveDateTime,
) -> AvailabilityOutcome {
    match input.state {
        AttemptState::Submitted => {
            return AvailabilityOutcome::unchanged(input, Availability::Submitted);
        }
        AttemptState::Completed => {
            return AvailabilityOutcome::unchanged(input, Availability::Finished);
        }
        AttemptState::Unattempted | AttemptState::InProgress => {}
    }

    let open = input.timing.open_time.unwrap_or(input.time_start);
    if now < open {
        return AvailabilityOutcome::unchanged(input, Availability::NotStarted);
    }

    let mut end_time = input.timing.end_time_for(input.time_start);
    let consumed_extension = input.extension_minutes > 0;
    if consumed_extension {
        end_time = add_minutes(now, input.extension_minutes);
    }

    let dead_line = match input.dead_line {
        Some(existing) if existing > end_time => existing,
        _ => end_time,
    };

    let available = open <= now && now <= dead_line;
    let (availability, state) = if available {
        (Availability::Available, AttemptState::InProgress)
    } else {
        (Availability::Finished, AttemptState::Completed)
    };

    AvailabilityOutcome { availability, state, dead_line: Some(dead_line), consumed_extension }
}

/// Whether a new attempt may be opened at `now`.
pub(crate) fn can_open_attempt(timing: &QuizTiming, now: PrimitiveDateTime) -> Availability {
    match (timing.open_time, timing.close_time()) {
        (Some(open), _) if now < open => Availability::NotStarted,
        (_, Some(close)) if now > close => Availability::Finished,
        _ => Availability::Available,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{Date, Duration, Month, Time};

    fn t0() -> PrimitiveDateTime {
        let date = Date::from_calendar_date(2025, Month::May, 20).unwrap();
        PrimitiveDateTime::new(date, Time::from_hms(9, 0, 0).unwrap())
    }

    fn comp_timing() -> QuizTiming {
        QuizTiming { open_time: Some(t0()), time_limit: 30, time_window: Some(10) }
    }

    fn input(state: AttemptState, start_offset: i64) -> AvailabilityInput {
        AvailabilityInput {
            timing: comp_timing(),
            state,
            time_start: t0() + Duration::minutes(start_offset),
            dead_line: None,
            extension_minutes: 0,
        }
    }

    #[test]
    fn late_start_gets_only_its_own_time_limit() {
        let outcome = evaluate_availability(&input(AttemptState::Unattempted, 5), t0() + Duration::minutes(6));

        assert_eq!(outcome.dead_line, Some(t0() + Duration::minutes(35)));
        assert_eq!(outcome.availability, Availability::Available);
        assert_eq!(outcome.state, AttemptState::InProgress);
        assert!(!outcome.consumed_extension);
    }

    #[test]
    fn very_late_start_is_capped_by_close_time() {
        let outcome =
            evaluate_availability(&input(AttemptState::Unattempted, 25), t0() + Duration::minutes(26));
        assert_eq!(outcome.dead_line, Some(t0() + Duration::minutes(40)));
    }

    #[test]
    fn expired_attempt_completes() {
        let outcome =
            evaluate_availability(&input(AttemptState::InProgress, 0), t0() + Duration::minutes(31));

        assert_eq!(outcome.availability, Availability::Finished);
        assert_eq!(outcome.state, AttemptState::Completed);
        assert_eq!(outcome.dead_line, Some(t0() + Duration::minutes(30)));
    }

    #[test]
    fn deadline_boundary_is_inclusive() {
        let outcome =
            evaluate_availability(&input(AttemptState::InProgress, 0), t0() + Duration::minutes(30));
        assert!(outcome.is_available());
    }

    #[test]
    fn before_open_changes_nothing() {
        let mut early = input(AttemptState::Unattempted, 0);
        early.extension_minutes = 15;
        let outcome = evaluate_availability(&early, t0() - Duration::minutes(1));

        assert_eq!(outcome.availability, Availability::NotStarted);
        assert_eq!(outcome.state, AttemptState::Unattempted);
        assert_eq!(outcome.dead_line, None);
        assert!(!outcome.consumed_extension);
    }

    #[test]
    fn extension_is_consumed_once_and_pushes_deadline() {
        let now = t0() + Duration::minutes(45);
        let mut first = input(AttemptState::InProgress, 0);
        first.dead_line = Some(t0() + Duration::minutes(30));
        first.extension_minutes = 20;

        let outcome = evaluate_availability(&first, now);
        assert!(outcome.consumed_extension);
        assert_eq!(outcome.dead_line, Some(now + Duration::minutes(20)));
        assert!(outcome.is_available());

        let second = AvailabilityInput {
            dead_line: outcome.dead_line,
            state: outcome.state,
            extension_minutes: 0,
            ..first
        };
        let later = evaluate_availability(&second, now + Duration::minutes(5));
        assert!(!later.consumed_extension);
        assert_eq!(later.dead_line, outcome.dead_line);
        assert!(later.is_available());
    }

    #[test]
    fn short_extension_never_moves_deadline_earlier() {
        let mut current = input(AttemptState::InProgress, 0);
        current.dead_line = Some(t0() + Duration::minutes(60));
        current.extension_minutes = 1;

        let outcome = evaluate_availability(&current, t0() + Duration::minutes(10));
        assert!(outcome.consumed_extension);
        assert_eq!(outcome.dead_line, Some(t0() + Duration::minutes(60)));
    }

    #[test]
    fn deadline_is_monotonic_across_repeated_checks() {
        let mut current = input(AttemptState::Unattempted, 3);
        let mut previous = None;
        for step in 0..50 {
            let now = t0() + Duration::minutes(step);
            current.extension_minutes = if step % 7 == 0 { 5 } else { 0 };
            let outcome = evaluate_availability(&current, now);
            if let (Some(before), Some(after)) = (previous, outcome.dead_line) {
                assert!(after >= before, "deadline regressed at step {step}");
            }
            previous = outcome.dead_line.or(previous);
            current.dead_line = outcome.dead_line;
            current.state = outcome.state;
        }
    }

    #[test]
    fn state_never_moves_backwards() {
        let order = |state: AttemptState| state.code();
        let mut current = input(AttemptState::Unattempted, 0);
        for step in [0, 10, 29, 31, 35, 60] {
            current.extension_minutes = if step == 35 { 30 } else { 0 };
            let outcome = evaluate_availability(&current, t0() + Duration::minutes(step));
            assert!(order(outcome.state) >= order(current.state));
            current.state = outcome.state;
            current.dead_line = outcome.dead_line;
        }
        assert_eq!(current.state, AttemptState::Completed);
    }

    #[test]
    fn submitted_is_terminal_and_keeps_extension() {
        let mut submitted = input(AttemptState::Submitted, 0);
        submitted.extension_minutes = 10;
        submitted.dead_line = Some(t0() + Duration::minutes(30));

        let outcome = evaluate_availability(&submitted, t0() + Duration::minutes(5));
        assert_eq!(outcome.availability, Availability::Submitted);
        assert_eq!(outcome.state, AttemptState::Submitted);
        assert!(!outcome.consumed_extension);
        assert_eq!(outcome.dead_line, submitted.dead_line);
    }

    #[test]
    fn completed_is_terminal() {
        let outcome =
            evaluate_availability(&input(AttemptState::Completed, 0), t0() + Duration::minutes(1));
        assert_eq!(outcome.availability, Availability::Finished);
        assert_eq!(outcome.state, AttemptState::Completed);
    }

    #[test]
    fn practice_quiz_without_open_time_runs_from_start() {
        let start = t0();
        let practice = AvailabilityInput {
            timing: QuizTiming { open_time: None, time_limit: 20, time_window: None },
            state: AttemptState::Unattempted,
            time_start: start,
            dead_line: None,
            extension_minutes: 0,
        };

        let outcome = evaluate_availability(&practice, start + Duration::minutes(19));
        assert!(outcome.is_available());
        assert_eq!(outcome.dead_line, Some(start + Duration::minutes(20)));
    }

    #[test]
    fn open_attempt_window() {
        let timing = comp_timing();
        assert_eq!(can_open_attempt(&timing, t0() - Duration::seconds(1)), Availability::NotStarted);
        assert_eq!(can_open_attempt(&timing, t0() + Duration::minutes(40)), Availability::Available);
        assert_eq!(can_open_attempt(&timing, t0() + Duration::minutes(41)), Availability::Finished);

        let practice = QuizTiming { open_time: None, time_limit: 10, time_window: None };
        assert_eq!(can_open_attempt(&practice, t0()), Availability::Available);
    }

    #[test]
    fn extreme_limits_saturate_instead_of_overflowing() {
        let timing =
            QuizTiming { open_time: Some(t0()), time_limit: i32::MAX, time_window: Some(i32::MAX) };
        assert_eq!(timing.close_time(), Some(PrimitiveDateTime::MAX));
        assert_eq!(can_open_attempt(&timing, t0()), Availability::Available);

        let extreme = AvailabilityInput {
            timing,
            state: AttemptState::InProgress,
            time_start: t0(),
            dead_line: None,
            extension_minutes: i32::MAX,
        };
        let outcome = evaluate_availability(&extreme, t0() + Duration::minutes(1));
        assert!(outcome.is_available());
        assert_eq!(outcome.dead_line, Some(PrimitiveDateTime::MAX));
    }
}

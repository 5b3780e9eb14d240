//! Streak and completion-rate derivation.
//!
//! Everything here is a pure function of a habit's cadence, its completion
//! dates and the reference day. Nothing is cached: callers recompute from
//! the full ledger on every read.
//!
//! Periods are calendar days for daily habits and Monday-start weeks for
//! weekly and multiple-times-week habits. A period *qualifies* when it holds
//! at least `target_count` completions (always 1 for daily and weekly).

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use crate::models::habit::{Habit, HabitFrequency};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StreakSummary {
    pub current_streak: i32,
    pub longest_streak: i32,
    /// Percentage of periods in the lookback window that qualified, unrounded.
    pub completion_rate: f64,
}

/// Reference day and lookback window shared by every habit in a request.
#[derive(Debug, Clone, Copy)]
pub struct StreakEngine {
    today: NaiveDate,
    window: u32,
}

impl StreakEngine {
    pub fn new(today: NaiveDate, window: u32) -> Self {
        Self {
            today,
            window: window.max(1),
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn summarize(&self, habit: &Habit, dates: &[NaiveDate]) -> StreakSummary {
        self.compute(
            habit.frequency,
            habit.target_count,
            habit.created_on(),
            dates,
        )
    }

    pub fn compute(
        &self,
        frequency: HabitFrequency,
        target_count: i32,
        created_on: NaiveDate,
        dates: &[NaiveDate],
    ) -> StreakSummary {
        let cadence = Cadence::new(frequency, target_count);
        let periods = cadence.qualifying_periods(dates, self.today);
        if periods.is_empty() {
            return StreakSummary::default();
        }

        let anchor = cadence.period_start(self.today);
        let current_streak = trailing_run(&periods, cadence.step(), anchor);
        let longest_streak = longest_run(&periods, cadence.step()).max(current_streak);
        let completion_rate = self.completion_rate(&cadence, &periods, created_on);

        StreakSummary {
            current_streak,
            longest_streak,
            completion_rate,
        }
    }

    fn completion_rate(
        &self,
        cadence: &Cadence,
        periods: &[NaiveDate],
        created_on: NaiveDate,
    ) -> f64 {
        let step = cadence.step();
        let anchor = cadence.period_start(self.today);
        let earliest = anchor
            .checked_sub_signed(step * (self.window as i32 - 1))
            .unwrap_or(NaiveDate::MIN);
        let start = earliest.max(cadence.period_start(created_on));
        if start > anchor {
            return 0.0;
        }

        let total = (anchor - start).num_days() / step.num_days() + 1;
        let hits = periods
            .iter()
            .filter(|p| **p >= start && **p <= anchor)
            .count() as i64;

        hits as f64 * 100.0 / total as f64
    }
}

/// How a habit's completions are bucketed into periods.
#[derive(Debug, Clone, Copy)]
struct Cadence {
    weekly: bool,
    target: usize,
}

impl Cadence {
    fn new(frequency: HabitFrequency, target_count: i32) -> Self {
        let target = match frequency {
            HabitFrequency::MultipleTimesWeek => target_count.max(1) as usize,
            HabitFrequency::Daily | HabitFrequency::Weekly => 1,
        };
        Self {
            weekly: frequency.is_weekly(),
            target,
        }
    }

    fn step(&self) -> Duration {
        if self.weekly {
            Duration::days(7)
        } else {
            Duration::days(1)
        }
    }

    fn period_start(&self, date: NaiveDate) -> NaiveDate {
        if self.weekly {
            find_monday(date)
        } else {
            date
        }
    }

    /// Sorted start dates of every qualifying period up to and including today.
    fn qualifying_periods(&self, dates: &[NaiveDate], today: NaiveDate) -> Vec<NaiveDate> {
        let mut counts: BTreeMap<NaiveDate, usize> = BTreeMap::new();
        let mut sorted: Vec<NaiveDate> = dates.iter().copied().filter(|d| *d <= today).collect();
        sorted.sort_unstable();
        sorted.dedup();

        for date in sorted {
            *counts.entry(self.period_start(date)).or_default() += 1;
        }

        counts
            .into_iter()
            .filter(|(_, count)| *count >= self.target)
            .map(|(period, _)| period)
            .collect()
    }
}

/// Find the Monday of the week containing `date`.
///
/// Saturates at `NaiveDate::MIN` for the first, partial week of the calendar.
pub fn find_monday(date: NaiveDate) -> NaiveDate {
    let weekday = date.weekday().num_days_from_monday(); // Mon=0
    date.checked_sub_signed(Duration::days(weekday as i64))
        .unwrap_or(NaiveDate::MIN)
}

/// Length of the run ending at `anchor` or the period before it.
fn trailing_run(periods: &[NaiveDate], step: Duration, anchor: NaiveDate) -> i32 {
    let Some(&last) = periods.last() else {
        return 0;
    };
    if last != anchor && Some(last) != anchor.checked_sub_signed(step) {
        return 0;
    }

    let mut streak = 1;
    let mut expected = last.checked_sub_signed(step);
    for period in periods.iter().rev().skip(1) {
        if Some(*period) != expected {
            break;
        }
        streak += 1;
        expected = period.checked_sub_signed(step);
    }
    streak
}

fn longest_run(periods: &[NaiveDate], step: Duration) -> i32 {
    let mut longest = 0i32;
    let mut run = 0i32;
    let mut prev: Option<NaiveDate> = None;

    for period in periods {
        run = match prev {
            Some(p) if p.checked_add_signed(step) == Some(*period) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        prev = Some(*period);
    }
    longest
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        // February 2026: the 9th is a Monday.
        NaiveDate::from_ymd_opt(2026, 2, d).unwrap()
    }

    fn engine(today: NaiveDate) -> StreakEngine {
        StreakEngine::new(today, 30)
    }

    fn daily(today: NaiveDate, created: NaiveDate, dates: &[NaiveDate]) -> StreakSummary {
        engine(today).compute(HabitFrequency::Daily, 1, created, dates)
    }

    // ── find_monday ──────────────────────────────────────────────────────

    #[test]
    fn test_find_monday_midweek() {
        assert_eq!(find_monday(day(10)), day(9));
        assert_eq!(find_monday(day(13)), day(9));
    }

    #[test]
    fn test_find_monday_is_monday() {
        assert_eq!(find_monday(day(9)), day(9));
    }

    #[test]
    fn test_find_monday_sunday() {
        assert_eq!(find_monday(day(15)), day(9));
    }

    #[test]
    fn test_find_monday_saturates_at_calendar_start() {
        assert_eq!(find_monday(NaiveDate::MIN), NaiveDate::MIN);
    }

    // ── daily streaks ────────────────────────────────────────────────────

    #[test]
    fn test_streak_empty() {
        let summary = daily(day(10), day(1), &[]);
        assert_eq!(summary, StreakSummary::default());
    }

    #[test]
    fn test_streak_single_today() {
        let summary = daily(day(10), day(10), &[day(10)]);
        assert_eq!(summary.current_streak, 1);
        assert_eq!(summary.longest_streak, 1);
        assert_eq!(summary.completion_rate, 100.0);
    }

    #[test]
    fn test_streak_survives_until_today_is_done() {
        let dates = [day(1), day(2), day(3)];
        let summary = daily(day(4), day(1), &dates);
        assert_eq!(summary.current_streak, 3);
        assert_eq!(summary.longest_streak, 3);
    }

    #[test]
    fn test_streak_resets_after_missed_day() {
        let dates = [day(1), day(2), day(3)];
        let summary = daily(day(5), day(1), &dates);
        assert_eq!(summary.current_streak, 0);
        assert_eq!(summary.longest_streak, 3);
    }

    #[test]
    fn test_streak_gap_breaks_current() {
        let dates = [day(6), day(7), day(8), day(10)];
        let summary = daily(day(10), day(1), &dates);
        assert_eq!(summary.current_streak, 1);
        assert_eq!(summary.longest_streak, 3);
    }

    #[test]
    fn test_streak_ignores_unsorted_and_duplicate_input() {
        let dates = [day(9), day(8), day(9), day(10)];
        let summary = daily(day(10), day(1), &dates);
        assert_eq!(summary.current_streak, 3);
        assert_eq!(summary.longest_streak, 3);
    }

    #[test]
    fn test_future_dates_ignored() {
        let dates = [day(9), day(10), day(11)];
        let summary = daily(day(10), day(9), &dates);
        assert_eq!(summary.current_streak, 2);
        assert_eq!(summary.longest_streak, 2);
        assert_eq!(summary.completion_rate, 100.0);
    }

    #[test]
    fn test_longest_streak_never_decreases_as_completions_added() {
        let additions = [day(3), day(1), day(2), day(7), day(5), day(6), day(4), day(10)];
        let mut dates = Vec::new();
        let mut previous = 0;
        for date in additions {
            dates.push(date);
            let summary = daily(day(10), day(1), &dates);
            assert!(summary.longest_streak >= previous);
            assert!(summary.longest_streak >= summary.current_streak);
            previous = summary.longest_streak;
        }
        assert_eq!(previous, 7);
    }

    // ── weekly streaks ───────────────────────────────────────────────────

    #[test]
    fn test_weekly_streak_counts_weeks() {
        // Weeks starting Jan 26, Feb 2 and Feb 9 each hold one completion.
        let dates = [
            NaiveDate::from_ymd_opt(2026, 1, 28).unwrap(),
            day(6),
            day(9),
        ];
        let summary = engine(day(12)).compute(
            HabitFrequency::Weekly,
            1,
            NaiveDate::from_ymd_opt(2026, 1, 26).unwrap(),
            &dates,
        );
        assert_eq!(summary.current_streak, 3);
        assert_eq!(summary.longest_streak, 3);
        assert_eq!(summary.completion_rate, 100.0);
    }

    #[test]
    fn test_weekly_current_week_pending_keeps_streak() {
        let dates = [NaiveDate::from_ymd_opt(2026, 1, 27).unwrap(), day(3)];
        let summary = engine(day(11)).compute(
            HabitFrequency::Weekly,
            1,
            NaiveDate::from_ymd_opt(2026, 1, 26).unwrap(),
            &dates,
        );
        assert_eq!(summary.current_streak, 2);
    }

    #[test]
    fn test_weekly_missed_week_resets() {
        let dates = [NaiveDate::from_ymd_opt(2026, 1, 27).unwrap()];
        let summary = engine(day(11)).compute(
            HabitFrequency::Weekly,
            1,
            NaiveDate::from_ymd_opt(2026, 1, 26).unwrap(),
            &dates,
        );
        assert_eq!(summary.current_streak, 0);
        assert_eq!(summary.longest_streak, 1);
    }

    #[test]
    fn test_multiple_times_week_needs_target() {
        // Week of Feb 2: three completions. Week of Feb 9: two so far.
        let dates = [day(2), day(4), day(6), day(9), day(10)];
        let summary = engine(day(11)).compute(HabitFrequency::MultipleTimesWeek, 3, day(2), &dates);
        assert_eq!(summary.current_streak, 1);
        assert_eq!(summary.longest_streak, 1);
        // Two periods in the window, one qualified.
        assert_eq!(summary.completion_rate, 50.0);

        let mut more = dates.to_vec();
        more.push(day(11));
        let summary = engine(day(11)).compute(HabitFrequency::MultipleTimesWeek, 3, day(2), &more);
        assert_eq!(summary.current_streak, 2);
        assert_eq!(summary.completion_rate, 100.0);
    }

    #[test]
    fn test_multiple_times_week_below_target_everywhere() {
        let dates = [day(2), day(9)];
        let summary = engine(day(11)).compute(HabitFrequency::MultipleTimesWeek, 2, day(2), &dates);
        assert_eq!(summary, StreakSummary::default());
    }

    // ── completion rate ──────────────────────────────────────────────────

    #[test]
    fn test_completion_rate_window_clipped_to_creation() {
        // Created on the 6th, today the 10th: five days, three done.
        let dates = [day(6), day(8), day(10)];
        let summary = daily(day(10), day(6), &dates);
        assert_eq!(summary.completion_rate, 60.0);
    }

    #[test]
    fn test_completion_rate_trailing_window() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 31).unwrap();
        let created = NaiveDate::from_ymd_opt(2025, 12, 1).unwrap();
        // Completions before the 30-day window do not count.
        let mut dates = vec![NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()];
        for d in 1..=15 {
            dates.push(NaiveDate::from_ymd_opt(2026, 3, d).unwrap());
        }
        let summary = daily(today, created, &dates);
        // Window is Mar 2..=Mar 31, which holds Mar 2..=Mar 15.
        assert_eq!(summary.completion_rate, 14.0 * 100.0 / 30.0);
    }

    #[test]
    fn test_completion_rate_custom_window() {
        let dates = [day(9), day(10)];
        let summary = StreakEngine::new(day(10), 4).compute(HabitFrequency::Daily, 1, day(1), &dates);
        assert_eq!(summary.completion_rate, 50.0);
    }

    #[test]
    fn test_completion_rate_created_after_today() {
        let summary = daily(day(10), day(12), &[day(9)]);
        assert_eq!(summary.completion_rate, 0.0);
        assert_eq!(summary.current_streak, 1);
    }

    #[test]
    fn test_extreme_dates_do_not_overflow() {
        let dates = [NaiveDate::MIN, day(9), day(10)];
        for frequency in [HabitFrequency::Daily, HabitFrequency::Weekly] {
            let summary = engine(day(10)).compute(frequency, 1, NaiveDate::MIN, &dates);
            assert!(summary.longest_streak >= 1);
        }

        let summary = StreakEngine::new(NaiveDate::MIN, 30).compute(
            HabitFrequency::Weekly,
            1,
            NaiveDate::MIN,
            &[NaiveDate::MIN],
        );
        assert_eq!(summary.current_streak, 1);
    }
}

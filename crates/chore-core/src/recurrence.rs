use chrono::{DateTime, Datelike, Days, Months, NaiveDate, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::calendar::{clamp_day_of_month, nth_weekday_of_month, weekday_from_iso};
use crate::error::CoreError;
use crate::models::RecurrenceClass;
use crate::timezone::local_date;

/// Upper bound on skip-forward re-applications for a late completion.
pub const MAX_SKIP_ITERATIONS: u32 = 24;

/// Which occurrence of a weekday inside a month a rule targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeekOfMonth {
    First,
    Second,
    Third,
    Fourth,
    Last,
}

impl WeekOfMonth {
    /// The `nth` argument understood by [`nth_weekday_of_month`].
    pub fn nth(&self) -> i8 {
        match self {
            WeekOfMonth::First => 1,
            WeekOfMonth::Second => 2,
            WeekOfMonth::Third => 3,
            WeekOfMonth::Fourth => 4,
            WeekOfMonth::Last => -1,
        }
    }

    fn from_nth(nth: i8) -> Option<Self> {
        match nth {
            1 => Some(WeekOfMonth::First),
            2 => Some(WeekOfMonth::Second),
            3 => Some(WeekOfMonth::Third),
            4 => Some(WeekOfMonth::Fourth),
            -1 => Some(WeekOfMonth::Last),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RulePattern {
    /// A fixed day of the month, clamped to the month's length. `None`
    /// keeps the day-of-month of the date being advanced.
    ByDate { day: Option<u32> },
    /// The nth weekday of the month.
    ByWeekday { weekday: Weekday, week: WeekOfMonth },
}

/// Structured refinement of a month-based recurrence class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecurrenceRule {
    pub pattern: RulePattern,
    /// Anchor month for yearly tasks (1-12)
    pub month: Option<u32>,
    /// First month of the cycle for seasonal and half-year tasks (1-12)
    pub start_month: Option<u32>,
}

/// Wire shape of a stored rule. Everything optional; [`RecurrenceRule::try_from`]
/// decides what a valid combination is.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mode: Option<String>,
    #[serde(default, alias = "dayOfMonth", alias = "day_of_month", skip_serializing_if = "Option::is_none")]
    day: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    weekday: Option<u8>,
    #[serde(default, alias = "week_of_month", skip_serializing_if = "Option::is_none")]
    week_of_month: Option<i8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    month: Option<u32>,
    #[serde(default, alias = "start_month", skip_serializing_if = "Option::is_none")]
    start_month: Option<u32>,
}

impl TryFrom<StoredRule> for RecurrenceRule {
    type Error = CoreError;

    fn try_from(raw: StoredRule) -> Result<Self, Self::Error> {
        let month_field = |name: &str, value: Option<u32>| match value {
            Some(m) if !(1..=12).contains(&m) => {
                Err(CoreError::CorruptRule(format!("{} must be 1-12, got {}", name, m)))
            }
            other => Ok(other),
        };
        let month = month_field("month", raw.month)?;
        let start_month = month_field("startMonth", raw.start_month)?;

        let pattern = match raw.mode.as_deref() {
            None | Some("by_date") => {
                if let Some(day) = raw.day {
                    if !(1..=31).contains(&day) {
                        return Err(CoreError::CorruptRule(format!("day must be 1-31, got {}", day)));
                    }
                }
                RulePattern::ByDate { day: raw.day }
            }
            Some("by_weekday") => {
                let weekday = raw
                    .weekday
                    .and_then(weekday_from_iso)
                    .ok_or_else(|| CoreError::CorruptRule(format!("weekday must be 1-7, got {:?}", raw.weekday)))?;
                let week = raw
                    .week_of_month
                    .and_then(WeekOfMonth::from_nth)
                    .ok_or_else(|| {
                        CoreError::CorruptRule(format!(
                            "weekOfMonth must be one of 1, 2, 3, 4, -1, got {:?}",
                            raw.week_of_month
                        ))
                    })?;
                RulePattern::ByWeekday { weekday, week }
            }
            Some(other) => return Err(CoreError::CorruptRule(format!("unknown mode '{}'", other))),
        };

        Ok(RecurrenceRule { pattern, month, start_month })
    }
}

impl From<&RecurrenceRule> for StoredRule {
    fn from(rule: &RecurrenceRule) -> Self {
        let mut stored = StoredRule {
            month: rule.month,
            start_month: rule.start_month,
            ..Default::default()
        };
        match rule.pattern {
            RulePattern::ByDate { day } => {
                stored.mode = Some("by_date".to_string());
                stored.day = day;
            }
            RulePattern::ByWeekday { weekday, week } => {
                stored.mode = Some("by_weekday".to_string());
                stored.weekday = u8::try_from(weekday.number_from_monday()).ok();
                stored.week_of_month = Some(week.nth());
            }
        }
        stored
    }
}

impl RecurrenceRule {
    /// Decodes a stored rule payload.
    ///
    /// `None`, an empty string and JSON `null` all mean "no rule". Anything
    /// else that does not describe a valid rule is a [`CoreError::CorruptRule`].
    pub fn from_stored(raw: Option<&str>) -> Result<Option<Self>, CoreError> {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(None);
        };
        let stored: Option<StoredRule> = serde_json::from_str(raw)
            .map_err(|e| CoreError::CorruptRule(format!("{}: {}", raw, e)))?;
        stored.map(RecurrenceRule::try_from).transpose()
    }

    /// Canonical JSON for storage.
    pub fn to_stored(&self) -> String {
        // A struct of plain options always serializes
        serde_json::to_string(&StoredRule::from(self)).unwrap_or_default()
    }
}

/// Result of a single [`RecurrenceEngine::advance_detailed`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvanceOutcome {
    pub next_due: NaiveDate,
    /// Single-step applications performed, including the first one
    pub steps: u32,
    /// Whether the skip-forward loop stopped at [`MAX_SKIP_ITERATIONS`]
    /// with a candidate still not after `not_before`
    pub bound_hit: bool,
}

/// RecurrenceEngine: computes the next due date of a chore.
///
/// Responsibilities:
/// 1. Apply the base step of a recurrence class (day, week, month multiples)
/// 2. Resolve rule refinements (fixed day, nth weekday, anchor months)
/// 3. Skip forward past a late completion date, bounded
#[derive(Debug, Clone, Copy, Default)]
pub struct RecurrenceEngine;

impl RecurrenceEngine {
    pub fn new() -> Self {
        Self
    }

    /// Computes the next due date.
    ///
    /// # Arguments
    /// * `from` - The current (possibly stale) due date
    /// * `class` - The task's recurrence class
    /// * `rule` - Optional rule refinement
    /// * `not_before` - The actual completion date, when known
    ///
    /// # Returns
    /// * `Result<NaiveDate, CoreError>` - The next due date
    ///
    /// # Behavior
    /// - One-off tasks never advance (`InvalidInput`); callers deactivate them
    /// - With `not_before`, re-applies the step until the result is strictly after it
    /// - Hitting the iteration bound is logged and returns the last candidate
    pub fn advance(
        &self,
        from: NaiveDate,
        class: RecurrenceClass,
        rule: Option<&RecurrenceRule>,
        not_before: Option<NaiveDate>,
    ) -> Result<NaiveDate, CoreError> {
        self.advance_detailed(from, class, rule, not_before)
            .map(|outcome| outcome.next_due)
    }

    /// Like [`advance`](Self::advance), with the completion given as an
    /// instant that is converted to a calendar date in `tz`.
    pub fn advance_on_completion(
        &self,
        from: NaiveDate,
        class: RecurrenceClass,
        rule: Option<&RecurrenceRule>,
        tz: Tz,
        completed_at: DateTime<Utc>,
    ) -> Result<AdvanceOutcome, CoreError> {
        self.advance_detailed(from, class, rule, Some(local_date(tz, completed_at)))
    }

    pub fn advance_detailed(
        &self,
        from: NaiveDate,
        class: RecurrenceClass,
        rule: Option<&RecurrenceRule>,
        not_before: Option<NaiveDate>,
    ) -> Result<AdvanceOutcome, CoreError> {
        let mut candidate = self.step(from, class, rule)?;
        let mut steps = 1;
        let mut bound_hit = false;

        if let Some(not_before) = not_before {
            let mut iterations = 0;
            while candidate <= not_before {
                if iterations >= MAX_SKIP_ITERATIONS {
                    bound_hit = true;
                    warn!(
                        %from, %class, %not_before, %candidate,
                        "skip-forward bound exhausted; rule or due date looks misconfigured"
                    );
                    break;
                }
                candidate = self.step(candidate, class, rule)?;
                iterations += 1;
                steps += 1;
            }
        }

        Ok(AdvanceOutcome { next_due: candidate, steps, bound_hit })
    }

    /// Applies exactly one recurrence step.
    pub fn step(
        &self,
        from: NaiveDate,
        class: RecurrenceClass,
        rule: Option<&RecurrenceRule>,
    ) -> Result<NaiveDate, CoreError> {
        let next = match (class, class.month_interval(), rule) {
            (RecurrenceClass::Once, _, _) => {
                return Err(CoreError::InvalidInput(
                    "one-off tasks do not recur".to_string(),
                ))
            }
            (RecurrenceClass::Daily, _, _) => from.checked_add_days(Days::new(1)),
            (RecurrenceClass::Weekly, _, _) => from.checked_add_days(Days::new(7)),
            (_, Some(interval), None) => from.checked_add_months(Months::new(interval)),
            (_, Some(interval), Some(rule)) => Self::step_with_rule(from, class, interval, rule),
            (_, None, _) => None,
        };

        next.ok_or_else(|| {
            CoreError::InvalidInput(format!("no {} date follows {}", class, from))
        })
    }

    fn step_with_rule(
        from: NaiveDate,
        class: RecurrenceClass,
        interval: u32,
        rule: &RecurrenceRule,
    ) -> Option<NaiveDate> {
        let from_index = from.year() * 12 + from.month0() as i32;
        let target_index = match (class, rule.month, rule.start_month) {
            (RecurrenceClass::Yearly, Some(anchor), _) => (from.year() + 1) * 12 + anchor as i32 - 1,
            (RecurrenceClass::Seasonal | RecurrenceClass::HalfYear, _, Some(start)) => {
                // First month of the cycle strictly after `from`'s month
                let k = interval as i32;
                let offset = (start as i32 - 1 - from.month0() as i32).rem_euclid(k);
                from_index + if offset == 0 { k } else { offset }
            }
            _ => from_index + interval as i32,
        };

        let year = target_index.div_euclid(12);
        let month = target_index.rem_euclid(12) as u32 + 1;

        match rule.pattern {
            RulePattern::ByWeekday { weekday, week } => {
                nth_weekday_of_month(year, month, weekday, week.nth())
            }
            RulePattern::ByDate { day } => clamp_day_of_month(year, month, day.unwrap_or(from.day())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn rule(json: &str) -> RecurrenceRule {
        RecurrenceRule::from_stored(Some(json)).unwrap().unwrap()
    }

    mod rule_parsing_tests {
        use super::*;

        #[test]
        fn test_empty_payloads_mean_no_rule() {
            assert_eq!(RecurrenceRule::from_stored(None).unwrap(), None);
            assert_eq!(RecurrenceRule::from_stored(Some("")).unwrap(), None);
            assert_eq!(RecurrenceRule::from_stored(Some("  ")).unwrap(), None);
            assert_eq!(RecurrenceRule::from_stored(Some("null")).unwrap(), None);
        }

        #[test]
        fn test_mode_defaults_to_by_date() {
            assert_eq!(
                rule(r#"{"month":6}"#),
                RecurrenceRule {
                    pattern: RulePattern::ByDate { day: None },
                    month: Some(6),
                    start_month: None,
                }
            );
        }

        #[test]
        fn test_by_weekday_accepts_camel_and_snake_case() {
            let expected = RulePattern::ByWeekday { weekday: Weekday::Mon, week: WeekOfMonth::Last };
            assert_eq!(rule(r#"{"mode":"by_weekday","weekday":1,"weekOfMonth":-1}"#).pattern, expected);
            assert_eq!(rule(r#"{"mode":"by_weekday","weekday":1,"week_of_month":-1}"#).pattern, expected);
        }

        #[rstest]
        #[case(r#"{"mode":"by_weekday","weekday":1}"#)]
        #[case(r#"{"mode":"by_weekday","weekday":8,"weekOfMonth":1}"#)]
        #[case(r#"{"mode":"by_weekday","weekday":1,"weekOfMonth":5}"#)]
        #[case(r#"{"mode":"by_date","day":32}"#)]
        #[case(r#"{"mode":"sometimes"}"#)]
        #[case(r#"{"month":13}"#)]
        #[case(r#"{"startMonth":0}"#)]
        #[case(r#"{"day":"first"}"#)]
        #[case("not json")]
        #[case("[1,2,3]")]
        fn test_corrupt_rules_are_reported(#[case] raw: &str) {
            assert!(matches!(
                RecurrenceRule::from_stored(Some(raw)),
                Err(CoreError::CorruptRule(_))
            ));
        }

        #[test]
        fn test_to_stored_is_canonical() {
            let parsed = rule(r#"{"mode":"by_weekday","weekday":3,"week_of_month":2,"start_month":2}"#);
            let stored = parsed.to_stored();
            assert_eq!(stored, r#"{"mode":"by_weekday","weekday":3,"weekOfMonth":2,"startMonth":2}"#);
            assert_eq!(rule(&stored), parsed);
        }
    }

    mod base_step_tests {
        use super::*;

        #[rstest]
        #[case(RecurrenceClass::Daily, date(2024, 2, 28), date(2024, 2, 29))]
        #[case(RecurrenceClass::Weekly, date(2024, 12, 30), date(2025, 1, 6))]
        #[case(RecurrenceClass::Monthly, date(2024, 1, 15), date(2024, 2, 15))]
        #[case(RecurrenceClass::Monthly, date(2024, 1, 31), date(2024, 2, 29))]
        #[case(RecurrenceClass::Seasonal, date(2024, 11, 30), date(2025, 2, 28))]
        #[case(RecurrenceClass::HalfYear, date(2024, 3, 10), date(2024, 9, 10))]
        #[case(RecurrenceClass::Yearly, date(2024, 2, 29), date(2025, 2, 28))]
        fn test_step_without_rule(#[case] class: RecurrenceClass, #[case] from: NaiveDate, #[case] expected: NaiveDate) {
            assert_eq!(RecurrenceEngine::new().advance(from, class, None, None).unwrap(), expected);
        }

        #[test]
        fn test_once_does_not_advance() {
            let result = RecurrenceEngine::new().advance(date(2024, 1, 1), RecurrenceClass::Once, None, None);
            assert!(matches!(result, Err(CoreError::InvalidInput(_))));
        }

        #[test]
        fn test_rule_is_ignored_for_day_based_classes() {
            let last_monday = rule(r#"{"mode":"by_weekday","weekday":1,"weekOfMonth":-1}"#);
            let next = RecurrenceEngine::new()
                .advance(date(2024, 1, 3), RecurrenceClass::Weekly, Some(&last_monday), None)
                .unwrap();
            assert_eq!(next, date(2024, 1, 10));
        }
    }

    mod rule_step_tests {
        use super::*;

        #[rstest]
        #[case(RecurrenceClass::Monthly, r#"{"day":31}"#, date(2024, 1, 31), date(2024, 2, 29))]
        #[case(RecurrenceClass::Monthly, r#"{"day":31}"#, date(2024, 2, 29), date(2024, 3, 31))]
        #[case(RecurrenceClass::Monthly, r#"{"mode":"by_date"}"#, date(2024, 3, 17), date(2024, 4, 17))]
        #[case(RecurrenceClass::Monthly, r#"{"mode":"by_weekday","weekday":1,"weekOfMonth":-1}"#, date(2024, 1, 29), date(2024, 2, 26))]
        #[case(RecurrenceClass::Monthly, r#"{"mode":"by_weekday","weekday":6,"weekOfMonth":1}"#, date(2024, 11, 2), date(2024, 12, 7))]
        #[case(RecurrenceClass::Yearly, r#"{"month":6}"#, date(2024, 6, 10), date(2025, 6, 10))]
        #[case(RecurrenceClass::Yearly, r#"{"month":3,"day":31}"#, date(2024, 9, 1), date(2025, 3, 31))]
        #[case(RecurrenceClass::Yearly, r#"{"day":1}"#, date(2024, 9, 15), date(2025, 9, 1))]
        #[case(RecurrenceClass::Seasonal, r#"{"startMonth":1,"day":1}"#, date(2024, 1, 1), date(2024, 4, 1))]
        #[case(RecurrenceClass::Seasonal, r#"{"startMonth":1,"day":1}"#, date(2024, 2, 20), date(2024, 4, 1))]
        #[case(RecurrenceClass::Seasonal, r#"{"startMonth":3,"day":15}"#, date(2024, 12, 15), date(2025, 3, 15))]
        #[case(RecurrenceClass::HalfYear, r#"{"startMonth":4,"mode":"by_weekday","weekday":7,"weekOfMonth":2}"#, date(2024, 5, 1), date(2024, 10, 13))]
        fn test_step_with_rule(
            #[case] class: RecurrenceClass,
            #[case] raw: &str,
            #[case] from: NaiveDate,
            #[case] expected: NaiveDate,
        ) {
            let rule = rule(raw);
            assert_eq!(RecurrenceEngine::new().advance(from, class, Some(&rule), None).unwrap(), expected);
        }
    }

    mod skip_forward_tests {
        use super::*;

        #[test]
        fn test_late_weekly_completion_skips_forward() {
            let outcome = RecurrenceEngine::new()
                .advance_detailed(date(2024, 1, 1), RecurrenceClass::Weekly, None, Some(date(2024, 1, 20)))
                .unwrap();
            assert_eq!(outcome.next_due, date(2024, 1, 22));
            assert_eq!(outcome.steps, 3);
            assert!(!outcome.bound_hit);
        }

        #[test]
        fn test_completion_on_candidate_day_moves_past_it() {
            let next = RecurrenceEngine::new()
                .advance(date(2024, 1, 1), RecurrenceClass::Weekly, None, Some(date(2024, 1, 8)))
                .unwrap();
            assert_eq!(next, date(2024, 1, 15));
        }

        #[test]
        fn test_early_completion_takes_single_step() {
            let outcome = RecurrenceEngine::new()
                .advance_detailed(date(2024, 3, 10), RecurrenceClass::Monthly, None, Some(date(2024, 3, 1)))
                .unwrap();
            assert_eq!(outcome.next_due, date(2024, 4, 10));
            assert_eq!(outcome.steps, 1);
        }

        #[test]
        fn test_anchor_month_needs_no_skip() {
            let june = rule(r#"{"month":6}"#);
            let outcome = RecurrenceEngine::new()
                .advance_detailed(date(2024, 6, 10), RecurrenceClass::Yearly, Some(&june), Some(date(2024, 6, 15)))
                .unwrap();
            assert_eq!(outcome.next_due, date(2025, 6, 10));
            assert_eq!(outcome.steps, 1);
        }

        #[test]
        fn test_bound_returns_last_candidate() {
            let outcome = RecurrenceEngine::new()
                .advance_detailed(date(2024, 1, 1), RecurrenceClass::Daily, None, Some(date(2024, 12, 31)))
                .unwrap();
            assert!(outcome.bound_hit);
            assert_eq!(outcome.steps, MAX_SKIP_ITERATIONS + 1);
            assert_eq!(outcome.next_due, date(2024, 1, 26));
        }

        #[test]
        fn test_completion_instant_uses_household_zone() {
            // 23:30 UTC on Jan 14 is already Jan 15 in Zurich
            let zurich: Tz = "Europe/Zurich".parse().unwrap();
            let completed_at = Utc.with_ymd_and_hms(2024, 1, 14, 23, 30, 0).unwrap();
            let outcome = RecurrenceEngine::new()
                .advance_on_completion(date(2024, 1, 1), RecurrenceClass::Weekly, None, zurich, completed_at)
                .unwrap();
            assert_eq!(outcome.next_due, date(2024, 1, 22));

            let utc_outcome = RecurrenceEngine::new()
                .advance_on_completion(date(2024, 1, 1), RecurrenceClass::Weekly, None, chrono_tz::UTC, completed_at)
                .unwrap();
            assert_eq!(utc_outcome.next_due, date(2024, 1, 15));
        }
    }

    fn recurring_class() -> impl Strategy<Value = RecurrenceClass> {
        prop_oneof![
            Just(RecurrenceClass::Daily),
            Just(RecurrenceClass::Weekly),
            Just(RecurrenceClass::Monthly),
            Just(RecurrenceClass::Seasonal),
            Just(RecurrenceClass::HalfYear),
            Just(RecurrenceClass::Yearly),
        ]
    }

    proptest! {
        #[test]
        fn prop_advance_without_rule_moves_forward(
            class in recurring_class(),
            days in 0i64..36_500,
        ) {
            let from = date(1970, 1, 1) + chrono::Duration::days(days);
            let next = RecurrenceEngine::new().advance(from, class, None, None).unwrap();
            prop_assert!(next > from);
        }

        #[test]
        fn prop_skip_forward_passes_not_before_within_bound(
            class in recurring_class(),
            days in 0i64..36_500,
            late_by in 0i64..20,
        ) {
            let from = date(1970, 1, 1) + chrono::Duration::days(days);
            let not_before = from + chrono::Duration::days(late_by);
            let outcome = RecurrenceEngine::new()
                .advance_detailed(from, class, None, Some(not_before))
                .unwrap();
            prop_assert!(outcome.next_due > not_before);
            prop_assert!(!outcome.bound_hit);
        }
    }
}

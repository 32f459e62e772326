//! Expansion of recurring weekly templates into dated class instances.
//!
//! Expansion is a pure function over the template and the set of dates that
//! already have a class for it; persisting the result (and skipping dates that
//! appear concurrently) is the repository's job.

use std::collections::HashSet;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use uuid::Uuid;

use crate::{
    errors::{StudioError, StudioResult},
    models::{class::Class, template::RecurringTemplate},
};

/// Longest range a single expansion request may cover
pub const MAX_EXPANSION_DAYS: i64 = 366;

/// Expands `template` over `[from, to]`, clipped to the template's validity window.
///
/// Produces one class per date whose weekday is an active day of the template,
/// using the per-day override times when present. Dates in `existing` are
/// skipped. Inactive templates produce nothing.
pub fn expand_template(
    template: &RecurringTemplate,
    from: NaiveDate,
    to: NaiveDate,
    existing: &HashSet<NaiveDate>,
) -> Vec<Class> {
    if !template.is_active {
        return Vec::new();
    }

    let start = from.max(template.start_date);
    let end = template.end_date.map_or(to, |end_date| end_date.min(to));
    if start > end {
        return Vec::new();
    }

    start
        .iter_days()
        .take_while(|date| *date <= end)
        .filter(|date| template.runs_on(date.weekday().into()))
        .filter(|date| !existing.contains(date))
        .map(|date| class_from_template(template, date))
        .collect()
}

/// Materializes one class of `template` on `date`
pub fn class_from_template(template: &RecurringTemplate, date: NaiveDate) -> Class {
    let times = template.times_for(date.weekday().into());

    Class {
        id: Uuid::new_v4(),
        template_id: Some(template.id),
        name: template.name.clone(),
        description: template.description.clone(),
        instructor: template.instructor.clone(),
        class_type: template.class_type.clone(),
        class_date: date,
        start_time: times.start_time,
        end_time: times.end_time,
        max_participants: template.max_participants,
        current_participants: 0,
        price_cents: template.price_cents,
        credits_required: template.credits_required,
        waitlist_enabled: template.waitlist_enabled,
        waitlist_capacity: template.waitlist_capacity,
        cancellation_deadline_hours: template.cancellation_deadline_hours,
        is_active: true,
        created_at: Utc::now(),
    }
}

pub fn validate_range(from: NaiveDate, to: NaiveDate) -> StudioResult<()> {
    if from > to {
        return Err(StudioError::Validation(format!(
            "Range start {} is after range end {}",
            from, to
        )));
    }
    if (to - from).num_days() >= MAX_EXPANSION_DAYS {
        return Err(StudioError::Validation(format!(
            "Range may cover at most {} days",
            MAX_EXPANSION_DAYS
        )));
    }
    Ok(())
}

/// Range from `today` covering `weeks` whole weeks
pub fn horizon(today: NaiveDate, weeks: u32) -> (NaiveDate, NaiveDate) {
    let days = i64::from(weeks.max(1)) * 7 - 1;
    (today, today + Duration::days(days))
}

/// Converts a studio-local date and time to UTC.
///
/// Times skipped by a DST transition resolve to the hour after; repeated
/// times resolve to their first occurrence.
pub fn local_to_utc(date: NaiveDate, time: NaiveTime, timezone: Tz) -> DateTime<Utc> {
    let naive = date.and_time(time);
    timezone
        .from_local_datetime(&naive)
        .earliest()
        .or_else(|| {
            timezone
                .from_local_datetime(&(naive + Duration::hours(1)))
                .earliest()
        })
        .map(|local| local.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::template::{DailySchedule, DayOfWeek, DayTimes};
    use pretty_assertions::assert_eq;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn template(days: Vec<DayOfWeek>, daily_schedule: Option<DailySchedule>) -> RecurringTemplate {
        RecurringTemplate {
            id: Uuid::new_v4(),
            name: "Strength".to_string(),
            description: None,
            instructor: Some("Sam".to_string()),
            class_type: "weightlifting".to_string(),
            days_of_week: days,
            start_time: time(9, 0),
            end_time: time(10, 0),
            daily_schedule,
            start_date: date(2024, 1, 1),
            end_date: None,
            max_participants: 6,
            price_cents: 2500,
            credits_required: 1,
            waitlist_enabled: true,
            waitlist_capacity: 3,
            cancellation_deadline_hours: 12,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_expand_uses_override_for_wednesday() {
        let mut overrides = DailySchedule::new();
        overrides.insert(
            DayOfWeek::Wednesday,
            DayTimes {
                start_time: time(18, 0),
                end_time: time(19, 0),
            },
        );
        let template = template(vec![DayOfWeek::Monday, DayOfWeek::Wednesday], Some(overrides));

        // 2024-03-04 is a Monday
        let classes = expand_template(&template, date(2024, 3, 4), date(2024, 3, 10), &HashSet::new());

        assert_eq!(classes.len(), 2);
        assert_eq!(classes[0].class_date, date(2024, 3, 4));
        assert_eq!(classes[0].start_time, time(9, 0));
        assert_eq!(classes[0].end_time, time(10, 0));
        assert_eq!(classes[1].class_date, date(2024, 3, 6));
        assert_eq!(classes[1].start_time, time(18, 0));
        assert_eq!(classes[1].end_time, time(19, 0));
        assert!(classes.iter().all(|c| c.template_id == Some(template.id)));
        assert!(classes.iter().all(|c| c.current_participants == 0));
    }

    #[test]
    fn test_expand_skips_existing_dates() {
        let template = template(vec![DayOfWeek::Monday, DayOfWeek::Wednesday], None);
        let existing: HashSet<_> = [date(2024, 3, 4)].into_iter().collect();

        let classes = expand_template(&template, date(2024, 3, 4), date(2024, 3, 10), &existing);

        assert_eq!(classes.len(), 1);
        assert_eq!(classes[0].class_date, date(2024, 3, 6));
    }

    #[test]
    fn test_expand_clips_to_validity_window() {
        let mut template = template(DayOfWeek::ALL.to_vec(), None);
        template.start_date = date(2024, 3, 5);
        template.end_date = Some(date(2024, 3, 7));

        let classes = expand_template(&template, date(2024, 3, 1), date(2024, 3, 31), &HashSet::new());

        let dates: Vec<_> = classes.iter().map(|c| c.class_date).collect();
        assert_eq!(dates, vec![date(2024, 3, 5), date(2024, 3, 6), date(2024, 3, 7)]);
    }

    #[test]
    fn test_expand_inverted_range_is_empty() {
        let template = template(DayOfWeek::ALL.to_vec(), None);
        let classes = expand_template(&template, date(2024, 3, 10), date(2024, 3, 1), &HashSet::new());
        assert!(classes.is_empty());
    }

    #[test]
    fn test_expand_inactive_template_is_empty() {
        let mut template = template(DayOfWeek::ALL.to_vec(), None);
        template.is_active = false;
        let classes = expand_template(&template, date(2024, 3, 1), date(2024, 3, 7), &HashSet::new());
        assert!(classes.is_empty());
    }

    #[test]
    fn test_expand_one_class_per_matching_weekday_over_four_weeks() {
        let template = template(vec![DayOfWeek::Tuesday, DayOfWeek::Thursday, DayOfWeek::Saturday], None);
        let from = date(2024, 4, 1);
        let to = date(2024, 4, 28);

        let classes = expand_template(&template, from, to, &HashSet::new());

        assert_eq!(classes.len(), 12);
        let mut dates: Vec<_> = classes.iter().map(|c| c.class_date).collect();
        dates.dedup();
        assert_eq!(dates.len(), 12);
        assert!(classes
            .iter()
            .all(|c| template.runs_on(c.class_date.weekday().into())));
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range(date(2024, 1, 1), date(2024, 1, 1)).is_ok());
        assert!(validate_range(date(2024, 1, 2), date(2024, 1, 1)).is_err());
        assert!(validate_range(date(2024, 1, 1), date(2025, 1, 1)).is_err());
    }

    #[test]
    fn test_horizon_covers_whole_weeks() {
        let (from, to) = horizon(date(2024, 3, 4), 2);
        assert_eq!(from, date(2024, 3, 4));
        assert_eq!(to, date(2024, 3, 17));
    }

    #[test]
    fn test_local_to_utc_applies_offset() {
        let tz: Tz = "America/New_York".parse().unwrap();
        // EDT is UTC-4 in June
        let utc = local_to_utc(date(2024, 6, 3), time(9, 0), tz);
        assert_eq!(utc, Utc.with_ymd_and_hms(2024, 6, 3, 13, 0, 0).unwrap());
    }

    #[test]
    fn test_local_to_utc_handles_dst_gap() {
        let tz: Tz = "America/New_York".parse().unwrap();
        // 02:30 does not exist on 2024-03-10
        let utc = local_to_utc(date(2024, 3, 10), time(2, 30), tz);
        assert_eq!(utc, Utc.with_ymd_and_hms(2024, 3, 10, 7, 30, 0).unwrap());
    }
}

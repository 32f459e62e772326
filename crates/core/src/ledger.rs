//! Session credit ledger for purchased packages.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::{
    errors::{StudioError, StudioResult},
    models::{
        booking::BookingStatus,
        package::{CreditBalance, UserPackage},
    },
};

/// Longest package validity and longest single extension, in days
pub const MAX_PACKAGE_DAYS: i64 = 36_500;

fn add_days(date: DateTime<Utc>, days: i64) -> StudioResult<DateTime<Utc>> {
    Duration::try_days(days)
        .and_then(|delta| date.checked_add_signed(delta))
        .ok_or_else(|| StudioError::Validation(format!("{} days from {} is out of range", days, date)))
}

pub fn expiry_date(purchase_date: DateTime<Utc>, duration_days: i32) -> StudioResult<DateTime<Utc>> {
    add_days(purchase_date, i64::from(duration_days))
}

/// Checks an extension length and returns it in the width the database stores.
pub fn extension_days(days: i64) -> StudioResult<i32> {
    if days < 1 {
        return Err(StudioError::Validation(
            "Extension must be at least one day".to_string(),
        ));
    }
    if days > MAX_PACKAGE_DAYS {
        return Err(StudioError::Validation(format!(
            "Extension may be at most {} days",
            MAX_PACKAGE_DAYS
        )));
    }
    i32::try_from(days).map_err(|_| StudioError::Validation(format!("Extension of {} days is too large", days)))
}

pub fn is_usable(package: &UserPackage, credits: i32, now: DateTime<Utc>) -> bool {
    package.sessions_remaining >= credits && !package.is_expired(now)
}

/// Package to charge for a booking: the usable one expiring soonest, oldest purchase first on ties.
pub fn select_package(
    packages: &[UserPackage],
    credits: i32,
    now: DateTime<Utc>,
) -> Option<&UserPackage> {
    packages
        .iter()
        .filter(|package| is_usable(package, credits, now))
        .min_by_key(|package| (package.expiry_date, package.purchase_date))
}

pub fn consume(package: &mut UserPackage, credits: i32, now: DateTime<Utc>) -> StudioResult<()> {
    if credits < 0 {
        return Err(StudioError::Validation(
            "Cannot consume a negative number of credits".to_string(),
        ));
    }
    if package.is_expired(now) {
        return Err(StudioError::InsufficientCredits(format!(
            "Package {} expired on {}",
            package.id, package.expiry_date
        )));
    }
    if package.sessions_remaining < credits {
        return Err(StudioError::InsufficientCredits(format!(
            "Package {} has {} sessions left, {} required",
            package.id, package.sessions_remaining, credits
        )));
    }

    package.sessions_remaining -= credits;
    Ok(())
}

pub fn refund(package: &mut UserPackage, credits: i32) {
    package.sessions_remaining += credits.max(0);
}

pub fn extend(package: &mut UserPackage, days: i64) -> StudioResult<()> {
    extension_days(days)?;
    package.expiry_date = add_days(package.expiry_date, days)?;
    Ok(())
}

/// Whether cancelling a booking gives its credits back.
///
/// Waitlisted bookings always refund. Confirmed bookings refund when cancelled
/// at least `deadline_hours` before the class starts, or unconditionally when
/// the deadline is not enforced (admin removals, class deactivation).
pub fn refund_due(
    status: BookingStatus,
    class_starts_at: DateTime<Utc>,
    deadline_hours: i32,
    now: DateTime<Utc>,
    enforce_deadline: bool,
) -> bool {
    match status {
        BookingStatus::Cancelled => false,
        BookingStatus::Waitlist => true,
        BookingStatus::Confirmed => {
            !enforce_deadline
                || now <= class_starts_at - Duration::hours(i64::from(deadline_hours))
        }
    }
}

pub fn balance(user_id: Uuid, packages: Vec<UserPackage>, now: DateTime<Utc>) -> CreditBalance {
    let live: Vec<&UserPackage> = packages
        .iter()
        .filter(|package| !package.is_expired(now) && package.sessions_remaining > 0)
        .collect();

    CreditBalance {
        user_id,
        sessions_remaining: live
            .iter()
            .map(|package| i64::from(package.sessions_remaining))
            .sum(),
        next_expiry: live.iter().map(|package| package.expiry_date).min(),
        packages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn package(remaining: i32, purchased_days_ago: i64, duration_days: i32) -> UserPackage {
        let now = Utc::now();
        let purchase_date = now - Duration::days(purchased_days_ago);
        UserPackage {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            package_id: Uuid::new_v4(),
            purchase_id: None,
            sessions_remaining: remaining,
            purchase_date,
            expiry_date: expiry_date(purchase_date, duration_days).unwrap(),
            created_at: purchase_date,
        }
    }

    #[test]
    fn test_expiry_is_purchase_plus_duration() {
        let purchase = Utc::now();
        assert_eq!(expiry_date(purchase, 30).unwrap(), purchase + Duration::days(30));
    }

    #[test]
    fn test_consume_never_goes_negative() {
        let now = Utc::now();
        let mut pkg = package(2, 1, 30);

        consume(&mut pkg, 1, now).unwrap();
        consume(&mut pkg, 1, now).unwrap();
        let err = consume(&mut pkg, 1, now).unwrap_err();

        assert!(matches!(err, StudioError::InsufficientCredits(_)));
        assert_eq!(pkg.sessions_remaining, 0);
    }

    #[test]
    fn test_consume_rejects_expired_until_extended() {
        let now = Utc::now();
        let mut pkg = package(5, 40, 30);

        assert!(matches!(
            consume(&mut pkg, 1, now),
            Err(StudioError::InsufficientCredits(_))
        ));
        assert_eq!(pkg.sessions_remaining, 5);

        extend(&mut pkg, 3650).unwrap();
        consume(&mut pkg, 1, now).unwrap();
        assert_eq!(pkg.sessions_remaining, 4);
    }

    #[test]
    fn test_extend_requires_positive_days() {
        let mut pkg = package(1, 0, 30);
        let before = pkg.expiry_date;
        assert!(extend(&mut pkg, 0).is_err());
        assert_eq!(pkg.expiry_date, before);
    }

    #[test]
    fn test_extend_rejects_oversized_extension() {
        let mut pkg = package(1, 0, 30);
        let before = pkg.expiry_date;

        assert!(matches!(extend(&mut pkg, 200_000_000), Err(StudioError::Validation(_))));
        assert!(matches!(extend(&mut pkg, i64::MAX), Err(StudioError::Validation(_))));
        assert_eq!(pkg.expiry_date, before);

        extend(&mut pkg, MAX_PACKAGE_DAYS).unwrap();
        assert_eq!(pkg.expiry_date, before + Duration::days(MAX_PACKAGE_DAYS));
    }

    #[test]
    fn test_expiry_out_of_range_is_an_error() {
        assert!(matches!(
            expiry_date(Utc::now(), i32::MAX),
            Err(StudioError::Validation(_))
        ));
    }

    #[rstest]
    #[case(0, false)]
    #[case(1, true)]
    #[case(3650, true)]
    #[case(MAX_PACKAGE_DAYS + 1, false)]
    fn test_extension_days_bounds(#[case] days: i64, #[case] accepted: bool) {
        assert_eq!(extension_days(days).is_ok(), accepted);
    }

    #[test]
    fn test_select_package_prefers_soonest_expiry() {
        let now = Utc::now();
        let long = package(5, 0, 90);
        let short = package(1, 0, 10);
        let empty = package(0, 0, 5);
        let expired = package(9, 60, 30);
        let packages = vec![long.clone(), short.clone(), empty, expired];

        assert_eq!(select_package(&packages, 1, now).map(|p| p.id), Some(short.id));
        assert_eq!(select_package(&packages, 2, now).map(|p| p.id), Some(long.id));
        assert!(select_package(&packages, 6, now).is_none());
    }

    #[test]
    fn test_refund_restores_credits() {
        let mut pkg = package(0, 0, 30);
        refund(&mut pkg, 2);
        assert_eq!(pkg.sessions_remaining, 2);
        refund(&mut pkg, -4);
        assert_eq!(pkg.sessions_remaining, 2);
    }

    #[rstest]
    #[case(BookingStatus::Waitlist, 1, true, true)]
    #[case(BookingStatus::Confirmed, 48, true, true)]
    #[case(BookingStatus::Confirmed, 2, true, false)]
    #[case(BookingStatus::Confirmed, 2, false, true)]
    #[case(BookingStatus::Cancelled, 48, false, false)]
    fn test_refund_due(
        #[case] status: BookingStatus,
        #[case] hours_until_class: i64,
        #[case] enforce_deadline: bool,
        #[case] expected: bool,
    ) {
        let now = Utc::now();
        let starts = now + Duration::hours(hours_until_class);
        assert_eq!(refund_due(status, starts, 24, now, enforce_deadline), expected);
    }

    #[test]
    fn test_balance_counts_only_live_packages() {
        let now = Utc::now();
        let user_id = Uuid::new_v4();
        let a = package(3, 0, 30);
        let b = package(2, 0, 10);
        let expired = package(7, 60, 30);

        let balance = balance(user_id, vec![a, b.clone(), expired], now);

        assert_eq!(balance.sessions_remaining, 5);
        assert_eq!(balance.next_expiry, Some(b.expiry_date));
        assert_eq!(balance.packages.len(), 3);
    }
}

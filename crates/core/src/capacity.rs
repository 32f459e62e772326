//! Seat accounting for a class.
//!
//! `current_participants` counts confirmed bookings only. Waitlisted bookings
//! hold no seat; they are promoted oldest-first as seats free up.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    errors::{StudioError, StudioResult},
    models::class::Class,
};

/// Capacity state of one class at the moment a booking is attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacitySnapshot {
    pub current_participants: i32,
    pub max_participants: i32,
    pub waitlist_enabled: bool,
    pub waitlist_capacity: i32,
    pub waitlist_count: i32,
}

impl CapacitySnapshot {
    pub fn of(class: &Class, waitlist_count: i32) -> Self {
        Self {
            current_participants: class.current_participants,
            max_participants: class.max_participants,
            waitlist_enabled: class.waitlist_enabled,
            waitlist_capacity: class.waitlist_capacity,
            waitlist_count,
        }
    }

    pub fn has_open_seat(&self) -> bool {
        self.current_participants < self.max_participants
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Confirmed,
    /// 1-based position in the waitlist
    Waitlisted { position: i32 },
}

/// Decides how a new booking enters the class.
pub fn admit(snapshot: &CapacitySnapshot) -> StudioResult<Admission> {
    if snapshot.has_open_seat() {
        return Ok(Admission::Confirmed);
    }

    if snapshot.waitlist_enabled && snapshot.waitlist_count < snapshot.waitlist_capacity {
        return Ok(Admission::Waitlisted {
            position: snapshot.waitlist_count + 1,
        });
    }

    if snapshot.waitlist_enabled {
        Err(StudioError::Conflict(
            "Class and its waitlist are full".to_string(),
        ))
    } else {
        Err(StudioError::Conflict("Class is full".to_string()))
    }
}

/// Participant count after a confirmed booking leaves; never below zero.
pub fn release(current_participants: i32) -> i32 {
    current_participants.saturating_sub(1).max(0)
}

/// Number of waitlisted bookings that can be promoted right now
pub fn open_seats(current_participants: i32, max_participants: i32) -> i32 {
    (max_participants - current_participants.max(0)).max(0)
}

/// A waitlisted booking, as far as promotion order is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitlistEntry {
    pub booking_id: Uuid,
    pub created_at: DateTime<Utc>,
    /// Insertion order; breaks ties between identical timestamps
    pub sequence: i64,
}

/// The oldest waitlisted booking, if any
pub fn pick_promotion(entries: &[WaitlistEntry]) -> Option<WaitlistEntry> {
    entries
        .iter()
        .min_by_key(|entry| (entry.created_at, entry.sequence))
        .copied()
}

/// Bookings to promote, oldest first, given the seats available
pub fn promotion_order(entries: &[WaitlistEntry], seats: i32) -> Vec<WaitlistEntry> {
    let mut ordered = entries.to_vec();
    ordered.sort_by_key(|entry| (entry.created_at, entry.sequence));
    ordered.truncate(usize::try_from(seats.max(0)).unwrap_or(0));
    ordered
}

/// Difference between a class's stored counter and its confirmed bookings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantDrift {
    pub class_id: Uuid,
    pub recorded: i32,
    pub actual: i32,
    pub max_participants: i32,
    /// Waitlisted bookings moved into seats the correction freed
    #[serde(default)]
    pub promoted: i32,
}

impl ParticipantDrift {
    pub fn exceeds_capacity(&self) -> bool {
        self.actual > self.max_participants
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn snapshot(current: i32, max: i32, waitlist_enabled: bool, cap: i32, count: i32) -> CapacitySnapshot {
        CapacitySnapshot {
            current_participants: current,
            max_participants: max,
            waitlist_enabled,
            waitlist_capacity: cap,
            waitlist_count: count,
        }
    }

    #[rstest]
    #[case(snapshot(0, 5, true, 2, 0), Some(Admission::Confirmed))]
    #[case(snapshot(4, 5, false, 0, 0), Some(Admission::Confirmed))]
    #[case(snapshot(5, 5, true, 2, 0), Some(Admission::Waitlisted { position: 1 }))]
    #[case(snapshot(5, 5, true, 2, 1), Some(Admission::Waitlisted { position: 2 }))]
    #[case(snapshot(5, 5, true, 2, 2), None)]
    #[case(snapshot(5, 5, false, 2, 0), None)]
    #[case(snapshot(6, 5, true, 0, 0), None)]
    fn test_admit(#[case] snapshot: CapacitySnapshot, #[case] expected: Option<Admission>) {
        assert_eq!(admit(&snapshot).ok(), expected);
    }

    #[test]
    fn test_full_class_is_a_conflict() {
        let err = admit(&snapshot(3, 3, false, 0, 0)).unwrap_err();
        assert!(matches!(err, StudioError::Conflict(_)));
    }

    #[rstest]
    #[case(3, 2)]
    #[case(1, 0)]
    #[case(0, 0)]
    #[case(-2, 0)]
    fn test_release_never_goes_negative(#[case] current: i32, #[case] expected: i32) {
        assert_eq!(release(current), expected);
    }

    #[test]
    fn test_pick_promotion_takes_oldest_then_sequence() {
        let now = Utc::now();
        let a = WaitlistEntry { booking_id: Uuid::new_v4(), created_at: now, sequence: 7 };
        let b = WaitlistEntry { booking_id: Uuid::new_v4(), created_at: now, sequence: 3 };
        let c = WaitlistEntry {
            booking_id: Uuid::new_v4(),
            created_at: now + Duration::seconds(1),
            sequence: 1,
        };

        assert_eq!(pick_promotion(&[a, c, b]), Some(b));
        assert_eq!(pick_promotion(&[]), None);
        assert_eq!(promotion_order(&[c, a, b], 2), vec![b, a]);
        assert_eq!(promotion_order(&[c, a, b], 0), vec![]);
    }

    #[test]
    fn test_open_seats() {
        assert_eq!(open_seats(3, 5), 2);
        assert_eq!(open_seats(5, 5), 0);
        assert_eq!(open_seats(7, 5), 0);
        assert_eq!(open_seats(-1, 5), 5);
    }

    /// In-memory roster driven by the same rules the booking repository applies
    struct Roster {
        max: i32,
        waitlist_capacity: i32,
        current: i32,
        next_sequence: i64,
        bookings: Vec<(Uuid, WaitlistEntry, bool)>, // (id, entry, confirmed)
    }

    impl Roster {
        fn new(max: i32, waitlist_capacity: i32) -> Self {
            Self { max, waitlist_capacity, current: 0, next_sequence: 0, bookings: Vec::new() }
        }

        fn waitlist(&self) -> Vec<WaitlistEntry> {
            self.bookings.iter().filter(|(_, _, c)| !c).map(|(_, e, _)| *e).collect()
        }

        fn book(&mut self, at: DateTime<Utc>) -> Option<Uuid> {
            let waitlist_count = self.waitlist().len() as i32;
            let decision = admit(&snapshot(self.current, self.max, true, self.waitlist_capacity, waitlist_count)).ok()?;
            let id = Uuid::new_v4();
            self.next_sequence += 1;
            let entry = WaitlistEntry { booking_id: id, created_at: at, sequence: self.next_sequence };
            let confirmed = decision == Admission::Confirmed;
            if confirmed {
                self.current += 1;
            }
            self.bookings.push((id, entry, confirmed));
            Some(id)
        }

        fn cancel(&mut self, id: Uuid) -> Option<Uuid> {
            let index = self.bookings.iter().position(|(b, _, _)| *b == id)?;
            let (_, _, confirmed) = self.bookings.remove(index);
            if !confirmed {
                return None;
            }
            self.current = release(self.current);
            if self.current >= self.max {
                return None;
            }
            let promoted = pick_promotion(&self.waitlist())?;
            for booking in &mut self.bookings {
                if booking.0 == promoted.booking_id {
                    booking.2 = true;
                }
            }
            self.current += 1;
            Some(promoted.booking_id)
        }

        fn confirmed_count(&self) -> i32 {
            self.bookings.iter().filter(|(_, _, c)| *c).count() as i32
        }
    }

    #[test]
    fn test_counter_stays_within_bounds_over_mixed_operations() {
        let mut roster = Roster::new(4, 3);
        let start = Utc::now();
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;

        for step in 0..500 {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;

            if seed % 3 == 0 && !roster.bookings.is_empty() {
                let index = (seed as usize / 3) % roster.bookings.len();
                let id = roster.bookings[index].0;
                roster.cancel(id);
            } else {
                roster.book(start + Duration::seconds(step));
            }

            assert!(roster.current >= 0);
            assert!(roster.current <= roster.max);
            assert_eq!(roster.current, roster.confirmed_count());
            assert!(roster.waitlist().len() as i32 <= roster.waitlist_capacity);
            // Nobody waits while a seat is free
            assert!(roster.waitlist().is_empty() || roster.current == roster.max);
        }
    }

    #[test]
    fn test_cancelling_on_full_class_promotes_exactly_the_oldest() {
        let mut roster = Roster::new(2, 3);
        let start = Utc::now();
        let first = roster.book(start).unwrap();
        roster.book(start + Duration::seconds(1)).unwrap();
        let oldest_waiting = roster.book(start + Duration::seconds(2)).unwrap();
        let newer_waiting = roster.book(start + Duration::seconds(3)).unwrap();
        assert_eq!(roster.waitlist().len(), 2);

        let promoted = roster.cancel(first);

        assert_eq!(promoted, Some(oldest_waiting));
        assert_eq!(roster.current, 2);
        let waiting: Vec<_> = roster.waitlist().iter().map(|e| e.booking_id).collect();
        assert_eq!(waiting, vec![newer_waiting]);
    }

    #[test]
    fn test_drift_exceeds_capacity() {
        let drift = ParticipantDrift { class_id: Uuid::new_v4(), recorded: -1, actual: 6, max_participants: 5, promoted: 0 };
        assert!(drift.exceeds_capacity());
    }
}

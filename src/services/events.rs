use uuid::Uuid;

use crate::database::Database;
use crate::models::{EventRegistration, EventStatus, RegistrationStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    // Место есть, регистрация подтверждена
    Confirmed,
    // Мест нет, но waitlist разрешён
    Waitlisted,
    Rejected,
}

// Чистое решение по регистрации; сами записи делает register_for_event
pub fn decide_registration(
    status: EventStatus,
    already_registered: bool,
    current_attendees: i32,
    max_attendees: i32,
    allow_waitlist: bool,
) -> RegistrationOutcome {
    if status != EventStatus::Published || already_registered {
        return RegistrationOutcome::Rejected;
    }
    if current_attendees < max_attendees {
        RegistrationOutcome::Confirmed
    } else if allow_waitlist {
        RegistrationOutcome::Waitlisted
    } else {
        RegistrationOutcome::Rejected
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnregisterEffect {
    // Голова waitlist-а занимает место, счётчик не меняется
    PromoteWaitlistHead,
    DecrementAttendees,
    // Ушёл waitlisted - подтверждённые места не затронуты
    KeepAttendees,
}

// Чистое решение после удаления регистрации; сами записи делает
// unregister_from_event
pub fn decide_unregister(
    removed_was_waitlisted: bool,
    has_waitlist_head: bool,
) -> UnregisterEffect {
    if removed_was_waitlisted {
        UnregisterEffect::KeepAttendees
    } else if has_waitlist_head {
        UnregisterEffect::PromoteWaitlistHead
    } else {
        UnregisterEffect::DecrementAttendees
    }
}

pub async fn register_for_event(
    db: &Database,
    event_id: i64,
    user_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let mut tx = db.pool.begin().await?;

    // Блокируем строку события на время проверки и инкремента
    let event: Option<(EventStatus, i32, i32, bool)> = sqlx::query_as(
        "SELECT status, current_attendees, max_attendees, allow_waitlist
         FROM events WHERE id = $1
         FOR UPDATE",
    )
    .bind(event_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some((status, current, max, allow_waitlist)) = event else {
        return Ok(false);
    };

    let already_registered: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM event_registrations WHERE event_id = $1 AND user_id = $2)",
    )
    .bind(event_id)
    .bind(user_id)
    .fetch_one(&mut *tx)
    .await?;

    match decide_registration(status, already_registered, current, max, allow_waitlist) {
        RegistrationOutcome::Rejected => Ok(false),
        RegistrationOutcome::Confirmed => {
            sqlx::query(
                "INSERT INTO event_registrations (event_id, user_id, status)
                 VALUES ($1, $2, $3)",
            )
            .bind(event_id)
            .bind(user_id)
            .bind(RegistrationStatus::Registered)
            .execute(&mut *tx)
            .await?;

            sqlx::query("UPDATE events SET current_attendees = current_attendees + 1 WHERE id = $1")
                .bind(event_id)
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;
            Ok(true)
        }
        RegistrationOutcome::Waitlisted => {
            // max+1 вместо count+1: после промо головы count давал бы дубликат позиции
            let position: i32 = sqlx::query_scalar(
                "SELECT COALESCE(MAX(waitlist_position), 0) + 1
                 FROM event_registrations
                 WHERE event_id = $1 AND is_waitlisted",
            )
            .bind(event_id)
            .fetch_one(&mut *tx)
            .await?;

            sqlx::query(
                "INSERT INTO event_registrations
                     (event_id, user_id, status, is_waitlisted, waitlist_position)
                 VALUES ($1, $2, $3, TRUE, $4)",
            )
            .bind(event_id)
            .bind(user_id)
            .bind(RegistrationStatus::Registered)
            .bind(position)
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok(true)
        }
    }
}

pub async fn unregister_from_event(
    db: &Database,
    event_id: i64,
    user_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let mut tx = db.pool.begin().await?;

    // Тот же порядок блокировки, что и при регистрации
    let event: Option<i64> = sqlx::query_scalar("SELECT id FROM events WHERE id = $1 FOR UPDATE")
        .bind(event_id)
        .fetch_optional(&mut *tx)
        .await?;
    if event.is_none() {
        return Ok(false);
    }

    let registration: Option<EventRegistration> = sqlx::query_as(
        "SELECT * FROM event_registrations WHERE event_id = $1 AND user_id = $2",
    )
    .bind(event_id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(registration) = registration else {
        return Ok(false);
    };

    sqlx::query("DELETE FROM event_registrations WHERE id = $1")
        .bind(registration.id)
        .execute(&mut *tx)
        .await?;

    // Голова waitlist-а - запись с минимальной позицией.
    // Остальные позиции не перенумеровываются.
    let head: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM event_registrations
         WHERE event_id = $1 AND is_waitlisted
         ORDER BY waitlist_position
         LIMIT 1",
    )
    .bind(event_id)
    .fetch_optional(&mut *tx)
    .await?;

    match decide_unregister(registration.is_waitlisted, head.is_some()) {
        UnregisterEffect::PromoteWaitlistHead => {
            sqlx::query(
                "UPDATE event_registrations
                 SET is_waitlisted = FALSE, waitlist_position = NULL
                 WHERE id = $1",
            )
            .bind(head)
            .execute(&mut *tx)
            .await?;
        }
        UnregisterEffect::DecrementAttendees => {
            sqlx::query("UPDATE events SET current_attendees = current_attendees - 1 WHERE id = $1")
                .bind(event_id)
                .execute(&mut *tx)
                .await?;
        }
        UnregisterEffect::KeepAttendees => {}
    }

    tx.commit().await?;
    Ok(true)
}

// Check-in доступен только подтверждённым (не waitlisted) регистрациям
pub async fn check_in(db: &Database, event_id: i64, user_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE event_registrations
         SET status = $3, check_in_time = NOW()
         WHERE event_id = $1 AND user_id = $2 AND NOT is_waitlisted",
    )
    .bind(event_id)
    .bind(user_id)
    .bind(RegistrationStatus::CheckedIn)
    .execute(&db.pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpublished_event_rejects_registration() {
        for status in [
            EventStatus::Draft,
            EventStatus::InProgress,
            EventStatus::Completed,
            EventStatus::Cancelled,
        ] {
            assert_eq!(
                decide_registration(status, false, 0, 100, true),
                RegistrationOutcome::Rejected
            );
        }
    }

    #[test]
    fn duplicate_registration_rejected() {
        assert_eq!(
            decide_registration(EventStatus::Published, true, 0, 100, true),
            RegistrationOutcome::Rejected
        );
    }

    #[test]
    fn registration_confirmed_below_capacity() {
        assert_eq!(
            decide_registration(EventStatus::Published, false, 99, 100, false),
            RegistrationOutcome::Confirmed
        );
    }

    #[test]
    fn full_event_waitlists_when_allowed() {
        assert_eq!(
            decide_registration(EventStatus::Published, false, 100, 100, true),
            RegistrationOutcome::Waitlisted
        );
    }

    #[test]
    fn full_event_rejects_without_waitlist() {
        assert_eq!(
            decide_registration(EventStatus::Published, false, 100, 100, false),
            RegistrationOutcome::Rejected
        );
    }

    #[test]
    fn overfull_event_never_confirms() {
        // current > max не должно случаться, но решение обязано оставаться Waitlisted/Rejected
        assert_eq!(
            decide_registration(EventStatus::Published, false, 101, 100, true),
            RegistrationOutcome::Waitlisted
        );
        assert_eq!(
            decide_registration(EventStatus::Published, false, 101, 100, false),
            RegistrationOutcome::Rejected
        );
    }

    #[test]
    fn confirmed_removal_promotes_waitlist_head() {
        // Место занимает голова waitlist-а, счётчик не трогаем
        assert_eq!(
            decide_unregister(false, true),
            UnregisterEffect::PromoteWaitlistHead
        );
    }

    #[test]
    fn confirmed_removal_without_waitlist_decrements() {
        assert_eq!(
            decide_unregister(false, false),
            UnregisterEffect::DecrementAttendees
        );
    }

    #[test]
    fn waitlisted_removal_leaves_attendee_count_alone() {
        // Независимо от того, есть ли ещё кто-то в waitlist-е
        assert_eq!(decide_unregister(true, true), UnregisterEffect::KeepAttendees);
        assert_eq!(decide_unregister(true, false), UnregisterEffect::KeepAttendees);
    }

    #[test]
    fn zero_capacity_event_goes_straight_to_waitlist() {
        assert_eq!(
            decide_registration(EventStatus::Published, false, 0, 0, true),
            RegistrationOutcome::Waitlisted
        );
    }
}

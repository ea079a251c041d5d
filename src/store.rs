use axum::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use tokio::sync::Mutex;

/// A registered account. Never serialized directly; clients only ever see
/// the public projection built in `auth::dto`.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ShiftStatus {
    Active,
    Completed,
}

/// A single work shift. `end_time` and `report` stay unset until the shift
/// is finished; a shift never leaves `completed` once it gets there.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shift {
    pub id: i64,
    pub user_id: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub end_time: Option<OffsetDateTime>,
    pub report: Option<String>,
    pub status: ShiftStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error("user already has an active shift")]
    ActiveShiftExists,
    #[error("no active shift")]
    NoActiveShift,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Storage seam for users and shifts. The uniqueness rules (one account per
/// email, one active shift per user) are enforced inside the store as
/// conditional inserts, so callers never race a check against an insert.
#[async_trait]
pub trait Store: Send + Sync {
    async fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        name: &str,
        now: OffsetDateTime,
    ) -> Result<User, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn start_shift(&self, user_id: i64, now: OffsetDateTime) -> Result<Shift, StoreError>;

    async fn finish_shift(
        &self,
        user_id: i64,
        report: String,
        now: OffsetDateTime,
    ) -> Result<Shift, StoreError>;

    /// All shifts owned by the user, most recent `start_time` first.
    /// Equal start times order by id descending.
    async fn list_shifts(&self, user_id: i64) -> Result<Vec<Shift>, StoreError>;
}

struct Tables {
    users: Vec<User>,
    shifts: Vec<Shift>,
    next_user_id: i64,
    next_shift_id: i64,
}

/// Transient store backing the service. One lock covers both tables and
/// both id counters; every trait method holds it for the whole
/// check-and-mutate sequence.
pub struct MemoryStore {
    inner: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Tables {
                users: Vec::new(),
                shifts: Vec::new(),
                next_user_id: 1,
                next_shift_id: 1,
            }),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        name: &str,
        now: OffsetDateTime,
    ) -> Result<User, StoreError> {
        let mut tables = self.inner.lock().await;
        if tables.users.iter().any(|u| u.email == email) {
            return Err(StoreError::DuplicateEmail);
        }
        let user = User {
            id: tables.next_user_id,
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            name: name.to_string(),
            created_at: now,
        };
        tables.next_user_id += 1;
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let tables = self.inner.lock().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn start_shift(&self, user_id: i64, now: OffsetDateTime) -> Result<Shift, StoreError> {
        let mut tables = self.inner.lock().await;
        let has_active = tables
            .shifts
            .iter()
            .any(|s| s.user_id == user_id && s.status == ShiftStatus::Active);
        if has_active {
            return Err(StoreError::ActiveShiftExists);
        }
        let shift = Shift {
            id: tables.next_shift_id,
            user_id,
            start_time: now,
            end_time: None,
            report: None,
            status: ShiftStatus::Active,
            created_at: now,
        };
        tables.next_shift_id += 1;
        tables.shifts.push(shift.clone());
        Ok(shift)
    }

    async fn finish_shift(
        &self,
        user_id: i64,
        report: String,
        now: OffsetDateTime,
    ) -> Result<Shift, StoreError> {
        let mut tables = self.inner.lock().await;
        let shift = tables
            .shifts
            .iter_mut()
            .find(|s| s.user_id == user_id && s.status == ShiftStatus::Active)
            .ok_or(StoreError::NoActiveShift)?;
        shift.end_time = Some(now);
        shift.report = Some(report);
        shift.status = ShiftStatus::Completed;
        Ok(shift.clone())
    }

    async fn list_shifts(&self, user_id: i64) -> Result<Vec<Shift>, StoreError> {
        let tables = self.inner.lock().await;
        let mut shifts: Vec<Shift> = tables
            .shifts
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        shifts.sort_by(|a, b| b.start_time.cmp(&a.start_time).then(b.id.cmp(&a.id)));
        Ok(shifts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use time::macros::datetime;

    fn now() -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }

    #[tokio::test]
    async fn create_user_assigns_monotonic_ids() {
        let store = MemoryStore::new();
        let t = datetime!(2026-03-01 08:00 UTC);
        let a = store.create_user("a@x.com", "h1", "Ann", t).await.unwrap();
        let b = store.create_user("b@x.com", "h2", "Bob", t).await.unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(a.created_at, t);
    }

    #[tokio::test]
    async fn create_user_rejects_duplicate_email() {
        let store = MemoryStore::new();
        store.create_user("a@x.com", "h1", "Ann", now()).await.unwrap();
        let err = store
            .create_user("a@x.com", "h2", "Other", now())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));
    }

    #[tokio::test]
    async fn duplicate_check_is_case_sensitive() {
        let store = MemoryStore::new();
        store.create_user("a@x.com", "h1", "Ann", now()).await.unwrap();
        // A different capitalization is a different login key as stored.
        store.create_user("A@x.com", "h2", "Ann", now()).await.unwrap();
        assert!(store.find_user_by_email("a@x.com").await.unwrap().is_some());
        assert!(store.find_user_by_email("A@X.COM").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn start_shift_rejects_second_active() {
        let store = MemoryStore::new();
        let user = store.create_user("a@x.com", "h", "Ann", now()).await.unwrap();
        let shift = store.start_shift(user.id, now()).await.unwrap();
        assert_eq!(shift.status, ShiftStatus::Active);
        assert!(shift.end_time.is_none());
        assert!(shift.report.is_none());

        let err = store.start_shift(user.id, now()).await.unwrap_err();
        assert!(matches!(err, StoreError::ActiveShiftExists));
    }

    #[tokio::test]
    async fn finish_shift_completes_in_place_and_only_once() {
        let store = MemoryStore::new();
        let user = store.create_user("a@x.com", "h", "Ann", now()).await.unwrap();

        let err = store.finish_shift(user.id, String::new(), now()).await.unwrap_err();
        assert!(matches!(err, StoreError::NoActiveShift));

        let started = store.start_shift(user.id, now()).await.unwrap();
        let finished = store
            .finish_shift(user.id, "done".into(), now())
            .await
            .unwrap();
        assert_eq!(finished.id, started.id);
        assert_eq!(finished.status, ShiftStatus::Completed);
        assert_eq!(finished.report.as_deref(), Some("done"));
        assert!(finished.end_time.is_some());

        let err = store.finish_shift(user.id, String::new(), now()).await.unwrap_err();
        assert!(matches!(err, StoreError::NoActiveShift));
    }

    #[tokio::test]
    async fn completed_shift_does_not_block_a_new_one() {
        let store = MemoryStore::new();
        let user = store.create_user("a@x.com", "h", "Ann", now()).await.unwrap();
        store.start_shift(user.id, now()).await.unwrap();
        store.finish_shift(user.id, String::new(), now()).await.unwrap();
        let second = store.start_shift(user.id, now()).await.unwrap();
        assert_eq!(second.status, ShiftStatus::Active);
    }

    #[tokio::test]
    async fn list_shifts_orders_most_recent_first() {
        let store = MemoryStore::new();
        let user = store.create_user("a@x.com", "h", "Ann", now()).await.unwrap();

        let t1 = datetime!(2026-03-01 08:00 UTC);
        let t2 = datetime!(2026-03-02 08:00 UTC);
        let a = store.start_shift(user.id, t1).await.unwrap();
        store.finish_shift(user.id, String::new(), t1 + time::Duration::hours(8)).await.unwrap();
        let b = store.start_shift(user.id, t2).await.unwrap();

        let listed = store.list_shifts(user.id).await.unwrap();
        let ids: Vec<i64> = listed.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![b.id, a.id]);
    }

    #[tokio::test]
    async fn list_shifts_breaks_start_time_ties_by_id() {
        let store = MemoryStore::new();
        let user = store.create_user("a@x.com", "h", "Ann", now()).await.unwrap();

        let t = datetime!(2026-03-01 08:00 UTC);
        let first = store.start_shift(user.id, t).await.unwrap();
        store.finish_shift(user.id, String::new(), t).await.unwrap();
        let second = store.start_shift(user.id, t).await.unwrap();

        let listed = store.list_shifts(user.id).await.unwrap();
        let ids: Vec<i64> = listed.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn list_shifts_is_scoped_to_the_owner() {
        let store = MemoryStore::new();
        let ann = store.create_user("a@x.com", "h", "Ann", now()).await.unwrap();
        let bob = store.create_user("b@x.com", "h", "Bob", now()).await.unwrap();
        store.start_shift(ann.id, now()).await.unwrap();

        assert_eq!(store.list_shifts(ann.id).await.unwrap().len(), 1);
        assert!(store.list_shifts(bob.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_starts_yield_exactly_one_active_shift() {
        let store = Arc::new(MemoryStore::new());
        let user = store.create_user("a@x.com", "h", "Ann", now()).await.unwrap();
        let user_id = user.id;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.start_shift(user_id, OffsetDateTime::now_utc()).await
            }));
        }

        let mut started = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.expect("task should not panic") {
                Ok(_) => started += 1,
                Err(StoreError::ActiveShiftExists) => conflicts += 1,
                Err(other) => panic!("unexpected store error: {other}"),
            }
        }
        assert_eq!(started, 1);
        assert_eq!(conflicts, 7);
        assert_eq!(store.list_shifts(user_id).await.unwrap().len(), 1);
    }
}

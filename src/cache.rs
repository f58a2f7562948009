//! Session-lifetime memo of successful generations, plus single-flight slots
//! so concurrent requests for the same key reach the generator once.
//!
//! The first caller for a missing key leads; later callers wait on a watch
//! channel and get the leader's outcome, failures included. The slot is removed
//! as soon as the leader finishes, so a later request starts a fresh attempt.
//!
//! No expiry and no eviction: entries live as long as the owning service.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{Mutex as StdMutex, MutexGuard};

use tokio::sync::{watch, RwLock};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LessonMode {
  Standard,
  Calibration,
}

impl LessonMode {
  pub fn from_flag(is_calibration: bool) -> Self {
    if is_calibration { LessonMode::Calibration } else { LessonMode::Standard }
  }

  fn tag(&self) -> &'static str {
    match self {
      LessonMode::Standard => "std",
      LessonMode::Calibration => "calib",
    }
  }
}

/// Composite cache key. Fields are kept apart so ids containing the display
/// separator can never collide.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CacheKey {
  Lesson { student_id: String, topic_id: String, mode: LessonMode },
  Plan { student_id: String },
}

impl CacheKey {
  pub fn lesson(student_id: &str, topic_id: &str, mode: LessonMode) -> Self {
    CacheKey::Lesson { student_id: student_id.to_string(), topic_id: topic_id.to_string(), mode }
  }

  pub fn plan(student_id: &str) -> Self {
    CacheKey::Plan { student_id: student_id.to_string() }
  }
}

impl fmt::Display for CacheKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      CacheKey::Lesson { student_id, topic_id, mode } => write!(f, "{}-{}-{}", student_id, topic_id, mode.tag()),
      CacheKey::Plan { student_id } => write!(f, "plan-{}", student_id),
    }
  }
}

/// Result of `ResultCache::claim`.
pub enum Claim<'a, K, V>
where
  K: Eq + Hash + Clone,
  V: Clone,
{
  Hit(V),
  /// First caller for the key: generate, then `complete`.
  Leader(Flight<'a, K, V>),
  /// Another caller is generating; `wait` for its result.
  Waiter(Waiter<V>),
}

/// `None` while the leader is still working, then `Some(result)`.
type Slot<V> = Option<Option<V>>;

/// Leadership of one in-flight key. Dropping it (completed or not) frees the key.
pub struct Flight<'a, K, V>
where
  K: Eq + Hash + Clone,
  V: Clone,
{
  cache: &'a ResultCache<K, V>,
  key: K,
  tx: watch::Sender<Slot<V>>,
}

impl<'a, K, V> Flight<'a, K, V>
where
  K: Eq + Hash + Clone,
  V: Clone,
{
  /// Store a success, then hand the result (or the failure) to every waiter.
  pub async fn complete(self, result: Option<V>) {
    if let Some(value) = &result {
      self.cache.put(self.key.clone(), value.clone()).await;
    }
    self.tx.send_replace(Some(result));
  }
}

impl<'a, K, V> Drop for Flight<'a, K, V>
where
  K: Eq + Hash + Clone,
  V: Clone,
{
  fn drop(&mut self) {
    self.cache.in_flight_map().remove(&self.key);
  }
}

pub struct Waiter<V> {
  rx: watch::Receiver<Slot<V>>,
}

impl<V: Clone> Waiter<V> {
  /// The leader's value, or None when it failed or was cancelled.
  pub async fn wait(mut self) -> Option<V> {
    loop {
      let current = (*self.rx.borrow_and_update()).clone();
      if let Some(result) = current {
        return result;
      }
      if self.rx.changed().await.is_err() {
        return (*self.rx.borrow()).clone().flatten();
      }
    }
  }
}

pub struct ResultCache<K, V> {
  entries: RwLock<HashMap<K, V>>,
  /// Never held across an await.
  in_flight: StdMutex<HashMap<K, watch::Receiver<Slot<V>>>>,
}

impl<K, V> ResultCache<K, V>
where
  K: Eq + Hash + Clone,
  V: Clone,
{
  pub fn new() -> Self {
    Self { entries: RwLock::new(HashMap::new()), in_flight: StdMutex::new(HashMap::new()) }
  }

  pub async fn get(&self, key: &K) -> Option<V> {
    self.entries.read().await.get(key).cloned()
  }

  /// Last write wins.
  pub async fn put(&self, key: K, value: V) {
    self.entries.write().await.insert(key, value);
  }

  #[cfg(test)]
  pub async fn len(&self) -> usize {
    self.entries.read().await.len()
  }

  #[cfg(test)]
  pub fn in_flight_len(&self) -> usize {
    self.in_flight_map().len()
  }

  fn in_flight_map(&self) -> MutexGuard<'_, HashMap<K, watch::Receiver<Slot<V>>>> {
    self.in_flight.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  /// Cached value, or leadership of the key, or a handle on the current leader.
  /// Only one leader exists per key at a time; waiters hold no lock while waiting.
  pub async fn claim(&self, key: &K) -> Claim<'_, K, V> {
    if let Some(hit) = self.get(key).await {
      return Claim::Hit(hit);
    }

    let flight = {
      let mut map = self.in_flight_map();
      if let Some(rx) = map.get(key) {
        return Claim::Waiter(Waiter { rx: rx.clone() });
      }
      let (tx, rx) = watch::channel(None);
      map.insert(key.clone(), rx);
      Flight { cache: self, key: key.clone(), tx }
    };

    // A leader may have stored its value and left between our miss and our insert.
    if let Some(hit) = self.get(key).await {
      flight.complete(Some(hit.clone())).await;
      return Claim::Hit(hit);
    }
    Claim::Leader(flight)
  }
}

impl<K, V> Default for ResultCache<K, V>
where
  K: Eq + Hash + Clone,
  V: Clone,
{
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn display_matches_legacy_key_format() {
    assert_eq!(CacheKey::lesson("user-1", "alg-1", LessonMode::Calibration).to_string(), "user-1-alg-1-calib");
    assert_eq!(CacheKey::lesson("user-1", "alg-1", LessonMode::Standard).to_string(), "user-1-alg-1-std");
    assert_eq!(CacheKey::plan("user-1").to_string(), "plan-user-1");
  }

  #[test]
  fn keys_with_dashes_do_not_collide() {
    let a = CacheKey::lesson("a-b", "c", LessonMode::Standard);
    let b = CacheKey::lesson("a", "b-c", LessonMode::Standard);
    assert_eq!(a.to_string(), b.to_string());
    assert_ne!(a, b);
  }

  #[tokio::test]
  async fn get_put_and_distinct_keys() {
    let cache: ResultCache<CacheKey, String> = ResultCache::new();
    let std_key = CacheKey::lesson("s", "t", LessonMode::Standard);
    let cal_key = CacheKey::lesson("s", "t", LessonMode::Calibration);
    assert_eq!(cache.get(&std_key).await, None);

    cache.put(std_key.clone(), "standard".into()).await;
    assert_eq!(cache.get(&std_key).await.as_deref(), Some("standard"));
    assert_eq!(cache.get(&cal_key).await, None);

    cache.put(std_key.clone(), "newer".into()).await;
    assert_eq!(cache.get(&std_key).await.as_deref(), Some("newer"));
    assert_eq!(cache.len().await, 1);
  }

  #[tokio::test]
  async fn waiters_share_the_leader_value() {
    let cache: ResultCache<CacheKey, u32> = ResultCache::new();
    let k = CacheKey::plan("s");

    let Claim::Leader(flight) = cache.claim(&k).await else { panic!("expected leader") };
    let Claim::Waiter(waiter) = cache.claim(&k).await else { panic!("expected waiter") };
    assert!(matches!(cache.claim(&CacheKey::plan("t")).await, Claim::Leader(_)));

    let (value, ()) = tokio::join!(waiter.wait(), flight.complete(Some(7)));
    assert_eq!(value, Some(7));
    assert_eq!(cache.in_flight_len(), 0);
    assert!(matches!(cache.claim(&k).await, Claim::Hit(7)));
  }

  #[tokio::test]
  async fn failed_leader_releases_waiters_and_the_key() {
    let cache: ResultCache<CacheKey, u32> = ResultCache::new();
    let k = CacheKey::plan("s");

    let Claim::Leader(flight) = cache.claim(&k).await else { panic!("expected leader") };
    let Claim::Waiter(waiter) = cache.claim(&k).await else { panic!("expected waiter") };
    flight.complete(None).await;
    assert_eq!(waiter.wait().await, None);
    assert_eq!(cache.in_flight_len(), 0);
    assert!(matches!(cache.claim(&k).await, Claim::Leader(_)));
  }

  #[tokio::test]
  async fn dropped_leader_does_not_strand_waiters() {
    let cache: ResultCache<CacheKey, u32> = ResultCache::new();
    let k = CacheKey::plan("s");

    let Claim::Leader(flight) = cache.claim(&k).await else { panic!("expected leader") };
    let Claim::Waiter(waiter) = cache.claim(&k).await else { panic!("expected waiter") };
    drop(flight);
    assert_eq!(waiter.wait().await, None);
    assert_eq!(cache.in_flight_len(), 0);
  }
}

//! Time-keyed storage for keyframed animation values.
//!
//! Entries keep the index they were given when first added, so "before" in
//! [`TrackStore::get_before`] means earlier in index order. Queries by time
//! go through the ordered time index instead ([`TrackStore::floor`],
//! [`TrackStore::ceil`], [`TrackStore::sample`]).

use std::{cmp::Ordering, collections::BTreeMap};

use glam::{Quat, Vec3};

#[derive(Debug, Clone, Copy)]
struct KeyTime(f64);

impl PartialEq for KeyTime {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for KeyTime {}

impl PartialOrd for KeyTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for KeyTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeKey<T> {
    time: f64,
    index: usize,
    value: T,
}

impl<T> TimeKey<T> {
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn value(&self) -> &T {
        &self.value
    }
}

#[derive(Debug, Clone)]
pub struct TrackStore<T> {
    keys: BTreeMap<KeyTime, usize>,
    values: Vec<TimeKey<T>>,
}

impl<T> Default for TrackStore<T> {
    fn default() -> Self {
        Self {
            keys: BTreeMap::new(),
            values: Vec::new(),
        }
    }
}

impl<T> TrackStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a keyframe and returns its index. A time that is already present
    /// keeps its index and has its value replaced.
    pub fn add(&mut self, time: f64, value: T) -> usize {
        if let Some(&index) = self.keys.get(&KeyTime(time)) {
            self.values[index].value = value;
            return index;
        }
        let index = self.values.len();
        self.keys.insert(KeyTime(time), index);
        self.values.push(TimeKey { time, index, value });
        index
    }

    pub fn get(&self, index: usize) -> Option<&TimeKey<T>> {
        self.values.get(index)
    }

    /// Exact match on time.
    pub fn get_at_time(&self, time: f64) -> Option<&TimeKey<T>> {
        self.values.iter().find(|key| key.time == time)
    }

    pub fn index_of(&self, key: &TimeKey<T>) -> usize {
        key.index
    }

    /// The entry one index before `key`, or the first entry when `key` is first.
    pub fn get_before(&self, key: &TimeKey<T>) -> Option<&TimeKey<T>> {
        self.get(self.index_of(key).saturating_sub(1))
    }

    /// Number of distinct times.
    pub fn size(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[TimeKey<T>] {
        &self.values
    }

    /// Entries in index order.
    pub fn iter(&self) -> std::slice::Iter<'_, TimeKey<T>> {
        self.values.iter()
    }

    /// Entries in time order.
    pub fn iter_by_time(&self) -> impl Iterator<Item = &TimeKey<T>> + '_ {
        self.keys.values().map(move |&index| &self.values[index])
    }

    /// Earliest entry in time.
    pub fn first(&self) -> Option<&TimeKey<T>> {
        self.keys
            .first_key_value()
            .map(|(_, &index)| &self.values[index])
    }

    /// Latest entry in time.
    pub fn last(&self) -> Option<&TimeKey<T>> {
        self.keys
            .last_key_value()
            .map(|(_, &index)| &self.values[index])
    }

    /// Latest entry at or before `time`.
    pub fn floor(&self, time: f64) -> Option<&TimeKey<T>> {
        self.keys
            .range(..=KeyTime(time))
            .next_back()
            .map(|(_, &index)| &self.values[index])
    }

    /// Earliest entry at or after `time`.
    pub fn ceil(&self, time: f64) -> Option<&TimeKey<T>> {
        self.keys
            .range(KeyTime(time)..)
            .next()
            .map(|(_, &index)| &self.values[index])
    }
}

impl<T: Interpolate + Clone> TrackStore<T> {
    /// Interpolated value at `time`, clamped to the first and last keys.
    pub fn sample(&self, time: f64) -> Option<T> {
        let (k0, k1) = match (self.floor(time), self.ceil(time)) {
            (Some(k0), Some(k1)) => (k0, k1),
            (Some(k), None) | (None, Some(k)) => return Some(k.value.clone()),
            (None, None) => return None,
        };
        let (t0, t1) = (k0.time, k1.time);
        let alpha = if k0.index == k1.index || (t1 - t0).abs() < f64::EPSILON {
            0.0
        } else {
            ((time - t0) / (t1 - t0)) as f32
        };
        Some(k0.value.interpolate(&k1.value, alpha))
    }
}

impl<'a, T> IntoIterator for &'a TrackStore<T> {
    type Item = &'a TimeKey<T>;
    type IntoIter = std::slice::Iter<'a, TimeKey<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub trait Interpolate {
    fn interpolate(&self, other: &Self, alpha: f32) -> Self;
}

impl Interpolate for f32 {
    fn interpolate(&self, other: &Self, alpha: f32) -> Self {
        self + (other - self) * alpha
    }
}

impl Interpolate for Vec3 {
    fn interpolate(&self, other: &Self, alpha: f32) -> Self {
        self.lerp(*other, alpha)
    }
}

impl Interpolate for Quat {
    fn interpolate(&self, other: &Self, alpha: f32) -> Self {
        self.slerp(*other, alpha)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(times: &[f64]) -> TrackStore<f32> {
        let mut track = TrackStore::new();
        for (i, &time) in times.iter().enumerate() {
            track.add(time, i as f32);
        }
        track
    }

    #[test]
    fn test_size_counts_distinct_adds() {
        let track = track(&[0.0, 0.25, 0.5, 1.0]);
        assert_eq!(track.size(), 4);
        assert_eq!(track.get(track.size() - 1).unwrap().time(), 1.0);
        assert!(track.get(track.size()).is_none());
    }

    #[test]
    fn test_get_before_uses_index_order() {
        let track = track(&[2.0, 0.5, 1.0]);
        let at_one = track.get_at_time(1.0).unwrap();
        let before = track.get_before(at_one).unwrap();
        assert_eq!(before.time(), 0.5);
        assert_eq!(before.index(), 1);
    }

    #[test]
    fn test_get_before_clamps_to_first() {
        let track = track(&[2.0, 0.5]);
        let first = track.get(0).unwrap();
        assert_eq!(track.get_before(first).unwrap().index(), 0);
    }

    #[test]
    fn test_duplicate_time_replaces_value() {
        let mut track = track(&[0.0, 1.0]);
        assert_eq!(track.add(0.0, 42.0), 0);
        assert_eq!(track.size(), 2);
        assert_eq!(*track.get(0).unwrap().value(), 42.0);
    }

    #[test]
    fn test_get_at_time_exact_only() {
        let track = track(&[0.0, 1.0]);
        assert!(track.get_at_time(0.5).is_none());
        assert_eq!(*track.get_at_time(1.0).unwrap().value(), 1.0);
    }

    #[test]
    fn test_iteration_orders() {
        let track = track(&[2.0, 0.5, 1.0]);
        let by_index: Vec<f64> = track.iter().map(TimeKey::time).collect();
        let by_time: Vec<f64> = track.iter_by_time().map(TimeKey::time).collect();
        assert_eq!(by_index, vec![2.0, 0.5, 1.0]);
        assert_eq!(by_time, vec![0.5, 1.0, 2.0]);
        assert_eq!((&track).into_iter().count(), 3);
    }

    #[test]
    fn test_floor_and_ceil() {
        let track = track(&[2.0, 0.5, 1.0]);
        assert_eq!(track.floor(0.9).unwrap().time(), 0.5);
        assert_eq!(track.ceil(0.9).unwrap().time(), 1.0);
        assert_eq!(track.floor(1.0).unwrap().time(), 1.0);
        assert!(track.floor(0.1).is_none());
        assert!(track.ceil(3.0).is_none());
        assert_eq!(track.first().unwrap().time(), 0.5);
        assert_eq!(track.last().unwrap().time(), 2.0);
    }

    #[test]
    fn test_sample_interpolates_and_clamps() {
        let mut track = TrackStore::new();
        track.add(1.0, Vec3::ZERO);
        track.add(0.0, Vec3::ZERO);
        track.add(2.0, Vec3::new(2.0, 0.0, 0.0));

        assert_eq!(track.sample(1.5), Some(Vec3::new(1.0, 0.0, 0.0)));
        assert_eq!(track.sample(-1.0), Some(Vec3::ZERO));
        assert_eq!(track.sample(5.0), Some(Vec3::new(2.0, 0.0, 0.0)));
        assert!(TrackStore::<Vec3>::new().sample(0.0).is_none());
    }

    #[test]
    fn test_sample_quat_slerps() {
        let mut track = TrackStore::new();
        track.add(0.0, Quat::IDENTITY);
        track.add(1.0, Quat::from_rotation_y(std::f32::consts::FRAC_PI_2));
        let half = track.sample(0.5).unwrap();
        let expected = Quat::from_rotation_y(std::f32::consts::FRAC_PI_4);
        assert!(half.angle_between(expected) < 1e-4);
    }
}

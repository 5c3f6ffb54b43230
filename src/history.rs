//! Bounded, append-only log of room evaluations.

use crate::engine::RoomEvaluation;
use std::collections::{BTreeMap, VecDeque};
use std::time::SystemTime;

pub const DEFAULT_QUERY_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationRecord {
    pub timestamp: SystemTime,
    pub evaluation: RoomEvaluation,
}

/// Append-only store for evaluations produced by the service.
pub trait RecommendationLog: Send + Sync + std::fmt::Debug {
    fn record(&mut self, record: RecommendationRecord);

    /// Matching records, newest first.
    fn query(&self, filter: &HistoryFilter, limit: usize) -> Vec<RecommendationRecord>;

    fn stats(&self) -> HistoryStats;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryFilter {
    pub site_id: Option<String>,
    pub room_id: Option<String>,
}

impl HistoryFilter {
    /// True when the (site, room) pair passes every set field.
    pub fn matches_room(&self, site_id: &str, room_id: &str) -> bool {
        let same = |wanted: &Option<String>, actual: &str| {
            wanted
                .as_deref()
                .is_none_or(|wanted| wanted.trim().eq_ignore_ascii_case(actual.trim()))
        };
        same(&self.site_id, site_id) && same(&self.room_id, room_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryStats {
    pub total_entries: usize,
    pub total_actions: usize,
    pub by_room: BTreeMap<String, usize>,
    pub by_pollutant: BTreeMap<String, usize>,
    pub by_module: BTreeMap<String, usize>,
    pub by_action_type: BTreeMap<String, usize>,
    pub by_priority: BTreeMap<String, usize>,
    pub most_recent: Option<SystemTime>,
}

/// Fixed-capacity FIFO; pushing into a full buffer drops the oldest entry.
#[derive(Debug, Clone)]
pub(crate) struct Bounded<T> {
    capacity: usize,
    items: VecDeque<T>,
}

impl<T> Bounded<T> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            items: VecDeque::with_capacity(capacity.min(1024)),
        }
    }

    pub(crate) fn push(&mut self, item: T) {
        if self.capacity == 0 {
            return;
        }
        while self.items.len() >= self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn oldest_first(&self) -> impl DoubleEndedIterator<Item = &T> {
        self.items.iter()
    }

    pub(crate) fn newest(&self) -> Option<&T> {
        self.items.back()
    }
}

/// Keeps the latest `capacity` records, evicting the oldest first.
#[derive(Debug, Clone)]
pub struct BoundedHistory {
    records: Bounded<RecommendationRecord>,
}

impl BoundedHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: Bounded::new(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.records.capacity()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.len() == 0
    }
}

impl RecommendationLog for BoundedHistory {
    fn record(&mut self, record: RecommendationRecord) {
        self.records.push(record);
    }

    fn query(&self, filter: &HistoryFilter, limit: usize) -> Vec<RecommendationRecord> {
        self.records
            .oldest_first()
            .rev()
            .filter(|record| {
                filter.matches_room(&record.evaluation.site_id, &record.evaluation.room_id)
            })
            .take(limit)
            .cloned()
            .collect()
    }

    fn stats(&self) -> HistoryStats {
        let mut stats = HistoryStats {
            total_entries: self.records.len(),
            most_recent: self.records.newest().map(|record| record.timestamp),
            ..HistoryStats::default()
        };

        for record in self.records.oldest_first() {
            let evaluation = &record.evaluation;
            *stats.by_room.entry(evaluation.room_id.clone()).or_default() += 1;
            stats.total_actions += evaluation.actions.len();
            for action in &evaluation.actions {
                *stats
                    .by_pollutant
                    .entry(action.reason.pollutant.to_string())
                    .or_default() += 1;
                *stats
                    .by_module
                    .entry(action.module_type.to_string())
                    .or_default() += 1;
                *stats
                    .by_action_type
                    .entry(action.action_type.to_string())
                    .or_default() += 1;
                *stats
                    .by_priority
                    .entry(action.priority.to_string())
                    .or_default() += 1;
            }
        }
        stats
    }
}

//! Tag-frequency personalization.
//!
//! A customer's past order lines are reduced to a tag -> count map; each
//! catalog food then scores the sum of the counts of its own tags.

use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::HashMap;

use crate::domain::food::Food;

/// One line of a past order, carrying the tags of the food it ordered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoricalLine {
    pub food_id: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoricalOrder {
    pub lines: Vec<HistoricalLine>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TagFrequency(HashMap<String, u32>);

impl TagFrequency {
    /// Counts one per (line, tag). Quantities are ignored, and the same tag on
    /// two lines of one order counts twice.
    pub fn from_history(history: &[HistoricalOrder]) -> Self {
        let mut counts: HashMap<String, u32> = HashMap::new();
        for line in history.iter().flat_map(|o| o.lines.iter()) {
            for tag in &line.tags {
                let slot = counts.entry(tag.clone()).or_insert(0);
                *slot = slot.saturating_add(1);
            }
        }
        Self(counts)
    }

    pub fn get(&self, tag: &str) -> u32 {
        self.0.get(tag).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn score(&self, food: &Food) -> u32 {
        food.tags
            .iter()
            .fold(0u32, |acc, t| acc.saturating_add(self.get(t)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredFood {
    pub food: Food,
    pub score: u32,
}

/// Catalog sorted by score, highest first. Equal scores keep catalog order.
pub fn rank(catalog: Vec<Food>, freq: &TagFrequency) -> Vec<Food> {
    rank_scored(catalog, freq)
        .into_iter()
        .map(|s| s.food)
        .collect()
}

pub fn rank_scored(catalog: Vec<Food>, freq: &TagFrequency) -> Vec<ScoredFood> {
    let mut scored: Vec<ScoredFood> = catalog
        .into_iter()
        .map(|food| ScoredFood {
            score: freq.score(&food),
            food,
        })
        .collect();
    // sort_by_key is stable
    scored.sort_by_key(|s| Reverse(s.score));
    scored
}

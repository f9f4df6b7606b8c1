//! Skill levels derived from how often a technology appears across projects.

use std::collections::HashMap;

use super::types::Project;

/// Level given to a technology the first time it shows up
pub const BASE_LEVEL: u32 = 50;
/// Added for every further project using the same technology
pub const LEVEL_STEP: u32 = 2;
pub const MAX_LEVEL: u32 = 95;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skill {
  pub name: String,
  /// Proficiency estimate in `0..=95`
  pub level: u8,
}

/// Derive skills from project tags.
///
/// Skills come out in first-occurrence order across the collection.
pub fn derive_skills(projects: &[Project]) -> Vec<Skill> {
  let mut order: Vec<&str> = Vec::new();
  let mut counts: HashMap<&str, u32> = HashMap::new();

  for tag in projects.iter().flat_map(|p| p.tech.iter()) {
    let count = counts.entry(tag.as_str()).or_insert_with(|| {
      order.push(tag.as_str());
      0
    });
    *count += 1;
  }

  order
    .into_iter()
    .map(|name| Skill {
      name: name.to_string(),
      level: level_for(counts[name]),
    })
    .collect()
}

fn level_for(occurrences: u32) -> u8 {
  let raw = BASE_LEVEL.saturating_add(LEVEL_STEP.saturating_mul(occurrences.saturating_sub(1)));
  // MAX_LEVEL fits in a u8
  raw.min(MAX_LEVEL) as u8
}

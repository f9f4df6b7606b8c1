//! Portfolio projects: the persisted collection and the skills derived from it.

mod skills;
mod types;

pub use skills::{derive_skills, Skill};
pub use types::{
  from_blob, parse_tag_list, to_blob, Project, ProjectDraft, ProjectId, ValidationError,
};

//! Reference data loaded once at startup and shared read-only by every stage.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::error::ReferenceError;
use crate::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum SkillType {
    #[serde(rename = "Hard Skill", alias = "Hard")]
    Hard,
    #[serde(rename = "Soft Skill", alias = "Soft")]
    Soft,
    /// Certifications and anything else the taxonomy carries; never aggregated.
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkillEntry {
    pub id: String,
    pub name: String,
    pub kind: SkillType,
}

#[derive(Deserialize)]
struct RawSkill {
    skill_name: String,
    skill_type: SkillType,
}

/// Skill catalog keyed by id. Ordered so anything derived from it is deterministic.
#[derive(Debug, Clone, Default)]
pub struct Taxonomy {
    entries: BTreeMap<String, SkillEntry>,
}

impl Taxonomy {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let raw: BTreeMap<String, RawSkill> = serde_json::from_str(json)?;
        Ok(raw
            .into_iter()
            .map(|(id, r)| SkillEntry {
                id,
                name: r.skill_name,
                kind: r.skill_type,
            })
            .collect())
    }

    pub fn load(path: &Path) -> Result<Self, ReferenceError> {
        let json = read(path)?;
        Taxonomy::from_json(&json).map_err(|source| ReferenceError::Taxonomy {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn get(&self, id: &str) -> Option<&SkillEntry> {
        self.entries.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SkillEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl FromIterator<SkillEntry> for Taxonomy {
    fn from_iter<I: IntoIterator<Item = SkillEntry>>(iter: I) -> Self {
        Taxonomy {
            entries: iter.into_iter().map(|e| (e.id.clone(), e)).collect(),
        }
    }
}

/// One title per line; blank lines and `#` comments skipped. Order is kept
/// because it breaks ties between equally scored titles.
pub fn parse_titles(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}

pub fn load_titles(path: &Path) -> Result<Vec<String>, ReferenceError> {
    let titles = parse_titles(&read(path)?);
    if titles.is_empty() {
        return Err(ReferenceError::EmptyTitles(path.to_path_buf()));
    }
    Ok(titles)
}

#[derive(Debug, Clone)]
pub struct ReferenceData {
    pub taxonomy: Taxonomy,
    pub titles: Vec<String>,
    /// Lower-cased skill names that are always dropped.
    pub denylist: HashSet<String>,
    pub triggers: Vec<String>,
    pub known_places: Vec<String>,
    pub similarity_threshold: f32,
    pub title_threshold: f64,
    pub ppp_factor: f64,
}

impl ReferenceData {
    pub fn load(settings: &Settings) -> Result<Self, ReferenceError> {
        let taxonomy = Taxonomy::load(&settings.skills.taxonomy_path)?;
        let titles = load_titles(&settings.titles.path)?;
        info!(
            skills = taxonomy.len(),
            titles = titles.len(),
            "Loaded reference data"
        );
        Ok(ReferenceData::new(taxonomy, titles, settings))
    }

    pub fn new(taxonomy: Taxonomy, titles: Vec<String>, settings: &Settings) -> Self {
        ReferenceData {
            taxonomy,
            titles,
            denylist: settings
                .skills
                .denylist
                .iter()
                .map(|s| s.trim().to_lowercase())
                .collect(),
            triggers: settings.skills.triggers.clone(),
            known_places: settings
                .locations
                .known_places
                .iter()
                .map(|s| s.to_lowercase())
                .collect(),
            similarity_threshold: settings.skills.similarity_threshold,
            title_threshold: settings.titles.threshold,
            ppp_factor: settings.ppp_factor(),
        }
    }
}

fn read(path: &Path) -> Result<String, ReferenceError> {
    std::fs::read_to_string(path).map_err(|source| ReferenceError::Read {
        path: path.to_path_buf(),
        source,
    })
}

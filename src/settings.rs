use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

const DEFAULT_CONFIG_NAME: &str = "jobs_pipeline";
const ENV_PREFIX: &str = "JOBS";

/// Runtime knobs. Defaults, then `jobs_pipeline.toml` (or `--config`), then
/// `JOBS_*` environment variables, e.g. `JOBS_TITLES__THRESHOLD=85`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub db_path: PathBuf,
    pub skills: SkillSettings,
    pub titles: TitleSettings,
    pub salary: SalarySettings,
    pub locations: LocationSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SkillSettings {
    pub taxonomy_path: PathBuf,
    /// GloVe/word2vec text vectors. Without it the lexical fallback is used.
    pub vectors_path: Option<PathBuf>,
    pub similarity_threshold: f32,
    pub ngram_threshold: f64,
    pub denylist: Vec<String>,
    pub triggers: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TitleSettings {
    pub path: PathBuf,
    pub threshold: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SalarySettings {
    /// JSON snapshot `{title: {bucket: count}}`. Takes precedence over `base_url`.
    pub histogram_path: Option<PathBuf>,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    /// Published PPP conversion factor for the target currency.
    pub ppp_macro: f64,
    pub ppp_haircut: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocationSettings {
    pub known_places: Vec<String>,
}

impl Settings {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => File::from(p).required(true),
            None => File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };
        let settings = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .context("Failed to build settings")?;
        settings
            .try_deserialize()
            .context("Failed to deserialize settings")
    }

    pub fn ppp_factor(&self) -> f64 {
        self.salary.ppp_macro * self.salary.ppp_haircut
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            db_path: PathBuf::from("data/job_postings.sqlite"),
            skills: SkillSettings::default(),
            titles: TitleSettings::default(),
            salary: SalarySettings::default(),
            locations: LocationSettings::default(),
        }
    }
}

impl Default for SkillSettings {
    fn default() -> Self {
        SkillSettings {
            taxonomy_path: PathBuf::from("data/skills.json"),
            vectors_path: None,
            similarity_threshold: 0.75,
            ngram_threshold: 0.85,
            denylist: to_strings(&[
                "e (programming language)",
                "library for www in perl",
                "component object model (com)",
                "hostile work environment",
                "sage safe x3",
                "inquiry",
                "workflows",
                "flooring",
                "target 3001!",
            ]),
            triggers: to_strings(&[
                "proficient",
                "experience",
                "skills",
                "required",
                "knowledge",
                "expertise",
                "purpose",
                "ability",
                "qualifications",
                "role",
                "responsible",
                "duties",
                "looking",
                "seeking",
                "task",
                "candidate",
                "responsibilities",
            ]),
        }
    }
}

impl Default for TitleSettings {
    fn default() -> Self {
        TitleSettings {
            path: PathBuf::from("data/titles.txt"),
            threshold: 80.0,
        }
    }
}

impl Default for SalarySettings {
    fn default() -> Self {
        SalarySettings {
            histogram_path: Some(PathBuf::from("data/salary_histograms.json")),
            base_url: None,
            timeout_secs: 15,
            // EGP per USD, World Bank 2024 PPP conversion factor (GDP, LCU per international $).
            ppp_macro: 4.6,
            ppp_haircut: 0.8,
        }
    }
}

impl Default for LocationSettings {
    fn default() -> Self {
        LocationSettings {
            known_places: to_strings(&[
                "cairo",
                "alexandria",
                "giza",
                "egypt",
                "dubai",
                "riyadh",
                "saudi",
                "arabia",
                "london",
                "uk",
                "new york",
                "usa",
                "los angeles",
                "chicago",
                "toronto",
                "canada",
                "berlin",
                "germany",
                "paris",
                "france",
                "tokyo",
                "japan",
                "sydney",
                "australia",
            ]),
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

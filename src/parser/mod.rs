pub mod blocks;
pub mod fields;
pub mod sections;

use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::{debug, warn};

use crate::document::Document;
use crate::record::JobRecord;
use crate::reference::ReferenceData;
use crate::skills::SkillAnnotator;
use crate::titles::{TitleEstimate, TitleNormalizer};

/// Document → blocks → sections and fields → skills → title and salary.
pub struct Pipeline<'r> {
    reference: &'r ReferenceData,
    skills: SkillAnnotator,
    titles: TitleNormalizer,
}

impl<'r> Pipeline<'r> {
    pub fn new(reference: &'r ReferenceData, skills: SkillAnnotator, titles: TitleNormalizer) -> Self {
        Pipeline {
            reference,
            skills,
            titles,
        }
    }

    pub fn process(&self, doc: &Document) -> JobRecord {
        let blocks = blocks::segment(&doc.text);
        let sections = sections::classify(&blocks);
        let description = sections
            .summary
            .clone()
            .or_else(|| sections::describe_role(&blocks));
        let fields = fields::extract_all(doc, sections.summary.as_deref(), self.reference);

        let skills = description.as_deref().and_then(|text| {
            isolate("skills", &doc.link, || {
                self.skills.annotate(text, &doc.text, self.reference)
            })
        });

        let title = doc.title.as_deref().map(str::trim).filter(|t| !t.is_empty());
        let estimate = title
            .and_then(|t| isolate("titles", &doc.link, || self.titles.normalize(t, self.reference)))
            .unwrap_or_default();
        let TitleEstimate { mapping, salary } = estimate;

        debug!(
            link = %doc.link,
            blocks = blocks.len(),
            required = sections.required.is_some(),
            preferred = sections.preferred.is_some(),
            "processed document"
        );

        JobRecord {
            company: doc.company.clone(),
            company_url: doc.company_url.clone(),
            location: fields.location,
            job_link: doc.link.clone(),
            job_title: title.map(str::to_string),
            job_description: description,
            employment_type: fields.employment_type,
            job_flexibility: Some(fields.flexibility.to_string()),
            mapped_title: mapping.as_ref().map(|m| m.canonical.clone()),
            match_score: mapping.as_ref().map(|m| m.score),
            mean_salary: salary.map(|s| s.mean),
            median_salary: salary.map(|s| s.median),
            p10_salary: salary.map(|s| s.p10),
            p90_salary: salary.map(|s| s.p90),
            sample_count: salary.and_then(|s| i64::try_from(s.sample_count).ok()),
            hard_skills: skills.as_ref().map(|s| s.hard_joined()),
            soft_skills: skills.as_ref().map(|s| s.soft_joined()),
            company_description: sections.company,
            required_qualifications: sections.required,
            preferred_qualifications: sections.preferred,
        }
    }
}

/// Run one stage for one document; a panic in an injected capability nulls
/// that stage's fields instead of taking the batch down.
fn isolate<T>(stage: &str, link: &str, f: impl FnOnce() -> T) -> Option<T> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(v) => Some(v),
        Err(panic) => {
            let msg = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            warn!(stage, link, panic = %msg, "stage failed, fields left empty");
            None
        }
    }
}

// ── Tests ──

use serde::Serialize;

/// Persisted columns, in contract order.
pub const COLUMNS: [&str; 17] = [
    "company",
    "company_url",
    "location",
    "job_link",
    "job_title",
    "job_description",
    "employment_type",
    "job_flexibility",
    "mapped_title",
    "match_score",
    "mean_salary",
    "median_salary",
    "p10_salary",
    "p90_salary",
    "sample_count",
    "hard_skills",
    "soft_skills",
];

/// One structured posting. Built once per document and never mutated after.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JobRecord {
    pub company: Option<String>,
    pub company_url: Option<String>,
    pub location: Option<String>,
    pub job_link: String,
    pub job_title: Option<String>,
    pub job_description: Option<String>,
    pub employment_type: Option<String>,
    pub job_flexibility: Option<String>,
    pub mapped_title: Option<String>,
    pub match_score: Option<f64>,
    pub mean_salary: Option<f64>,
    pub median_salary: Option<f64>,
    pub p10_salary: Option<f64>,
    pub p90_salary: Option<f64>,
    pub sample_count: Option<i64>,
    pub hard_skills: Option<String>,
    pub soft_skills: Option<String>,

    #[serde(skip)]
    pub company_description: Option<String>,
    #[serde(skip)]
    pub required_qualifications: Option<String>,
    #[serde(skip)]
    pub preferred_qualifications: Option<String>,
}

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use tracing::{info, warn};

use crate::error::ReferenceError;

/// Salary bucket (numeric, as a string) → number of observations.
pub type Histogram = BTreeMap<String, u64>;

pub trait SalarySource: Send + Sync {
    /// An empty histogram means "no data".
    fn histogram(&self, title: &str) -> Result<Histogram>;
}

/// Snapshot file `{title: {bucket: count}}` loaded once.
#[derive(Debug, Default)]
pub struct FileSalarySource {
    by_title: HashMap<String, Histogram>,
}

impl FileSalarySource {
    pub fn load(path: &Path) -> Result<Self, ReferenceError> {
        let json = std::fs::read_to_string(path).map_err(|source| ReferenceError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let by_title: HashMap<String, Histogram> =
            serde_json::from_str(&json).map_err(|source| ReferenceError::Histograms {
                path: path.to_path_buf(),
                source,
            })?;
        info!(titles = by_title.len(), "Loaded salary histograms");
        Ok(FileSalarySource { by_title })
    }
}

impl FromIterator<(String, Histogram)> for FileSalarySource {
    fn from_iter<I: IntoIterator<Item = (String, Histogram)>>(iter: I) -> Self {
        FileSalarySource {
            by_title: iter.into_iter().collect(),
        }
    }
}

impl SalarySource for FileSalarySource {
    fn histogram(&self, title: &str) -> Result<Histogram> {
        Ok(self.by_title.get(title).cloned().unwrap_or_default())
    }
}

/// `GET {base_url}?title=<title>` returning `{bucket: count}`.
pub struct HttpSalarySource {
    client: Client,
    base_url: String,
}

impl HttpSalarySource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        anyhow::ensure!(
            base_url.starts_with("http://") || base_url.starts_with("https://"),
            "salary base_url must be an http(s) URL"
        );
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build salary HTTP client")?;
        Ok(HttpSalarySource {
            client,
            base_url: base_url.to_string(),
        })
    }
}

impl SalarySource for HttpSalarySource {
    fn histogram(&self, title: &str) -> Result<Histogram> {
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[("title", title)])
            .send()
            .with_context(|| format!("salary request for {title:?} failed"))?
            .error_for_status()?;
        resp.json().context("failed to parse salary histogram")
    }
}

/// Used when neither a snapshot nor an endpoint is configured.
pub struct NoSalaryData;

impl SalarySource for NoSalaryData {
    fn histogram(&self, _title: &str) -> Result<Histogram> {
        Ok(Histogram::new())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SalaryStats {
    pub mean: f64,
    pub median: f64,
    pub p10: f64,
    pub p90: f64,
    pub sample_count: u64,
}

impl SalaryStats {
    /// Statistics of the sample where each bucket value is repeated by its
    /// count. `None` when the histogram holds no observations.
    pub fn from_histogram(histogram: &Histogram) -> Option<Self> {
        let mut buckets: Vec<(f64, u64)> = histogram
            .iter()
            .filter(|(_, count)| **count > 0)
            .filter_map(|(bucket, count)| match bucket.trim().parse::<f64>() {
                Ok(value) if value.is_finite() => Some((value, *count)),
                _ => {
                    warn!(bucket = %bucket, "skipping non-numeric salary bucket");
                    None
                }
            })
            .collect();
        buckets.sort_by(|a, b| a.0.total_cmp(&b.0));

        let n: u64 = buckets.iter().map(|(_, c)| c).sum();
        if n == 0 {
            return None;
        }
        let total: f64 = buckets.iter().map(|(v, c)| v * *c as f64).sum();

        Some(SalaryStats {
            mean: total / n as f64,
            median: percentile(&buckets, n, 0.5),
            p10: percentile(&buckets, n, 0.1),
            p90: percentile(&buckets, n, 0.9),
            sample_count: n,
        })
    }

    /// Annual figures to monthly, scaled by the PPP factor and rounded to cents.
    pub fn monthly(&self, ppp_factor: f64) -> Self {
        let convert = |annual: f64| round2(annual / 12.0 * ppp_factor);
        SalaryStats {
            mean: convert(self.mean),
            median: convert(self.median),
            p10: convert(self.p10),
            p90: convert(self.p90),
            sample_count: self.sample_count,
        }
    }
}

/// Linear interpolation between the closest ranks of the expanded sample,
/// read off cumulative counts.
fn percentile(buckets: &[(f64, u64)], n: u64, q: f64) -> f64 {
    let pos = q * (n - 1) as f64;
    let lo = pos.floor() as u64;
    let hi = pos.ceil() as u64;
    let lo_value = value_at(buckets, lo);
    let hi_value = value_at(buckets, hi);
    lo_value + (pos - lo as f64) * (hi_value - lo_value)
}

/// Value of the `rank`-th (0-based) element of the expanded, sorted sample.
fn value_at(buckets: &[(f64, u64)], rank: u64) -> f64 {
    let mut seen = 0;
    for (value, count) in buckets {
        seen += count;
        if rank < seen {
            return *value;
        }
    }
    buckets.last().map(|(v, _)| *v).unwrap_or(0.0)
}

pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

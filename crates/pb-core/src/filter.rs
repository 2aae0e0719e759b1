//! # Filter Predicate Engine
//!
//! Maps a [`FilterCriteria`] value to a predicate over reports and applies it.
//! Criteria are independent and combined with logical AND, checked in the
//! order region → collar → recency → free text so the cheap comparisons
//! short-circuit first.
//!
//! Filter input usually arrives as loose strings ([`RawFilter`]). A value
//! that does not name a known region, collar state or recency window is
//! treated as "no constraint" for that criterion, the same as leaving it
//! unset. A warning is logged so the mismatch shows up when new codes are
//! introduced on one side only.

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::warn;

use crate::models::Report;
use crate::region::Region;

/// Named relative time bucket measured from the report's `created_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recency {
    /// Same local calendar day as now.
    Today,
    /// At most 7 whole days ago.
    Week,
    /// At most 30 whole days ago.
    Month,
}

impl Recency {
    fn max_days(self) -> Option<i64> {
        match self {
            Recency::Today => None,
            Recency::Week => Some(7),
            Recency::Month => Some(30),
        }
    }
}

impl FromStr for Recency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "today" => Ok(Recency::Today),
            "week" => Ok(Recency::Week),
            "month" => Ok(Recency::Month),
            other => Err(other.to_string()),
        }
    }
}

/// Active browse filter. `None` means "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub region: Option<Region>,
    pub has_collar: Option<bool>,
    pub recency: Option<Recency>,
    /// Free text matched case-insensitively against name, breed, color and
    /// description. Surrounding whitespace is trimmed before matching, and
    /// text that is blank after trimming leaves the filter unset.
    pub search: Option<String>,
}

impl FilterCriteria {
    pub fn is_empty(&self) -> bool {
        self.region.is_none()
            && self.has_collar.is_none()
            && self.recency.is_none()
            && self.search_needle().is_none()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }

    pub fn with_collar(mut self, has_collar: bool) -> Self {
        self.has_collar = Some(has_collar);
        self
    }

    pub fn with_recency(mut self, recency: Recency) -> Self {
        self.recency = Some(recency);
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// Lower-cased, trimmed search text; blank input counts as unset.
    fn search_needle(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }
}

/// Untyped filter input, as it comes from a form or query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawFilter {
    pub region: Option<String>,
    pub collar: Option<String>,
    pub date: Option<String>,
    pub search: Option<String>,
}

impl RawFilter {
    /// Builds a raw filter from `key=value` style pairs; unknown keys are ignored.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut raw = RawFilter::default();
        for (key, value) in pairs {
            let slot = match key {
                "region" => &mut raw.region,
                "collar" => &mut raw.collar,
                "date" => &mut raw.date,
                "search" => &mut raw.search,
                _ => continue,
            };
            *slot = Some(value.to_string());
        }
        raw
    }
}

impl From<&RawFilter> for FilterCriteria {
    fn from(raw: &RawFilter) -> Self {
        let region = non_blank(&raw.region).and_then(|code| match code.parse::<Region>() {
            Ok(region) => Some(region),
            Err(err) => {
                warn!(%err, "ignoring region filter");
                None
            }
        });

        let has_collar = non_blank(&raw.collar).and_then(|value| match parse_collar(value) {
            Some(flag) => Some(flag),
            None => {
                warn!(%value, "ignoring unrecognized collar filter");
                None
            }
        });

        let recency = non_blank(&raw.date).and_then(|value| match value.parse::<Recency>() {
            Ok(recency) => Some(recency),
            Err(value) => {
                warn!(%value, "ignoring unrecognized date filter");
                None
            }
        });

        FilterCriteria {
            region,
            has_collar,
            recency,
            search: non_blank(&raw.search).map(str::to_string),
        }
    }
}

impl From<RawFilter> for FilterCriteria {
    fn from(raw: RawFilter) -> Self {
        FilterCriteria::from(&raw)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Accepts the spellings collar values have been stored and submitted with.
pub fn parse_collar(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "with" | "collar" | "有項圈" => Some(true),
        "false" | "no" | "without" | "none" | "無項圈" => Some(false),
        _ => None,
    }
}

/// A compiled filter, evaluated against a fixed `now`.
#[derive(Debug, Clone)]
pub struct Predicate<Tz: TimeZone> {
    region: Option<Region>,
    has_collar: Option<bool>,
    recency: Option<Recency>,
    needle: Option<String>,
    now: DateTime<Tz>,
    now_utc: DateTime<Utc>,
}

impl<Tz: TimeZone> Predicate<Tz> {
    pub fn new(criteria: &FilterCriteria, now: DateTime<Tz>) -> Self {
        Self {
            region: criteria.region,
            has_collar: criteria.has_collar,
            recency: criteria.recency,
            needle: criteria.search_needle(),
            now_utc: now.with_timezone(&Utc),
            now,
        }
    }

    pub fn matches(&self, report: &Report) -> bool {
        self.region.map_or(true, |region| report.location == region)
            && self.has_collar.map_or(true, |flag| report.has_collar == flag)
            && self.recency.map_or(true, |window| self.within(report, window))
            && self
                .needle
                .as_deref()
                .map_or(true, |needle| matches_text(report, needle))
    }

    fn within(&self, report: &Report, window: Recency) -> bool {
        let Some(created) = report.created_at else {
            return false;
        };
        match window.max_days() {
            None => created.with_timezone(&self.now.timezone()).date_naive() == self.now.date_naive(),
            Some(max) => (self.now_utc - created).num_days() <= max,
        }
    }
}

fn matches_text(report: &Report, needle: &str) -> bool {
    [
        Some(report.name.as_str()),
        Some(report.breed.as_str()),
        report.description.as_deref(),
        Some(report.color.as_str()),
    ]
    .into_iter()
    .flatten()
    .any(|field| field.to_lowercase().contains(needle))
}

/// Applies `criteria` against the local clock.
pub fn apply(reports: &[Report], criteria: &FilterCriteria) -> Vec<Report> {
    apply_at(reports, criteria, Local::now())
}

/// Applies `criteria` as of `now`. Pure: the input is never modified and the
/// result preserves input order. Empty criteria return the input unchanged.
pub fn apply_at<Tz: TimeZone>(
    reports: &[Report],
    criteria: &FilterCriteria,
    now: DateTime<Tz>,
) -> Vec<Report> {
    if criteria.is_empty() {
        return reports.to_vec();
    }
    let predicate = Predicate::new(criteria, now);
    reports
        .iter()
        .filter(|report| predicate.matches(report))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Gender, Images, ReportStatus};
    use chrono::{Duration, FixedOffset, NaiveDate};

    fn taipei_noon() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(8 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 6, 15, 12, 0, 0)
            .unwrap()
    }

    fn report(id: &str, created_at: Option<DateTime<Utc>>) -> Report {
        Report {
            id: id.into(),
            owner_id: "owner".into(),
            owner_email: "owner@example.com".into(),
            status: ReportStatus::Lost,
            created_at,
            found_at: None,
            lost_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            location: Region::Taipei,
            name: "Max".into(),
            breed: "Shiba Inu".into(),
            color: "Cream".into(),
            age: "2".into(),
            gender: Gender::Male,
            has_collar: true,
            description: None,
            images: Images::try_from(vec![format!("https://cdn/{id}.jpg")]).unwrap(),
            contact_name: "Lin".into(),
            contact_phone: "0912345678".into(),
        }
    }

    fn ago(now: &DateTime<FixedOffset>, delta: Duration) -> Option<DateTime<Utc>> {
        Some((now.clone() - delta).with_timezone(&Utc))
    }

    fn ids(reports: &[Report]) -> Vec<&str> {
        reports.iter().map(|r| r.id.0.as_str()).collect()
    }

    #[test]
    fn empty_criteria_is_identity() {
        let now = taipei_noon();
        let reports = vec![report("a", None), report("b", ago(&now, Duration::days(40)))];
        assert_eq!(apply_at(&reports, &FilterCriteria::default(), now), reports);
        let blank = FilterCriteria::default().with_search("   ");
        assert_eq!(apply_at(&reports, &blank, now), reports);
    }

    #[test]
    fn single_criteria_only_narrow() {
        let now = taipei_noon();
        let mut other = report("b", ago(&now, Duration::days(2)));
        other.location = Region::Kaohsiung;
        other.has_collar = false;
        let reports = vec![report("a", ago(&now, Duration::days(10))), other];

        let single = [
            FilterCriteria::default().with_region(Region::Kaohsiung),
            FilterCriteria::default().with_collar(true),
            FilterCriteria::default().with_recency(Recency::Week),
            FilterCriteria::default().with_search("shiba"),
            FilterCriteria::default().with_search("zzz"),
        ];
        for criteria in single {
            let result = apply_at(&reports, &criteria, now);
            assert!(result.len() <= reports.len());
            assert!(result.iter().all(|r| reports.contains(r)), "{criteria:?}");
        }
    }

    #[test]
    fn search_is_case_insensitive() {
        let now = taipei_noon();
        let reports = vec![report("a", None)];
        let upper = apply_at(&reports, &FilterCriteria::default().with_search("MAX"), now);
        let lower = apply_at(&reports, &FilterCriteria::default().with_search("max"), now);
        assert_eq!(upper, lower);
        assert_eq!(ids(&upper), vec!["a"]);
    }

    #[test]
    fn search_ignores_surrounding_whitespace() {
        let now = taipei_noon();
        let reports = vec![report("a", None)];
        let padded = FilterCriteria::default().with_search("  max\t");
        assert_eq!(ids(&apply_at(&reports, &padded, now)), vec!["a"]);

        let blank = FilterCriteria::default().with_search("   ");
        assert!(blank.is_empty());
        assert_eq!(apply_at(&reports, &blank, now), reports);
    }

    #[test]
    fn search_covers_breed_color_and_description() {
        let now = taipei_noon();
        let mut with_desc = report("d", None);
        with_desc.description = Some("Wears a RED collar".into());
        let reports = vec![report("a", None), with_desc];

        let by = |q: &str| ids(&apply_at(&reports, &FilterCriteria::default().with_search(q), now))
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>();
        assert_eq!(by("inu"), vec!["a", "d"]);
        assert_eq!(by("cream"), vec!["a", "d"]);
        assert_eq!(by("red collar"), vec!["d"]);
    }

    #[test]
    fn today_uses_the_local_calendar_day() {
        let midnight_ish = FixedOffset::east_opt(8 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 6, 15, 0, 30, 0)
            .unwrap();
        let reports = vec![
            report("minute", ago(&midnight_ish, Duration::minutes(1))),
            report("recent", ago(&midnight_ish, Duration::minutes(20))),
            report("yesterday", ago(&midnight_ish, Duration::hours(25))),
        ];
        let today = FilterCriteria::default().with_recency(Recency::Today);
        // 00:29 and 00:10 are today, 23:30 two days back is not
        assert_eq!(ids(&apply_at(&reports, &today, midnight_ish)), vec!["minute", "recent"]);

        let noon = taipei_noon();
        let reports = vec![
            report("minute", ago(&noon, Duration::minutes(1))),
            report("day_before", ago(&noon, Duration::hours(25))),
        ];
        assert_eq!(ids(&apply_at(&reports, &today, noon)), vec!["minute"]);
    }

    #[test]
    fn week_and_month_use_whole_days() {
        let now = taipei_noon();
        let reports = vec![
            report("d7", ago(&now, Duration::days(7) + Duration::hours(23))),
            report("d8", ago(&now, Duration::days(8))),
            report("d30", ago(&now, Duration::days(30))),
            report("d31", ago(&now, Duration::days(31))),
        ];
        let week = FilterCriteria::default().with_recency(Recency::Week);
        let month = FilterCriteria::default().with_recency(Recency::Month);
        assert_eq!(ids(&apply_at(&reports, &week, now)), vec!["d7"]);
        assert_eq!(ids(&apply_at(&reports, &month, now)), vec!["d7", "d8", "d30"]);
    }

    #[test]
    fn recency_excludes_reports_without_created_at() {
        let now = taipei_noon();
        let reports = vec![report("legacy", None)];
        for window in [Recency::Today, Recency::Week, Recency::Month] {
            let criteria = FilterCriteria::default().with_recency(window);
            assert!(apply_at(&reports, &criteria, now).is_empty());
        }
    }

    #[test]
    fn region_collar_and_recency_scenario() {
        let now = taipei_noon();
        let a = report("A", ago(&now, Duration::days(3)));
        let reports = vec![a];

        let taipei_week = FilterCriteria::from(RawFilter {
            region: Some("taipei".into()),
            date: Some("week".into()),
            ..RawFilter::default()
        });
        assert_eq!(ids(&apply_at(&reports, &taipei_week, now)), vec!["A"]);

        let kaohsiung = FilterCriteria::default().with_region(Region::Kaohsiung);
        assert!(apply_at(&reports, &kaohsiung, now).is_empty());

        let no_collar = FilterCriteria::default().with_collar(false);
        assert!(apply_at(&reports, &no_collar, now).is_empty());
    }

    #[test]
    fn unrecognized_values_pass_through() {
        let now = taipei_noon();
        let reports = vec![report("a", None), report("b", ago(&now, Duration::days(90)))];
        let raw = RawFilter {
            region: Some("atlantis".into()),
            collar: Some("maybe".into()),
            date: Some("fortnight".into()),
            search: None,
        };
        let criteria = FilterCriteria::from(&raw);
        assert!(criteria.is_empty());
        assert_eq!(apply_at(&reports, &criteria, now), reports);
    }

    #[test]
    fn raw_pairs_accept_legacy_collar_spelling() {
        let raw = RawFilter::from_pairs([("collar", "無項圈"), ("region", "tainan"), ("x", "y")]);
        let criteria = FilterCriteria::from(raw);
        assert_eq!(criteria.has_collar, Some(false));
        assert_eq!(criteria.region, Some(Region::Tainan));
    }

    #[test]
    fn reset_clears_every_criterion() {
        let mut criteria = FilterCriteria::default()
            .with_region(Region::Yilan)
            .with_recency(Recency::Month)
            .with_search("max");
        criteria.reset();
        assert!(criteria.is_empty());
    }
}

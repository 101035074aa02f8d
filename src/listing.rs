//! Shapes the fetched contest list for the browsing views: filter by class, bucket by year
//! (newest first), order each bucket by pre number.

use std::collections::BTreeMap;

use crate::model::Contest;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearGroup {
    pub year: i32,
    pub contests: Vec<Contest>,
}

pub fn filter_by_class(contests: &[Contest], class_level: i32) -> Vec<Contest> {
    contests
        .iter()
        .filter(|c| c.class_level == class_level)
        .cloned()
        .collect()
}

/// Groups one class's contests by year. Years are strictly decreasing, and each bucket is
/// ordered by pre number (id breaks ties).
pub fn group_by_year(contests: &[Contest], class_level: i32) -> Vec<YearGroup> {
    let mut buckets: BTreeMap<i32, Vec<Contest>> = BTreeMap::new();
    for contest in filter_by_class(contests, class_level) {
        buckets.entry(contest.year).or_default().push(contest);
    }

    buckets
        .into_iter()
        .rev()
        .map(|(year, mut contests)| {
            sort_by_pre_number(&mut contests);
            YearGroup { year, contests }
        })
        .collect()
}

/// Years with contests for this class, newest first.
pub fn years_for_class(contests: &[Contest], class_level: i32) -> Vec<i32> {
    group_by_year(contests, class_level)
        .into_iter()
        .map(|group| group.year)
        .collect()
}

/// The newest year that has contests for this class.
pub fn default_year(contests: &[Contest], class_level: i32) -> Option<i32> {
    contests
        .iter()
        .filter(|c| c.class_level == class_level)
        .map(|c| c.year)
        .max()
}

/// Keeps `selected` if the class still has contests in that year, otherwise falls back to the
/// newest year.
pub fn resolve_year(contests: &[Contest], class_level: i32, selected: Option<i32>) -> Option<i32> {
    match selected {
        Some(year)
            if contests
                .iter()
                .any(|c| c.class_level == class_level && c.year == year) =>
        {
            Some(year)
        }
        _ => default_year(contests, class_level),
    }
}

pub fn contests_for(contests: &[Contest], class_level: i32, year: i32) -> Vec<Contest> {
    let mut selected: Vec<Contest> = contests
        .iter()
        .filter(|c| c.class_level == class_level && c.year == year)
        .cloned()
        .collect();
    sort_by_pre_number(&mut selected);
    selected
}

pub fn card_title(contest: &Contest) -> String {
    format!("PREHSG {} Class {}", contest.year, contest.class_level)
}

fn sort_by_pre_number(contests: &mut [Contest]) {
    contests.sort_by_key(|c| (c.pre_number, c.id));
}

//! In-memory movie catalogue answering paginated, sorted, filtered listings.

use std::{cmp::Ordering, collections::HashMap};

use chrono::{DateTime, Utc};
use shared::{
    domain::{MovieId, MovieSummary},
    error::ApiException,
    protocol::{PageMeta, DEFAULT_PAGE_LIMIT},
    query::{parse_sort, SortOrder, SortRule},
};

pub const MAX_PAGE_LIMIT: u32 = 100;
pub const SORTABLE_FIELDS: [&str; 4] = ["id", "title", "year", "rating"];

const TITLE_PREFIXES: [&str; 8] = [
    "Midnight", "Silent", "Crimson", "Lost", "Electric", "Hidden", "Broken", "Golden",
];
const TITLE_SUFFIXES: [&str; 6] = ["Harbor", "Signal", "Empire", "Garden", "Frontier", "Echo"];
const GENRES: [&str; 6] = ["action", "drama", "comedy", "horror", "sci-fi", "documentary"];
const CATALOG_EPOCH_SECS: i64 = 1_704_067_200;

#[derive(Debug, Clone, PartialEq)]
pub struct ListingQuery {
    pub page: u32,
    pub limit: u32,
    pub sort: Vec<SortRule>,
    pub title: Option<String>,
    pub search: Option<String>,
    pub genre: Option<String>,
    pub year: Option<i32>,
}

impl Default for ListingQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
            sort: Vec::new(),
            title: None,
            search: None,
            genre: None,
            year: None,
        }
    }
}

impl ListingQuery {
    /// Unknown keys are ignored; empty values count as absent.
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, ApiException> {
        let value = |key: &str| params.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());
        let mut query = Self::default();

        if let Some(raw) = value("page") {
            query.page = parse_positive("page", raw)?;
        }
        if let Some(raw) = value("limit") {
            query.limit = parse_positive("limit", raw)?;
            if query.limit > MAX_PAGE_LIMIT {
                return Err(ApiException::validation(format!(
                    "limit must be at most {MAX_PAGE_LIMIT}"
                )));
            }
        }
        if let Some(raw) = value("sort") {
            query.sort = parse_sort(raw)?;
            if let Some(rule) = query
                .sort
                .iter()
                .find(|rule| !SORTABLE_FIELDS.contains(&rule.field.as_str()))
            {
                return Err(ApiException::validation(format!(
                    "unknown sort field '{}'",
                    rule.field
                )));
            }
        }
        query.title = value("title").map(str::to_lowercase);
        query.search = value("q").map(str::to_lowercase);
        query.genre = value("genre").map(str::to_lowercase);
        if let Some(raw) = value("year") {
            query.year = Some(raw.parse().map_err(|_| {
                ApiException::validation(format!("year must be an integer, got '{raw}'"))
            })?);
        }
        Ok(query)
    }

    fn matches(&self, movie: &MovieSummary) -> bool {
        let title = movie.title.to_lowercase();
        if let Some(needle) = &self.title {
            if !title.contains(needle.as_str()) {
                return false;
            }
        }
        if let Some(needle) = &self.search {
            if !title.contains(needle.as_str()) && !movie.genre.contains(needle.as_str()) {
                return false;
            }
        }
        if let Some(genre) = &self.genre {
            if movie.genre != *genre {
                return false;
            }
        }
        if let Some(year) = self.year {
            if movie.year != year {
                return false;
            }
        }
        true
    }
}

fn parse_positive(name: &str, raw: &str) -> Result<u32, ApiException> {
    match raw.parse::<u32>() {
        Ok(value) if value >= 1 => Ok(value),
        _ => Err(ApiException::validation(format!(
            "{name} must be a positive integer, got '{raw}'"
        ))),
    }
}

fn compare_field(a: &MovieSummary, b: &MovieSummary, field: &str) -> Ordering {
    match field {
        "title" => a.title.cmp(&b.title),
        "year" => a.year.cmp(&b.year),
        "rating" => a.rating.total_cmp(&b.rating),
        _ => a.id.cmp(&b.id),
    }
}

#[derive(Debug, Clone)]
pub struct Catalog {
    movies: Vec<MovieSummary>,
}

impl Catalog {
    pub fn new(movies: Vec<MovieSummary>) -> Self {
        Self { movies }
    }

    pub fn seeded(count: usize) -> Self {
        let movies = (0..count)
            .map(|index| {
                let n = index as i64;
                let prefix = TITLE_PREFIXES[index % TITLE_PREFIXES.len()];
                let suffix = TITLE_SUFFIXES[(index / TITLE_PREFIXES.len()) % TITLE_SUFFIXES.len()];
                let sequel = index / (TITLE_PREFIXES.len() * TITLE_SUFFIXES.len());
                let title = if sequel == 0 {
                    format!("{prefix} {suffix}")
                } else {
                    format!("{prefix} {suffix} {}", sequel + 1)
                };
                MovieSummary {
                    id: MovieId(n + 1),
                    title,
                    genre: GENRES[(index * 5 + 1) % GENRES.len()].to_string(),
                    year: 1970 + ((index * 7) % 55) as i32,
                    rating: ((index * 37) % 91) as f32 / 10.0 + 1.0,
                    added_at: DateTime::<Utc>::from_timestamp(CATALOG_EPOCH_SECS + n * 86_400, 0)
                        .unwrap_or_default(),
                }
            })
            .collect();
        Self::new(movies)
    }

    pub fn len(&self) -> usize {
        self.movies.len()
    }

    /// One page of matching movies. Pages past the end come back empty with
    /// the requested page number echoed in the meta.
    pub fn list(&self, query: &ListingQuery) -> (Vec<MovieSummary>, PageMeta) {
        let mut matching: Vec<&MovieSummary> =
            self.movies.iter().filter(|movie| query.matches(movie)).collect();

        if !query.sort.is_empty() {
            matching.sort_by(|a, b| {
                query
                    .sort
                    .iter()
                    .map(|rule| {
                        let ordering = compare_field(a, b, &rule.field);
                        match rule.order {
                            SortOrder::Asc => ordering,
                            SortOrder::Desc => ordering.reverse(),
                        }
                    })
                    .find(|ordering| ordering.is_ne())
                    .unwrap_or(Ordering::Equal)
            });
        }

        let total = matching.len() as u64;
        let offset = (query.page.saturating_sub(1) as usize).saturating_mul(query.limit as usize);
        let page = matching
            .into_iter()
            .skip(offset)
            .take(query.limit as usize)
            .cloned()
            .collect();
        (page, PageMeta::for_total(query.page, query.limit, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn seeded_catalog_is_deterministic() {
        let a = Catalog::seeded(60);
        let b = Catalog::seeded(60);
        assert_eq!(a.movies, b.movies);
        assert_eq!(a.movies[0].title, "Midnight Harbor");
        assert_eq!(a.movies[48].title, "Midnight Harbor 2");
    }

    #[test]
    fn defaults_apply_for_missing_and_empty_params() {
        let query = ListingQuery::from_params(&params(&[("title", ""), ("page", " ")]))
            .expect("query");
        assert_eq!(query, ListingQuery::default());
    }

    #[test]
    fn rejects_zero_page_unknown_sort_field_and_oversized_limit() {
        assert!(ListingQuery::from_params(&params(&[("page", "0")])).is_err());
        assert!(ListingQuery::from_params(&params(&[("limit", "x")])).is_err());
        assert!(ListingQuery::from_params(&params(&[("limit", "101")])).is_err());
        let err = ListingQuery::from_params(&params(&[("sort", "budget:asc")]))
            .expect_err("unknown field");
        assert!(err.message.contains("budget"));
    }

    #[test]
    fn paginates_and_reports_meta() {
        let catalog = Catalog::seeded(25);
        let query = ListingQuery {
            page: 3,
            ..ListingQuery::default()
        };
        let (rows, meta) = catalog.list(&query);
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0].id, MovieId(21));
        assert_eq!((meta.total, meta.total_pages, meta.page), (25, 3, 3));

        let beyond = ListingQuery {
            page: 9,
            ..ListingQuery::default()
        };
        let (rows, meta) = catalog.list(&beyond);
        assert!(rows.is_empty());
        assert_eq!(meta.page, 9);
    }

    #[test]
    fn filters_by_genre_year_and_title() {
        let catalog = Catalog::seeded(240);
        let query = ListingQuery::from_params(&params(&[
            ("genre", "Drama"),
            ("title", "crimson"),
            ("limit", "100"),
        ]))
        .expect("query");
        let (rows, meta) = catalog.list(&query);
        assert!(!rows.is_empty());
        assert_eq!(meta.total, rows.len() as u64);
        assert!(rows
            .iter()
            .all(|movie| movie.genre == "drama" && movie.title.starts_with("Crimson")));

        let year = rows[0].year;
        let by_year = ListingQuery {
            year: Some(year),
            limit: 100,
            ..ListingQuery::default()
        };
        assert!(catalog.list(&by_year).0.iter().all(|movie| movie.year == year));
    }

    #[test]
    fn search_matches_title_or_genre() {
        let catalog = Catalog::seeded(48);
        let query = ListingQuery::from_params(&params(&[("q", "sci"), ("limit", "100")]))
            .expect("query");
        let (rows, _) = catalog.list(&query);
        assert!(!rows.is_empty());
        assert!(rows.iter().all(|movie| movie.genre == "sci-fi"));
    }

    #[test]
    fn sorts_descending_with_tie_breakers() {
        let catalog = Catalog::seeded(120);
        let query = ListingQuery::from_params(&params(&[
            ("sort", "year:desc,id:asc"),
            ("limit", "100"),
        ]))
        .expect("query");
        let (rows, _) = catalog.list(&query);
        for pair in rows.windows(2) {
            assert!(
                pair[0].year > pair[1].year
                    || (pair[0].year == pair[1].year && pair[0].id < pair[1].id)
            );
        }
    }
}

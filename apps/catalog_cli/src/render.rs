use std::fmt::Write as _;

use client_core::TableSnapshot;
use shared::{
    domain::MovieSummary,
    query::{serialize_sort, SortOrder},
};

const TITLE_WIDTH: usize = 28;

pub fn render_snapshot(snapshot: &TableSnapshot<MovieSummary>) -> String {
    let mut out = String::new();

    if let Some(error) = &snapshot.error {
        let _ = writeln!(out, "error: {error} (type 'refresh' to try again)");
        if snapshot.data.is_empty() {
            return out;
        }
    }

    if snapshot.data.is_empty() {
        out.push_str("no movies match\n");
    } else {
        let header = |label: &str, field: &str| match snapshot.query.sort_order_of(field) {
            Some(SortOrder::Asc) => format!("{label}^"),
            Some(SortOrder::Desc) => format!("{label}v"),
            None => label.to_string(),
        };
        let _ = writeln!(
            out,
            "{:>5}  {:<TITLE_WIDTH$}  {:<12}  {:>5}  {:>6}",
            header("ID", "id"),
            header("TITLE", "title"),
            header("GENRE", "genre"),
            header("YEAR", "year"),
            header("RATING", "rating")
        );
        for movie in &snapshot.data {
            let _ = writeln!(
                out,
                "{:>5}  {:<TITLE_WIDTH$}  {:<12}  {:>5}  {:>6.1}",
                movie.id.0,
                truncate(&movie.title, TITLE_WIDTH),
                movie.genre,
                movie.year,
                movie.rating
            );
        }
    }

    let meta = &snapshot.meta;
    let _ = write!(
        out,
        "page {}/{} ({} total, {} per page)",
        meta.page, meta.total_pages, meta.total, meta.limit
    );
    if let Some(sort) = serialize_sort(&snapshot.query.sort_rules) {
        let _ = write!(out, " sort={sort}");
    }
    for (key, value) in &snapshot.query.filters {
        if let Some(value) = value.as_ref().filter(|value| !value.is_blank()) {
            let _ = write!(out, " {key}={value}");
        }
    }
    out.push('\n');
    out
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut short: String = text.chars().take(width.saturating_sub(1)).collect();
    short.push('~');
    short
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use client_core::{QueryState, TableError};
    use shared::{
        domain::MovieId,
        protocol::PageMeta,
        query::SortRule,
    };

    use super::*;

    fn movie(id: i64, title: &str) -> MovieSummary {
        MovieSummary {
            id: MovieId(id),
            title: title.to_string(),
            genre: "drama".into(),
            year: 1999,
            rating: 7.25,
            added_at: DateTime::<Utc>::default(),
        }
    }

    fn snapshot(data: Vec<MovieSummary>, error: Option<TableError>) -> TableSnapshot<MovieSummary> {
        TableSnapshot {
            data,
            meta: PageMeta::for_total(2, 10, 12),
            is_loading: false,
            error,
            query: QueryState::new(10)
                .with_page(2)
                .with_sort(SortRule::desc("year"))
                .with_filter("genre", "drama")
                .with_filter("title", ""),
            generation: 3,
        }
    }

    #[test]
    fn renders_rows_and_query_summary() {
        let text = render_snapshot(&snapshot(vec![movie(11, "Silent Harbor")], None));
        assert!(text.contains("Silent Harbor"));
        assert!(text.contains(" YEARv "));
        assert!(text.contains(" TITLE "));
        assert!(text.contains("   11"));
        assert!(text.contains("7.2") || text.contains("7.3"));
        assert!(text.ends_with("page 2/2 (12 total, 10 per page) sort=year:desc genre=drama\n"));
    }

    #[test]
    fn error_without_rows_prints_only_the_error() {
        let text = render_snapshot(&snapshot(
            Vec::new(),
            Some(TableError::Remote("unknown sort field 'x'".into())),
        ));
        assert_eq!(
            text,
            "error: remote failure: unknown sort field 'x' (type 'refresh' to try again)\n"
        );
    }

    #[test]
    fn empty_result_is_distinguished_from_error() {
        let text = render_snapshot(&snapshot(Vec::new(), None));
        assert!(text.starts_with("no movies match\n"));
    }

    #[test]
    fn long_titles_are_truncated() {
        assert_eq!(truncate("abcdef", 4), "abc~");
        assert_eq!(truncate("abc", 4), "abc");
    }
}

//! Line-mode commands accepted by the interactive session.

use anyhow::{anyhow, bail, Result};
use shared::query::FilterValue;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Page(u32),
    Next,
    Prev,
    Limit(u32),
    Sort(String),
    Filter { key: String, value: FilterValue },
    Clear,
    Search(String),
    Refresh,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  page N          jump to page N
  next | prev     move one page
  limit N         rows per page (back to page 1)
  sort FIELD      sort by FIELD, again to flip the order
  filter K=V      set a filter (empty V clears it)
  clear           drop every filter
  search TEXT     search-as-you-type on titles and genres
  refresh         fetch the current page again
  quit";

pub fn parse_command(line: &str) -> Result<Command> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "page" => Command::Page(parse_count("page", rest)?),
        "next" | "n" => Command::Next,
        "prev" | "p" => Command::Prev,
        "limit" => Command::Limit(parse_count("limit", rest)?),
        "sort" => {
            if rest.is_empty() {
                bail!("usage: sort FIELD");
            }
            Command::Sort(rest.to_string())
        }
        "filter" => {
            let (key, value) = parse_filter(rest)?;
            Command::Filter { key, value }
        }
        "clear" => Command::Clear,
        // Searching for an empty string clears the search filter.
        "search" | "/" => Command::Search(rest.to_string()),
        "refresh" | "r" => Command::Refresh,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        "" => bail!("empty command; type 'help'"),
        other => bail!("unknown command '{other}'; type 'help'"),
    };
    Ok(command)
}

fn parse_count(name: &str, raw: &str) -> Result<u32> {
    match raw.parse::<u32>() {
        Ok(value) if value >= 1 => Ok(value),
        _ => Err(anyhow!("usage: {name} N (N >= 1)")),
    }
}

/// `key=value`; integers become numeric filters, anything else stays text.
pub fn parse_filter(raw: &str) -> Result<(String, FilterValue)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("filters look like key=value, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        bail!("filter key must not be empty");
    }
    Ok((key.to_string(), filter_value(value.trim())))
}

fn filter_value(raw: &str) -> FilterValue {
    match raw.parse::<i64>() {
        Ok(number) => FilterValue::Integer(number),
        Err(_) => FilterValue::Text(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_navigation_commands() {
        assert_eq!(parse_command("page 3").expect("page"), Command::Page(3));
        assert_eq!(parse_command("  next ").expect("next"), Command::Next);
        assert_eq!(parse_command("LIMIT 25").expect("limit"), Command::Limit(25));
        assert!(parse_command("page 0").is_err());
        assert!(parse_command("page two").is_err());
    }

    #[test]
    fn parses_filters_with_typed_values() {
        assert_eq!(
            parse_command("filter year=1999").expect("filter"),
            Command::Filter {
                key: "year".into(),
                value: FilterValue::Integer(1999),
            }
        );
        assert_eq!(
            parse_command("filter genre = sci-fi").expect("filter"),
            Command::Filter {
                key: "genre".into(),
                value: FilterValue::from("sci-fi"),
            }
        );
        assert_eq!(
            parse_filter("title=").expect("clear"),
            ("title".to_string(), FilterValue::from(""))
        );
        assert!(parse_filter("=x").is_err());
        assert!(parse_filter("genre").is_err());
    }

    #[test]
    fn search_keeps_inner_spaces_and_allows_empty() {
        assert_eq!(
            parse_command("search silent harbor").expect("search"),
            Command::Search("silent harbor".into())
        );
        assert_eq!(parse_command("search").expect("search"), Command::Search(String::new()));
    }

    #[test]
    fn rejects_unknown_and_empty_input() {
        assert!(parse_command("").is_err());
        assert!(parse_command("dance").is_err());
        assert!(parse_command("sort").is_err());
    }
}

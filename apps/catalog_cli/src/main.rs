use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use clap::Parser;
use client_core::{
    DebouncedFilterBinding, HttpPageSource, QueryState, RemoteTableController, TableOptions,
};
use shared::{domain::MovieSummary, protocol::PageMeta, query::parse_sort};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod commands;
mod render;
mod settings;

use commands::{parse_command, parse_filter, Command, HELP};
use render::render_snapshot;
use settings::{load_settings, Settings};

const SEARCH_FILTER: &str = "q";

#[derive(Parser, Debug)]
#[command(about = "Browse the movie catalogue as a paginated table")]
struct Args {
    /// Overrides `server_url` from the settings file.
    #[arg(long)]
    server_url: Option<String>,
    /// Settings file; defaults to ./catalog.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    page: Option<u32>,
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    limit: Option<u32>,
    /// FIELD[:asc|desc], comma separated.
    #[arg(long)]
    sort: Option<String>,
    #[arg(long = "filter", value_name = "KEY=VALUE")]
    filters: Vec<String>,
    #[arg(long)]
    keep_data_on_error: bool,
    #[arg(long, short)]
    interactive: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let settings = load_settings(args.config.as_deref())?;
    let server_url = args
        .server_url
        .clone()
        .unwrap_or_else(|| settings.server_url.clone());
    let source = HttpPageSource::<MovieSummary>::new(&server_url, &settings.listing_path)?;
    info!(endpoint = %source.endpoint(), "browsing catalogue");

    let options = TableOptions::with_initial(initial_query(&args, &settings)?)
        .keep_data_on_error(args.keep_data_on_error || settings.keep_data_on_error);
    let controller = RemoteTableController::with_source(source, options);

    if args.interactive {
        run_interactive(controller, settings.debounce).await
    } else {
        run_once(controller).await
    }
}

fn initial_query(args: &Args, settings: &Settings) -> Result<QueryState> {
    let mut query = QueryState::new(args.limit.unwrap_or(settings.page_size));
    if let Some(page) = args.page {
        query = query.with_page(page);
    }
    if let Some(sort) = &args.sort {
        query.sort_rules = parse_sort(sort).context("invalid --sort")?;
    }
    for raw in &args.filters {
        let (key, value) = parse_filter(raw)?;
        query = query.with_filter(key, value);
    }
    Ok(query)
}

async fn run_once(controller: RemoteTableController<MovieSummary>) -> Result<()> {
    controller.load();
    let snapshot = controller.settled().await;
    if let Some(error) = snapshot.error {
        if error.is_transport() {
            bail!(
                "could not load the catalogue: {} (is catalog_server running?)",
                error.message()
            );
        }
        bail!("the catalogue rejected the query: {}", error.message());
    }
    print!("{}", render_snapshot(&snapshot));
    Ok(())
}

fn current_meta(controller: &RemoteTableController<MovieSummary>) -> PageMeta {
    PageMeta {
        page: controller.query_params().page,
        ..controller.snapshot().meta
    }
}

async fn run_interactive(
    controller: RemoteTableController<MovieSummary>,
    debounce: Duration,
) -> Result<()> {
    let search = DebouncedFilterBinding::new(Arc::new(controller.clone()), SEARCH_FILTER, debounce);

    let mut updates = controller.subscribe();
    let view = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let snapshot = updates.borrow_and_update().clone();
            if !snapshot.is_loading {
                print!("{}", render_snapshot(&snapshot));
            }
        }
    });

    println!("{HELP}");
    controller.load();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(err) => {
                eprintln!("{err}");
                continue;
            }
        };

        match command {
            Command::Page(page) => controller.set_page(page),
            Command::Next => {
                let meta = current_meta(&controller);
                if meta.has_next_page() {
                    controller.set_page(meta.page + 1);
                } else {
                    eprintln!("already on the last page");
                }
            }
            Command::Prev => {
                let meta = current_meta(&controller);
                if meta.has_prev_page() {
                    controller.set_page(meta.page - 1);
                } else {
                    eprintln!("already on the first page");
                }
            }
            Command::Limit(limit) => controller.set_limit(limit),
            Command::Sort(field) => controller.toggle_sort(&field),
            Command::Filter { key, value } => controller.set_filter(key, Some(value)),
            Command::Clear => {
                search.cancel();
                controller.clear_filters();
            }
            Command::Search(text) => search.on_input(text),
            Command::Refresh => controller.refetch(),
            Command::Help => println!("{HELP}"),
            Command::Quit => break,
        }
    }

    search.cancel();
    view.abort();
    Ok(())
}

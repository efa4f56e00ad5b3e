use anyhow::Context;
use feed_ranking::{
    items_from_rows, Config, FeedRankingEngine, RankOptions, ViewerContext,
};
use serde::Deserialize;
use std::io::{self, Read, Write};
use tracing::{error, info, info_span};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

/// One ranking request read from stdin.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RankRequest {
    // Raw rows, decoded one by one so a bad row only costs itself
    #[serde(default)]
    items: Vec<serde_json::Value>,
    #[serde(default)]
    viewer: ViewerContext,
    #[serde(default)]
    options: Option<RequestOptions>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestOptions {
    page_size: Option<u32>,
    cursor: Option<String>,
    diversity_window: Option<u32>,
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing; stdout carries the response
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env().context("Failed to load config")?;

    let correlation_id = Uuid::new_v4().to_string();
    let span = info_span!("rank_request", correlation_id = %correlation_id);
    let _guard = span.enter();

    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read request from stdin")?;
    let request: RankRequest =
        serde_json::from_str(&input).context("Request is not a valid ranking document")?;

    let row_count = request.items.len();
    let items = items_from_rows(request.items);
    info!(
        rows = row_count,
        items = items.len(),
        "Loaded content pool"
    );

    let requested = request.options.unwrap_or_default();
    let options = RankOptions {
        page_size: requested.page_size.unwrap_or(config.defaults.page_size),
        cursor: requested.cursor,
        diversity_window: requested
            .diversity_window
            .unwrap_or(config.defaults.diversity_window),
    };

    let engine = FeedRankingEngine::new(config.ranking);
    let page = engine
        .rank(items, &request.viewer, &options)
        .map_err(|e| {
            error!("Ranking failed: {}", e);
            e
        })?;

    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &page).context("Failed to write response")?;
    writeln!(stdout)?;

    Ok(())
}

//! Content and URL pipelines, plus the read → transform → write stage runners.

use std::path::Path;

use tracing::{info, warn};

use crate::dedup::{deduplicate, drop_nulls, DedupKey};
use crate::error::Result;
use crate::mask::{choose_prefix, mask_all, PrefixSelector};
use crate::metrics::StageTracker;
use crate::table::{Cell, Table};
use crate::text::{canonicalize_url, extract_all, recombine, StripPolicy};
use crate::xlsx;

pub const CONTENT_COLUMN: &str = "content";
pub const URL_COLUMN: &str = "url";

/// Normalizes a `content` column: extract URLs, recombine, mask, dedup.
#[derive(Debug, Clone)]
pub struct ContentPipeline {
    prefix: String,
    policy: StripPolicy,
}

impl ContentPipeline {
    pub fn new(prefix: impl Into<String>, policy: StripPolicy) -> Self {
        ContentPipeline {
            prefix: prefix.into(),
            policy,
        }
    }

    /// Picks the batch prefix once through `selector`.
    pub fn with_selector<S: PrefixSelector + ?Sized>(
        prefixes: &[String],
        selector: &mut S,
        policy: StripPolicy,
    ) -> Result<Self> {
        let prefix = choose_prefix(prefixes, selector)?;
        Ok(ContentPipeline::new(prefix, policy))
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn run(&self, input: &Table, tracker: &mut StageTracker) -> Result<Table> {
        let raw = input.select(CONTENT_COLUMN)?;
        let total = raw.len();

        let raw = deduplicate(raw, DedupKey::FullRow)?;
        tracker.record("dedup_raw", total, raw.len());

        let texts: Vec<String> = raw
            .column(CONTENT_COLUMN)?
            .into_iter()
            .filter_map(Cell::as_string)
            .collect();
        let (contents, urls) = extract_all(texts.iter().map(String::as_str), self.policy);
        let combined: Vec<String> = contents
            .into_iter()
            .zip(urls)
            .map(|(content, url)| recombine(&content, &url))
            .collect();
        tracker.record("extract_urls", texts.len(), combined.len());

        let masked = mask_all(combined.iter().map(String::as_str), &self.prefix);
        tracker.record("mask_prefix", combined.len(), masked.len());

        let before = masked.len();
        let out = Table::single_column(CONTENT_COLUMN, masked.into_iter().map(Cell::Text));
        let out = deduplicate(out, DedupKey::FullRow)?;
        tracker.record("dedup_masked", before, out.len());
        Ok(out)
    }
}

/// Canonicalizes a `url` column and removes duplicates.
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlPipeline;

impl UrlPipeline {
    pub fn run(&self, input: &Table, tracker: &mut StageTracker) -> Result<Table> {
        let raw = input.select(URL_COLUMN)?;
        let total = raw.len();

        let present = drop_nulls(raw, DedupKey::Column(URL_COLUMN))?;
        tracker.record("drop_nulls", total, present.len());

        let before = present.len();
        let canonical = present.map_column(URL_COLUMN, |cell| match cell.as_string() {
            Some(url) => Cell::Text(canonicalize_url(&url).to_string()),
            None => Cell::Empty,
        })?;
        let canonical = deduplicate(canonical, DedupKey::Column(URL_COLUMN))?;
        tracker.record("dedup_canonical", before, canonical.len());

        let before = canonical.len();
        let out = deduplicate(canonical, DedupKey::FullRow)?;
        tracker.record("dedup_rows", before, out.len());
        Ok(out)
    }
}

/// Non-empty `content` cells as strings, in row order.
pub fn content_rows(table: &Table) -> Result<Vec<String>> {
    let present = drop_nulls(table.select(CONTENT_COLUMN)?, DedupKey::FullRow)?;
    Ok(present
        .column(CONTENT_COLUMN)?
        .into_iter()
        .filter_map(Cell::as_string)
        .collect())
}

/// Reads `input`, runs the content pipeline and writes `output`. Nothing is
/// written when any step fails.
pub fn run_content_stage(
    pipeline: &ContentPipeline,
    input: &Path,
    output: &Path,
) -> Result<Table> {
    let mut tracker = StageTracker::new("content");
    let table = xlsx::read_table(input)?;
    info!(origin = table.origin(), rows = table.len(), prefix = pipeline.prefix(), "content sheet loaded");
    let out = pipeline.run(&table, &mut tracker)?;
    if out.is_empty() {
        warn!(origin = table.origin(), "no content rows survived normalization");
    }
    xlsx::write_table(output, &out)?;
    info!(path = ?output, rows = out.len(), removed = tracker.total_removed(), "content sheet written");
    Ok(out)
}

/// Reads `input`, runs the URL pipeline and writes `output`. Nothing is
/// written when any step fails.
pub fn run_url_stage(input: &Path, output: &Path) -> Result<Table> {
    let mut tracker = StageTracker::new("urls");
    let table = xlsx::read_table(input)?;
    info!(origin = table.origin(), rows = table.len(), "url sheet loaded");
    let out = UrlPipeline.run(&table, &mut tracker)?;
    if out.is_empty() {
        warn!(origin = table.origin(), "no urls survived normalization");
    }
    xlsx::write_table(output, &out)?;
    info!(path = ?output, rows = out.len(), removed = tracker.total_removed(), "url sheet written");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::FixedSelector;

    const SALE: &str = "SIÊU SALE!!!";

    fn content_table(values: &[Option<&str>]) -> Table {
        Table::single_column(
            CONTENT_COLUMN,
            values.iter().map(|v| v.map(Cell::text).unwrap_or(Cell::Empty)),
        )
    }

    fn strings(table: &Table) -> Vec<String> {
        table.rows().iter().map(|r| r[0].to_string()).collect()
    }

    #[test]
    fn content_pipeline_normalizes_and_masks() {
        let input = content_table(&[
            Some("Buy now http://x.com/a?b=1 great deal"),
            None,
            Some("Xem ngay hàng mới"),
            Some("Buy now http://x.com/a?b=1 great deal"),
            Some("plain text"),
        ]);
        let pipeline = ContentPipeline::new(SALE, StripPolicy::AllMatches);
        let mut tracker = StageTracker::new("content");
        let out = pipeline.run(&input, &mut tracker).unwrap();
        assert_eq!(out.columns(), &[CONTENT_COLUMN.to_string()]);
        assert_eq!(
            strings(&out),
            [
                "SIÊU SALE!!!Buy now great deal\nhttp://x.com/a?b=1",
                "SIÊU SALE!!! hàng mới",
                "SIÊU SALE!!!plain text",
            ]
        );
        assert_eq!(tracker.steps()[0].removed(), 2);
    }

    #[test]
    fn dedup_after_mask_merges_sentinel_and_prefixed_rows() {
        let input = content_table(&[Some("Xem ngay deal"), Some("SIÊU SALE!!! deal")]);
        let pipeline = ContentPipeline::new(SALE, StripPolicy::AllMatches);
        let out = pipeline.run(&input, &mut StageTracker::new("content")).unwrap();
        assert_eq!(strings(&out), ["SIÊU SALE!!! deal"]);
    }

    #[test]
    fn content_pipeline_requires_column() {
        let input = Table::single_column("text", [Cell::text("x")]);
        let pipeline = ContentPipeline::new(SALE, StripPolicy::AllMatches);
        let err = pipeline.run(&input, &mut StageTracker::new("content")).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn with_selector_uses_injected_choice() {
        let prefixes = vec!["A!".to_string(), SALE.to_string()];
        let pipeline =
            ContentPipeline::with_selector(&prefixes, &mut FixedSelector(1), StripPolicy::AllMatches)
                .unwrap();
        assert_eq!(pipeline.prefix(), SALE);
    }

    #[test]
    fn numeric_content_cells_are_stringified() {
        let input = Table::single_column(CONTENT_COLUMN, [Cell::Number(2024.0)]);
        let pipeline = ContentPipeline::new("P:", StripPolicy::AllMatches);
        let out = pipeline.run(&input, &mut StageTracker::new("content")).unwrap();
        assert_eq!(strings(&out), ["P:2024"]);
    }

    #[test]
    fn content_rows_skip_empty_cells() {
        let table = content_table(&[Some("a"), None, Some("a"), Some("b")]);
        assert_eq!(content_rows(&table).unwrap(), ["a", "a", "b"]);
    }

    #[test]
    fn url_pipeline_canonicalizes_and_dedups() {
        let mut input = Table::new(vec!["name".into(), URL_COLUMN.into()]);
        input.push_row(vec![Cell::text("a"), Cell::text("http://x.com/a?b=1")]);
        input.push_row(vec![Cell::text("b"), Cell::Empty]);
        input.push_row(vec![Cell::text("c"), Cell::text("http://x.com/b")]);
        input.push_row(vec![Cell::text("d"), Cell::text("http://x.com/a?c=2")]);
        input.push_row(vec![Cell::text("e"), Cell::text("http://x.com/a")]);
        let mut tracker = StageTracker::new("urls");
        let out = UrlPipeline.run(&input, &mut tracker).unwrap();
        assert_eq!(out.columns(), &[URL_COLUMN.to_string()]);
        assert_eq!(strings(&out), ["http://x.com/a", "http://x.com/b"]);
        assert_eq!(tracker.total_removed(), 3);
    }

    #[test]
    fn url_stage_without_column_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("urls.xlsx");
        let output = dir.path().join("urls_clean.xlsx");
        let table = Table::single_column("link", [Cell::text("http://x.com")]);
        xlsx::write_table(&input, &table).unwrap();

        let err = run_url_stage(&input, &output).unwrap_err();
        assert!(err.is_configuration());
        assert!(!output.exists());
    }

    #[test]
    fn unreadable_input_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = ContentPipeline::new(SALE, StripPolicy::AllMatches);
        let err = run_content_stage(
            &pipeline,
            &dir.path().join("missing.xlsx"),
            &dir.path().join("out.xlsx"),
        )
        .unwrap_err();
        assert!(err.is_io());
    }

    #[test]
    fn content_stage_round_trips_through_files() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.xlsx");
        let output = dir.path().join("contents.xlsx");
        xlsx::write_table(
            &input,
            &content_table(&[Some("Xem ngay áo mới https://shop.vn/p?id=1")]),
        )
        .unwrap();

        let pipeline = ContentPipeline::new(SALE, StripPolicy::AllMatches);
        run_content_stage(&pipeline, &input, &output).unwrap();

        let written = xlsx::read_table(&output).unwrap();
        assert_eq!(
            strings(&written),
            ["SIÊU SALE!!! áo mới\nhttps://shop.vn/p?id=1"]
        );
    }
}

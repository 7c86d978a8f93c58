use anyhow::{Context, Result};
use std::path::Path;

use crate::domain::eval::{band_percentage, EvaluationRecord, ScoreBand, PASS_SCORE};

fn average_line(record: &EvaluationRecord) -> String {
    match record.average_score() {
        Some(avg) => format!("{:.1} ({})", avg, ScoreBand::classify(avg).label()),
        None => "n/a".to_string(),
    }
}

fn pass_mark(score: f64) -> &'static str {
    if score >= PASS_SCORE {
        "yes"
    } else {
        "no"
    }
}

/// Render the markdown evaluation report for one record.
pub fn render_report_md(record: &EvaluationRecord) -> String {
    let summary = &record.summary;
    let mut out = String::new();
    out.push_str(&format!("# Evaluation Report: {}\n\n", record.version));
    out.push_str(&format!(
        "- run: `{}`\n- evaluated at: {}\n- content digest: `{}`\n- fixtures: {}\n- average score: {}\n\n",
        record.run_id,
        record.evaluated_at.to_rfc3339(),
        record.content_digest.short(),
        summary.total_fixtures,
        average_line(record),
    ));

    out.push_str("## Distribution\n");
    for band in ScoreBand::ALL {
        out.push_str(&format!(
            "- {} ({}): {} ({:.1}%)\n",
            band.label(),
            band.range_label(),
            summary.distribution.get(band),
            band_percentage(&summary.distribution, band, summary.total_fixtures),
        ));
    }

    if !summary.results.is_empty() {
        out.push_str("\n## Fixtures\n");
        out.push_str("| Fixture | Category | Score | Keywords | Pass |\n");
        out.push_str("|---|---|---|---|---|\n");
        for r in &summary.results {
            out.push_str(&format!(
                "| {} | {} | {:.1} | {}/{} | {} |\n",
                r.fixture_id,
                r.category,
                r.score,
                r.keywords_found,
                r.keywords_total,
                pass_mark(r.score),
            ));
        }
    }
    out
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render a standalone HTML document with the same content as the markdown
/// report. Every value taken from the record is escaped.
pub fn render_report_html(record: &EvaluationRecord) -> String {
    let summary = &record.summary;
    let title = escape_html(&format!("Evaluation Report: {}", record.version));
    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str(&format!("<title>{}</title>\n</head>\n<body>\n", title));
    out.push_str(&format!("<h1>{}</h1>\n", title));

    out.push_str("<ul>\n");
    out.push_str(&format!("<li>run: <code>{}</code></li>\n", record.run_id));
    out.push_str(&format!(
        "<li>evaluated at: {}</li>\n",
        record.evaluated_at.to_rfc3339()
    ));
    out.push_str(&format!(
        "<li>content digest: <code>{}</code></li>\n",
        escape_html(record.content_digest.short())
    ));
    out.push_str(&format!("<li>fixtures: {}</li>\n", summary.total_fixtures));
    out.push_str(&format!(
        "<li>average score: {}</li>\n</ul>\n",
        escape_html(&average_line(record))
    ));

    out.push_str("<h2>Distribution</h2>\n<table>\n<tr><th>Band</th><th>Range</th><th>Count</th><th>Share</th></tr>\n");
    for band in ScoreBand::ALL {
        out.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{:.1}%</td></tr>\n",
            band.label(),
            band.range_label(),
            summary.distribution.get(band),
            band_percentage(&summary.distribution, band, summary.total_fixtures),
        ));
    }
    out.push_str("</table>\n");

    if !summary.results.is_empty() {
        out.push_str("<h2>Fixtures</h2>\n<table>\n<tr><th>Fixture</th><th>Input</th><th>Category</th><th>Score</th><th>Keywords</th><th>Pass</th></tr>\n");
        for r in &summary.results {
            out.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{:.1}</td><td>{}/{}</td><td>{}</td></tr>\n",
                escape_html(&r.fixture_id),
                escape_html(&r.input),
                escape_html(&r.category),
                r.score,
                r.keywords_found,
                r.keywords_total,
                pass_mark(r.score),
            ));
        }
        out.push_str("</table>\n");
    }
    out.push_str("</body>\n</html>\n");
    out
}

/// Write the record as pretty JSON.
pub fn write_report_json(path: &Path, record: &EvaluationRecord) -> Result<()> {
    let content = serde_json::to_string_pretty(record).context("serialize evaluation record")?;
    std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

pub fn write_report_md(path: &Path, record: &EvaluationRecord) -> Result<()> {
    let md = render_report_md(record);
    std::fs::write(path, md).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

pub fn write_report_html(path: &Path, record: &EvaluationRecord) -> Result<()> {
    let html = render_report_html(record);
    std::fs::write(path, html).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

/// Write `<version>.json`, `<version>.md` and `<version>.html` into `dir`,
/// creating it if needed.
pub fn write_report_bundle(dir: &Path, record: &EvaluationRecord) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("create {:?}", dir))?;
    let stem = record.version.as_str();
    write_report_json(&dir.join(format!("{}.json", stem)), record)?;
    write_report_md(&dir.join(format!("{}.md", stem)), record)?;
    write_report_html(&dir.join(format!("{}.html", stem)), record)?;
    Ok(())
}

use std::fmt::Write;

use crate::columns::ColumnKey;
use crate::poller::PollingController;
use crate::presenter::{SortDirection, TableView};

const MAX_CELL_WIDTH: usize = 40;

/// Plain-text rendition of a table view. Positive rows are prefixed with `+`,
/// negative rows with `-`.
pub fn render_table(view: &TableView) -> String {
    let mut out = String::new();

    if let Some(stamp) = &view.last_updated {
        let _ = writeln!(out, "Last updated: {stamp}");
    }

    let headers: Vec<String> = view
        .headers
        .iter()
        .map(|header| {
            let marker = match header.sort {
                Some(SortDirection::Ascending) => " ^",
                Some(SortDirection::Descending) => " v",
                None => "",
            };
            truncate(&format!("{}{marker}", header.label))
        })
        .collect();
    let rows: Vec<Vec<String>> = view
        .rows
        .iter()
        .map(|row| row.cells.iter().map(|cell| truncate(&cell.text)).collect())
        .collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(idx, header)| {
            rows.iter()
                .map(|cells| cells[idx].chars().count())
                .chain(std::iter::once(header.chars().count()))
                .max()
                .unwrap_or_default()
        })
        .collect();

    write_line(&mut out, ' ', &headers, &widths, view, false);
    let rule: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
    let _ = writeln!(out, "  {}", rule.join("-+-"));

    for (row, cells) in view.rows.iter().zip(&rows) {
        let marker = match row.class {
            Some("positive-row") => '+',
            Some("negative-row") => '-',
            _ => ' ',
        };
        write_line(&mut out, marker, cells, &widths, view, true);
    }

    if view.rows.is_empty() {
        let _ = writeln!(out, "  (no rows)");
    }
    let _ = writeln!(out, "{} of {} symbols", view.rows.len(), view.total_rows);
    out
}

fn write_line(
    out: &mut String,
    marker: char,
    cells: &[String],
    widths: &[usize],
    view: &TableView,
    align_numbers: bool,
) {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .zip(&view.headers)
        .map(|((cell, width), header)| {
            if align_numbers && is_numeric(header.key) {
                format!("{cell:>width$}")
            } else {
                format!("{cell:<width$}")
            }
        })
        .collect();
    let _ = writeln!(out, "{marker} {}", padded.join(" | ").trim_end());
}

fn is_numeric(key: ColumnKey) -> bool {
    key.filter_match().is_none() && key != ColumnKey::CompanySummary
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_CELL_WIDTH {
        return text.to_string();
    }
    let mut short: String = text.chars().take(MAX_CELL_WIDTH - 3).collect();
    short.push_str("...");
    short
}

/// One-line refresh status shown above the table.
pub fn status_line(controller: &PollingController) -> String {
    let seq = controller.last_completed_seq().unwrap_or_default();
    match controller.last_error() {
        Some(err) if controller.is_stale() => {
            format!("fetch #{seq} failed ({err}); showing last good snapshot")
        }
        Some(err) => format!("fetch #{seq} failed ({err}); no data yet"),
        None => format!(
            "refresh #{}: {} rows",
            controller.refresh_count(),
            controller.snapshot().len()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::build_columns;
    use crate::preferences::VisibleColumns;
    use crate::presenter::{present, TableQuery};
    use crate::snapshot::decode_snapshot;

    fn view(body: &str, keys: &[ColumnKey]) -> TableView {
        let snapshot = decode_snapshot(body.as_bytes()).expect("snapshot");
        let columns = build_columns(snapshot.rows());
        present(
            &snapshot,
            &columns,
            &VisibleColumns::from_keys(keys.iter().copied()),
            &TableQuery::default(),
        )
    }

    #[test]
    fn renders_banner_markers_and_alignment() {
        let text = render_table(&view(
            r#"[{"Symbol":"AAA","Current Price":100,"Row Color":"positive-row","Last Updated":"2024-07-01"},
                {"Symbol":"BBB","Current Price":5.5,"Row Color":"negative-row","Last Updated":"2024-07-01"}]"#,
            &[ColumnKey::Symbol, ColumnKey::CurrentPrice],
        ));

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Last updated: 2024-07-01");
        assert!(lines[1].contains("Symbol | Current Price"));
        assert!(lines.iter().any(|line| line.starts_with("+ AAA")));
        assert!(lines.iter().any(|line| line.starts_with("- BBB") && line.ends_with("  5.50")));
        assert_eq!(lines.last().copied(), Some("2 of 2 symbols"));
    }

    #[test]
    fn empty_table_has_no_banner() {
        let text = render_table(&view("[]", &[ColumnKey::Symbol]));
        assert!(!text.contains("Last updated"));
        assert!(text.contains("(no rows)"));
    }

    #[test]
    fn status_line_numbers_each_failed_fetch() {
        use crate::error::FetchError;
        use crate::poller::PollConfig;

        let (mut controller, first) = PollingController::start(PollConfig::default());
        controller.complete(first, Err(FetchError::Transport("refused".into())));
        assert_eq!(
            status_line(&controller),
            "fetch #1 failed (transport error: refused); no data yet"
        );

        let second = controller.begin_fetch().expect("second ticket");
        controller.complete(second, Ok(decode_snapshot(br#"[{"Symbol":"AAA"}]"#).expect("snapshot")));
        assert_eq!(status_line(&controller), "refresh #1: 1 rows");

        for _ in 0..2 {
            let ticket = controller.begin_fetch().expect("ticket");
            controller.complete(ticket, Err(FetchError::Transport("503".into())));
        }
        assert_eq!(
            status_line(&controller),
            "fetch #4 failed (transport error: 503); showing last good snapshot"
        );
    }

    #[test]
    fn long_text_is_truncated() {
        let long = "x".repeat(100);
        assert_eq!(truncate(&long).chars().count(), MAX_CELL_WIDTH);
        assert!(truncate(&long).ends_with("..."));
    }
}

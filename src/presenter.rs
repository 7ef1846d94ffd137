use std::collections::{BTreeMap, BTreeSet};

use crate::columns::{descriptor, Cell, ColumnDescriptor, ColumnKey, FilterOption};
use crate::preferences::VisibleColumns;
use crate::snapshot::Snapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SortSpec {
    pub key: ColumnKey,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn ascending(key: ColumnKey) -> Self {
        Self {
            key,
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(key: ColumnKey) -> Self {
        Self {
            key,
            direction: SortDirection::Descending,
        }
    }
}

/// Applied when the user has not picked a sort.
pub const DEFAULT_SORT: SortSpec = SortSpec {
    key: ColumnKey::VsAverageVolume,
    direction: SortDirection::Descending,
};

/// Header click behaviour: ascending, descending, then back to unsorted.
pub fn cycle_sort(current: Option<SortSpec>, key: ColumnKey) -> Option<SortSpec> {
    match current {
        Some(spec) if spec.key == key => match spec.direction {
            SortDirection::Ascending => Some(SortSpec::descending(key)),
            SortDirection::Descending => None,
        },
        _ => Some(SortSpec::ascending(key)),
    }
}

/// User-controlled sort and filter selections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableQuery {
    pub sort: Option<SortSpec>,
    pub filters: BTreeMap<ColumnKey, BTreeSet<String>>,
}

impl TableQuery {
    pub fn effective_sort(&self) -> SortSpec {
        self.sort.unwrap_or(DEFAULT_SORT)
    }

    pub fn set_filter<I>(&mut self, key: ColumnKey, values: I)
    where
        I: IntoIterator<Item = String>,
    {
        let values: BTreeSet<String> = values.into_iter().collect();
        if values.is_empty() {
            self.filters.remove(&key);
        } else {
            self.filters.insert(key, values);
        }
    }

    pub fn toggle_filter_value(&mut self, key: ColumnKey, value: &str) {
        let selected = self.filters.entry(key).or_default();
        if !selected.remove(value) {
            selected.insert(value.to_string());
        }
        if selected.is_empty() {
            self.filters.remove(&key);
        }
    }

    pub fn is_selected(&self, key: ColumnKey, value: &str) -> bool {
        self.filters
            .get(&key)
            .is_some_and(|selected| selected.contains(value))
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderView {
    pub key: ColumnKey,
    pub label: &'static str,
    pub sort: Option<SortDirection>,
    pub filter_options: Vec<FilterOption>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowView {
    pub symbol: String,
    pub class: Option<&'static str>,
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableView {
    pub headers: Vec<HeaderView>,
    pub rows: Vec<RowView>,
    pub last_updated: Option<String>,
    pub total_rows: usize,
}

/// Compose the displayed table. Filters on hidden columns are ignored; the
/// sort applies whether or not its column is visible.
pub fn present(
    snapshot: &Snapshot,
    columns: &[ColumnDescriptor],
    visible: &VisibleColumns,
    query: &TableQuery,
) -> TableView {
    let shown = visible.filter(columns);
    let sort = query.effective_sort();

    let active_filters: Vec<(&ColumnDescriptor, &BTreeSet<String>)> = shown
        .iter()
        .filter_map(|column| query.filters.get(&column.key).map(|values| (*column, values)))
        .collect();

    let mut rows: Vec<_> = snapshot
        .rows()
        .iter()
        .filter(|row| {
            active_filters
                .iter()
                .all(|(column, values)| column.matches_any(row, values))
        })
        .collect();

    if let Some(column) = descriptor(columns, sort.key) {
        rows.sort_by(|a, b| {
            let ordering = column.compare(a, b);
            match sort.direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            }
        });
    }

    let headers = shown
        .iter()
        .map(|column| HeaderView {
            key: column.key,
            label: column.label,
            sort: (column.key == sort.key).then_some(sort.direction),
            filter_options: column
                .filter
                .as_ref()
                .map(|filter| filter.options.clone())
                .unwrap_or_default(),
        })
        .collect();

    let rows = rows
        .into_iter()
        .map(|row| RowView {
            symbol: row.symbol.clone(),
            class: row.tone.css_class(),
            cells: shown.iter().map(|column| column.render(row)).collect(),
        })
        .collect();

    TableView {
        headers,
        rows,
        last_updated: snapshot.last_updated().map(str::to_string),
        total_rows: snapshot.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::build_columns;
    use crate::snapshot::decode_snapshot;

    fn snapshot(body: &str) -> Snapshot {
        decode_snapshot(body.as_bytes()).expect("snapshot")
    }

    fn render(snapshot: &Snapshot, visible: &VisibleColumns, query: &TableQuery) -> TableView {
        let columns = build_columns(snapshot.rows());
        present(snapshot, &columns, visible, query)
    }

    fn cell_text<'a>(view: &'a TableView, symbol: &str, key: ColumnKey) -> &'a str {
        let idx = view
            .headers
            .iter()
            .position(|header| header.key == key)
            .expect("visible column");
        let row = view
            .rows
            .iter()
            .find(|row| row.symbol == symbol)
            .expect("row present");
        &row.cells[idx].text
    }

    #[test]
    fn day_low_distance_renders_or_falls_back() {
        let snapshot = snapshot(
            r#"[{"Symbol":"AAA","Current Price":100,"Day Low":90},
                {"Symbol":"BBB","Current Price":50,"Day Low":0}]"#,
        );
        let view = render(&snapshot, &VisibleColumns::all(), &TableQuery::default());

        assert_eq!(cell_text(&view, "AAA", ColumnKey::DifferenceFromDayLow), "11.11%");
        assert_eq!(cell_text(&view, "BBB", ColumnKey::DifferenceFromDayLow), "N/A");
        assert!(view
            .rows
            .iter()
            .flat_map(|row| row.cells.iter())
            .all(|cell| !cell.text.contains("NaN") && !cell.text.contains("inf")));
    }

    #[test]
    fn row_colors_map_to_classes() {
        let snapshot = snapshot(
            r#"[{"Symbol":"UP","Row Color":"positive-row"},
                {"Symbol":"DOWN","Row Color":"negative-row"},
                {"Symbol":"FLAT","Row Color":"unknown"}]"#,
        );
        let view = render(&snapshot, &VisibleColumns::all(), &TableQuery::default());
        let class_of = |symbol: &str| {
            view.rows
                .iter()
                .find(|row| row.symbol == symbol)
                .and_then(|row| row.class)
        };

        assert_eq!(class_of("UP"), Some("positive-row"));
        assert_eq!(class_of("DOWN"), Some("negative-row"));
        assert_eq!(class_of("FLAT"), None);
    }

    #[test]
    fn symbol_filter_returns_single_row() {
        let snapshot = snapshot(
            r#"[{"Symbol":"AAA"},{"Symbol":"BBB"},{"Symbol":"XBBBX"}]"#,
        );
        let mut query = TableQuery::default();
        query.set_filter(ColumnKey::Symbol, ["BBB".to_string()]);
        let view = render(&snapshot, &VisibleColumns::all(), &query);

        let symbols: Vec<&str> = view.rows.iter().map(|row| row.symbol.as_str()).collect();
        assert_eq!(symbols, ["BBB"]);
        assert_eq!(view.total_rows, 3);
    }

    #[test]
    fn empty_snapshot_renders_nothing() {
        let view = render(&Snapshot::empty(), &VisibleColumns::all(), &TableQuery::default());
        assert!(view.rows.is_empty());
        assert_eq!(view.last_updated, None);
        assert_eq!(view.headers.len(), ColumnKey::ALL.len());
    }

    #[test]
    fn default_sort_is_volume_ratio_descending() {
        let snapshot = snapshot(
            r#"[{"Symbol":"LOW","VS Average Volume":0.8},
                {"Symbol":"NONE","VS Average Volume":"N/A"},
                {"Symbol":"HIGH","VS Average Volume":2.4}]"#,
        );
        let view = render(&snapshot, &VisibleColumns::all(), &TableQuery::default());
        let symbols: Vec<&str> = view.rows.iter().map(|row| row.symbol.as_str()).collect();

        assert_eq!(symbols, ["HIGH", "LOW", "NONE"]);
        let header = view
            .headers
            .iter()
            .find(|header| header.key == ColumnKey::VsAverageVolume)
            .expect("volume header");
        assert_eq!(header.sort, Some(SortDirection::Descending));
    }

    #[test]
    fn hidden_columns_keep_remaining_order() {
        let snapshot = snapshot(r#"[{"Symbol":"AAA"}]"#);
        let mut visible = VisibleColumns::all();
        visible.toggle(ColumnKey::Sector);
        let hidden = render(&snapshot, &visible, &TableQuery::default());
        let keys: Vec<ColumnKey> = hidden.headers.iter().map(|header| header.key).collect();
        let expected: Vec<ColumnKey> = ColumnKey::ALL
            .into_iter()
            .filter(|key| *key != ColumnKey::Sector)
            .collect();
        assert_eq!(keys, expected);

        visible.toggle(ColumnKey::Sector);
        let restored = render(&snapshot, &visible, &TableQuery::default());
        let keys: Vec<ColumnKey> = restored.headers.iter().map(|header| header.key).collect();
        assert_eq!(keys, ColumnKey::ALL.to_vec());
    }

    #[test]
    fn filters_on_hidden_columns_are_ignored() {
        let snapshot = snapshot(
            r#"[{"Symbol":"AAA","Sector":"Tech"},{"Symbol":"BBB","Sector":"Energy"}]"#,
        );
        let mut query = TableQuery::default();
        query.toggle_filter_value(ColumnKey::Sector, "Tech");
        let visible = VisibleColumns::from_keys([ColumnKey::Symbol]);

        assert_eq!(render(&snapshot, &visible, &query).rows.len(), 2);
        assert_eq!(
            render(&snapshot, &VisibleColumns::all(), &query).rows.len(),
            1
        );
    }

    #[test]
    fn sort_cycle_wraps_to_unsorted() {
        let first = cycle_sort(None, ColumnKey::Beta);
        assert_eq!(first, Some(SortSpec::ascending(ColumnKey::Beta)));
        let second = cycle_sort(first, ColumnKey::Beta);
        assert_eq!(second, Some(SortSpec::descending(ColumnKey::Beta)));
        assert_eq!(cycle_sort(second, ColumnKey::Beta), None);
        assert_eq!(
            cycle_sort(second, ColumnKey::Symbol),
            Some(SortSpec::ascending(ColumnKey::Symbol))
        );
    }

    #[test]
    fn toggling_filter_value_twice_clears_it() {
        let mut query = TableQuery::default();
        query.toggle_filter_value(ColumnKey::Sector, "Tech");
        assert!(query.is_selected(ColumnKey::Sector, "Tech"));
        query.toggle_filter_value(ColumnKey::Sector, "Tech");
        assert!(query.filters.is_empty());
    }
}

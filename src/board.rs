//! The board: owns every column, the highlight state and the global scale, and pushes
//! render results to a [`Surface`].
//!
//! Every structural change (load finished, column closed, selection cleared) recomputes
//! the global maximum over all columns before any column is rendered again.

use crate::error::{LoadError, PermalinkError};
use crate::highlight::{ColumnDecorations, HighlightMode, HighlightState};
use crate::loader::{load_all, Fetcher, LoadOutcome, LoadRequest};
use crate::permalink::{self, ColumnConfig, PermalinkState};
use crate::picker::{self, Picker};
use crate::render::{render, RenderInstruction};
use crate::scale::global_max;
use crate::sort::SortSpec;
use crate::store::{Column, ColumnId, ColumnStatus, ColumnStore};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Presentation collaborator driven by the board.
pub trait Surface {
    /// Replace a column's pane with a rendered table (or the empty placeholder).
    fn render_table(&mut self, column: &Column, instruction: &RenderInstruction);

    /// Replace a column's pane with a load diagnostic.
    fn render_error(&mut self, column: &Column, error: &LoadError);

    fn remove_column(&mut self, id: ColumnId);

    /// Apply highlight decorations to the column's last rendered table, replacing earlier ones.
    fn decorate(&mut self, id: ColumnId, decorations: &ColumnDecorations);

    /// Sync the picker widget of a column with its current selection.
    fn show_selection(&mut self, id: ColumnId, selection: &[String]);

    /// Best-effort markup pass after a table render.
    fn typeset(&mut self, _id: ColumnId) {}

    /// Store the permalink fragment; empty clears it.
    fn set_fragment(&mut self, fragment: &str);
}

#[derive(Debug)]
pub enum RestoreOutcome {
    /// No fragment was present.
    Empty,
    Restored { columns: Vec<ColumnId> },
    /// The fragment could not be decoded and was cleared; the board is untouched.
    Discarded(PermalinkError),
}

pub struct Board<S: Surface, F: Fetcher> {
    columns: ColumnStore,
    highlights: HighlightState,
    global_max: f64,
    rendered: BTreeMap<ColumnId, RenderInstruction>,
    picker: Box<dyn Picker>,
    fetcher: Arc<F>,
    surface: S,
}

impl<S: Surface, F: Fetcher> Board<S, F> {
    pub fn new(picker: Box<dyn Picker>, fetcher: Arc<F>, surface: S, palette_size: usize) -> Self {
        Self {
            columns: ColumnStore::new(),
            highlights: HighlightState::new(palette_size),
            global_max: 0.0,
            rendered: BTreeMap::new(),
            picker,
            fetcher,
            surface,
        }
    }

    pub fn columns(&self) -> &ColumnStore {
        &self.columns
    }

    pub fn column(&self, id: ColumnId) -> Option<&Column> {
        self.columns.get(id)
    }

    pub fn highlights(&self) -> &HighlightState {
        &self.highlights
    }

    pub fn global_max(&self) -> f64 {
        self.global_max
    }

    /// What was last rendered for `id`.
    pub fn rendered(&self, id: ColumnId) -> Option<&RenderInstruction> {
        self.rendered.get(&id)
    }

    pub fn picker(&self) -> &dyn Picker {
        self.picker.as_ref()
    }

    pub fn fetcher(&self) -> Arc<F> {
        Arc::clone(&self.fetcher)
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn add_column(&mut self) -> ColumnId {
        let id = self.columns.add();
        info!(column = %id, "column added");
        self.surface.show_selection(id, &[]);
        self.render_column(id);
        id
    }

    /// Remove a column. Any load still running for it is discarded when it completes.
    pub fn close_column(&mut self, id: ColumnId) -> bool {
        if self.columns.remove(id).is_none() {
            return false;
        }
        info!(column = %id, "column closed");
        self.rendered.remove(&id);
        self.surface.remove_column(id);
        self.recompute_and_redraw();
        true
    }

    /// Replace the whole selection of a column. Returns the load to run when the
    /// selection names a complete dataset.
    pub fn select_config(&mut self, id: ColumnId, selection: Vec<String>) -> Option<LoadRequest> {
        let column = self.columns.get_mut(id)?;
        column.selection = selection;
        self.apply_selection(id)
    }

    /// Change one picker slot of a column.
    pub fn update_locator_segment(
        &mut self,
        id: ColumnId,
        slot: usize,
        value: &str,
    ) -> Option<LoadRequest> {
        let column = self.columns.get_mut(id)?;
        picker::set_slot(self.picker.as_ref(), &mut column.selection, slot, value);
        self.apply_selection(id)
    }

    fn apply_selection(&mut self, id: ColumnId) -> Option<LoadRequest> {
        let column = self.columns.get_mut(id)?;
        let locator = self.picker.resolve(&column.selection);
        column.locator = locator.clone();
        self.surface.show_selection(id, &column.selection);

        if locator.is_complete() {
            column.status = ColumnStatus::Loading;
            debug!(column = %id, %locator, "load issued");
            self.render_column(id);
            Some(LoadRequest {
                column: id,
                locator,
                preserve_sort: false,
            })
        } else {
            column.clear();
            self.recompute_and_redraw();
            None
        }
    }

    /// Store a load result and redraw. Returns false when the result was stale: the
    /// column is gone or now points at another dataset.
    pub fn complete_load(&mut self, outcome: LoadOutcome) -> bool {
        if !self.apply_outcome(outcome) {
            return false;
        }
        self.recompute_and_redraw();
        true
    }

    fn apply_outcome(&mut self, outcome: LoadOutcome) -> bool {
        let LoadOutcome { request, result } = outcome;
        let Some(column) = self.columns.get_mut(request.column) else {
            debug!(column = %request.column, "discarding load for closed column");
            return false;
        };
        if column.locator != request.locator {
            debug!(
                column = %request.column,
                requested = %request.locator,
                current = %column.locator,
                "discarding stale load"
            );
            return false;
        }
        match result {
            Ok(table) => column.apply_loaded(table, request.preserve_sort),
            Err(err) => column.apply_failed(err),
        }
        true
    }

    /// Fetch one column's dataset and apply it.
    pub async fn run_load(&mut self, request: LoadRequest) -> bool {
        let outcome = request.run(self.fetcher.as_ref()).await;
        self.complete_load(outcome)
    }

    /// Select and, if complete, load right away.
    pub async fn select_and_load(&mut self, id: ColumnId, selection: Vec<String>) -> bool {
        match self.select_config(id, selection) {
            Some(request) => self.run_load(request).await,
            None => false,
        }
    }

    /// Label only; the column's pane is refreshed but nothing is recomputed.
    pub fn set_custom_label(&mut self, id: ColumnId, text: &str) -> bool {
        if !self.columns.set_label(id, text) {
            return false;
        }
        self.render_column(id);
        true
    }

    /// Header click on `field`. Only this column is re-rendered.
    pub fn sort_column(&mut self, id: ColumnId, field: usize) -> Option<SortSpec> {
        let spec = self.columns.set_sort(id, field)?;
        self.render_column(id);
        Some(spec)
    }

    pub fn set_aggregate_mode(&mut self, aggregate: bool) {
        let mode = if aggregate {
            HighlightMode::Aggregate
        } else {
            HighlightMode::Exclusive
        };
        self.highlights.set_mode(mode);
        self.redecorate_all();
    }

    /// Highlight (or, in aggregate mode, toggle) the token of a clicked cell.
    pub fn click_cell(&mut self, raw: &str) -> String {
        let token = self.highlights.click_cell(raw);
        self.redecorate_all();
        token
    }

    pub fn click_row(&mut self, key: &str) {
        self.highlights.click_row(key);
        self.redecorate_all();
    }

    /// Serializable projection of the board. Columns without a complete locator are left out.
    pub fn permalink_state(&self) -> PermalinkState {
        PermalinkState {
            aggregate: self.highlights.is_aggregate(),
            highlights: self.highlights.entries().to_vec(),
            columns: self
                .columns
                .iter()
                .filter(|c| c.locator.is_complete())
                .map(|c| ColumnConfig::new(&c.locator, c.label.clone(), c.sort))
                .collect(),
        }
    }

    /// Encode the board and hand the fragment to the surface.
    pub fn generate_permalink(&mut self) -> String {
        let fragment = permalink::encode(&self.permalink_state());
        info!(columns = self.columns.len(), "permalink generated");
        self.surface.set_fragment(&fragment);
        fragment
    }

    /// Rebuild the board from a permalink fragment.
    ///
    /// All loads run concurrently and are joined before the single recompute and redraw.
    /// A fragment that fails to decode is cleared and nothing from it is applied.
    pub async fn restore(&mut self, fragment: &str) -> RestoreOutcome {
        let trimmed = fragment.trim();
        let trimmed = trimmed.strip_prefix('#').unwrap_or(trimmed);
        if trimmed.is_empty() {
            return RestoreOutcome::Empty;
        }

        let state = match permalink::decode(trimmed, self.highlights.palette_size()) {
            Ok(state) => state,
            Err(err) => {
                warn!(error = %err, "discarding permalink");
                self.surface.set_fragment("");
                return RestoreOutcome::Discarded(err);
            }
        };

        let mode = if state.aggregate {
            HighlightMode::Aggregate
        } else {
            HighlightMode::Exclusive
        };
        self.highlights.restore(mode, state.highlights);

        let mut ids = Vec::with_capacity(state.columns.len());
        let mut requests = Vec::with_capacity(state.columns.len());
        for config in state.columns {
            let id = self.columns.add();
            let locator = config.locator();
            let selection = self.picker.selection_for(&locator);
            if let Some(column) = self.columns.get_mut(id) {
                column.selection = selection;
                column.locator = locator.clone();
                column.label = config.label;
                column.sort = config.sort;
                column.status = ColumnStatus::Loading;
                self.surface.show_selection(id, &column.selection);
            }
            ids.push(id);
            requests.push(LoadRequest {
                column: id,
                locator,
                preserve_sort: true,
            });
        }
        info!(columns = ids.len(), "restoring permalink");

        for outcome in load_all(Arc::clone(&self.fetcher), requests).await {
            self.apply_outcome(outcome);
        }
        self.recompute_and_redraw();
        RestoreOutcome::Restored { columns: ids }
    }

    /// Recompute the global maximum over every column, then render every column.
    pub fn recompute_and_redraw(&mut self) {
        self.global_max = global_max(self.columns.tables());
        for id in self.columns.ids() {
            self.render_column(id);
        }
    }

    fn render_column(&mut self, id: ColumnId) {
        let Some(column) = self.columns.get(id) else {
            return;
        };
        if let Some(err) = column.status.error() {
            self.surface.render_error(column, err);
            self.rendered.insert(id, RenderInstruction::Empty);
            return;
        }
        let instruction = render(&column.table, column.sort, self.global_max);
        self.surface.render_table(column, &instruction);
        if instruction.as_table().is_some() {
            self.surface.typeset(id);
        }
        self.surface
            .decorate(id, &self.highlights.decorate(&instruction));
        self.rendered.insert(id, instruction);
    }

    fn redecorate_all(&mut self) {
        for (id, instruction) in &self.rendered {
            self.surface
                .decorate(*id, &self.highlights.decorate(instruction));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::MemoryFetcher;
    use crate::locator::DatasetLocator;
    use crate::picker::TriplePicker;
    use crate::render::{RenderCell, ValueCell};
    use crate::highlight::DEFAULT_PALETTE_SIZE;

    #[derive(Debug, Default)]
    struct RecordingSurface {
        tables: BTreeMap<ColumnId, RenderInstruction>,
        errors: BTreeMap<ColumnId, String>,
        decorations: BTreeMap<ColumnId, ColumnDecorations>,
        selections: BTreeMap<ColumnId, Vec<String>>,
        removed: Vec<ColumnId>,
        typeset_calls: usize,
        fragment: Option<String>,
    }

    impl Surface for RecordingSurface {
        fn render_table(&mut self, column: &Column, instruction: &RenderInstruction) {
            self.errors.remove(&column.id);
            self.tables.insert(column.id, instruction.clone());
        }

        fn render_error(&mut self, column: &Column, error: &LoadError) {
            self.tables.remove(&column.id);
            self.errors.insert(column.id, error.path.clone());
        }

        fn remove_column(&mut self, id: ColumnId) {
            self.tables.remove(&id);
            self.removed.push(id);
        }

        fn decorate(&mut self, id: ColumnId, decorations: &ColumnDecorations) {
            self.decorations.insert(id, decorations.clone());
        }

        fn show_selection(&mut self, id: ColumnId, selection: &[String]) {
            self.selections.insert(id, selection.to_vec());
        }

        fn typeset(&mut self, _id: ColumnId) {
            self.typeset_calls += 1;
        }

        fn set_fragment(&mut self, fragment: &str) {
            self.fragment = Some(fragment.to_string());
        }
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn locator(class: &str) -> DatasetLocator {
        DatasetLocator::new([class, "s", "m"], format!("{class}.csv"))
    }

    fn board() -> Board<RecordingSurface, MemoryFetcher> {
        let fetcher = MemoryFetcher::new()
            .with(&locator("a"), "var,kind,tag,score\nx,k1,t1,1.0\ny,k2,t2,5.0\n")
            .with(&locator("b"), "var,kind,tag,score\nx,k3,t3,2.0\n")
            .with(&locator("d"), "var,kind,tag,score\n$y$,k4,t4,0.5\n");
        let picker = TriplePicker::new(
            strings(&["a", "b", "c", "d"]),
            strings(&["s"]),
            strings(&["m"]),
        );
        Board::new(
            Box::new(picker),
            Arc::new(fetcher),
            RecordingSurface::default(),
            DEFAULT_PALETTE_SIZE,
        )
    }

    fn bar_percent(instruction: &RenderInstruction, row: usize) -> f64 {
        let view = instruction.as_table().unwrap();
        match &view.rows[row].cells[view.value_index] {
            RenderCell::Value(ValueCell::Bar { percent, .. }) => *percent,
            other => panic!("expected bar, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn global_max_spans_all_columns() {
        let mut board = board();
        let a = board.add_column();
        let b = board.add_column();
        let c = board.add_column();
        assert!(board.select_and_load(a, strings(&["a", "s", "m"])).await);
        assert!(board.select_and_load(b, strings(&["b", "s", "m"])).await);
        assert!(board.select_and_load(c, strings(&["c", "s", "m"])).await);

        assert_eq!(board.global_max(), 5.0);
        // default sort is descending by value: 5.0 then 1.0
        let rendered = board.rendered(a).unwrap();
        assert!((bar_percent(rendered, 1) - 20.0).abs() < 1e-9);
        assert!((bar_percent(rendered, 0) - 100.0).abs() < 1e-9);
        assert!(board.column(c).unwrap().status.error().is_some());
        assert_eq!(
            board.surface().errors.get(&c).map(String::as_str),
            Some("data/c/s/m/c.csv")
        );
    }

    #[tokio::test]
    async fn closing_a_column_lowers_the_scale() {
        let mut board = board();
        let a = board.add_column();
        let b = board.add_column();
        board.select_and_load(a, strings(&["a", "s", "m"])).await;
        board.select_and_load(b, strings(&["b", "s", "m"])).await;
        assert_eq!(board.global_max(), 5.0);

        assert!(board.close_column(a));
        assert_eq!(board.global_max(), 2.0);
        assert!((bar_percent(board.rendered(b).unwrap(), 0) - 100.0).abs() < 1e-9);
        assert_eq!(board.surface().removed, vec![a]);
        assert!(!board.close_column(a));
    }

    #[tokio::test]
    async fn partial_selection_clears_table() {
        let mut board = board();
        let a = board.add_column();
        board.select_and_load(a, strings(&["a", "s", "m"])).await;
        assert!(board.update_locator_segment(a, 2, "").is_none());
        assert!(board.column(a).unwrap().table.is_empty());
        assert_eq!(board.global_max(), 0.0);
        assert_eq!(board.rendered(a), Some(&RenderInstruction::Empty));
        assert_eq!(
            board.surface().selections.get(&a),
            Some(&strings(&["a", "s", ""]))
        );
    }

    #[tokio::test]
    async fn load_for_closed_column_is_discarded() {
        let mut board = board();
        let a = board.add_column();
        let request = board.select_config(a, strings(&["a", "s", "m"])).unwrap();
        board.close_column(a);
        assert!(!board.run_load(request).await);
        assert!(board.columns().is_empty());
        assert_eq!(board.global_max(), 0.0);
    }

    #[tokio::test]
    async fn stale_load_is_discarded() {
        let mut board = board();
        let a = board.add_column();
        let first = board.select_config(a, strings(&["a", "s", "m"])).unwrap();
        let second = board.select_config(a, strings(&["b", "s", "m"])).unwrap();
        assert!(!board.run_load(first).await);
        assert!(board.run_load(second).await);
        assert_eq!(board.global_max(), 2.0);
    }

    #[tokio::test]
    async fn highlights_survive_rerender() {
        let mut board = board();
        let a = board.add_column();
        let d = board.add_column();
        board.select_and_load(a, strings(&["a", "s", "m"])).await;
        board.click_cell("y");
        board.select_and_load(d, strings(&["d", "s", "m"])).await;

        // `$y$` in the second column normalizes to the same token
        let decorations = &board.surface().decorations;
        assert_eq!(decorations[&a].cells.len(), 1);
        assert_eq!(decorations[&d].cells.len(), 1);
        assert_eq!(decorations[&d].cells[0].color, 0);
    }

    #[tokio::test]
    async fn row_click_marks_matching_rows() {
        let mut board = board();
        let a = board.add_column();
        board.select_and_load(a, strings(&["a", "s", "m"])).await;
        board.click_cell("x");
        board.click_row("x-k1-t1-1.0");
        let decorations = &board.surface().decorations[&a];
        assert!(decorations.cells.is_empty());
        assert_eq!(decorations.rows, vec![1]);
    }

    #[tokio::test]
    async fn turning_aggregate_off_clears_highlights() {
        let mut board = board();
        board.set_aggregate_mode(true);
        board.click_cell("x");
        board.click_cell("y");
        assert_eq!(board.highlights().entries().len(), 2);
        board.set_aggregate_mode(false);
        assert!(board.highlights().is_empty());
    }

    #[tokio::test]
    async fn sort_column_toggles_and_redraws_one_column() {
        let mut board = board();
        let a = board.add_column();
        board.select_and_load(a, strings(&["a", "s", "m"])).await;
        assert_eq!(board.sort_column(a, 0), Some(SortSpec::ascending(0)));
        assert_eq!(board.sort_column(a, 0), Some(SortSpec::descending(0)));
        let view = board.rendered(a).unwrap().as_table().unwrap();
        assert_eq!(view.rows[0].key, "y-k2-t2-5.0");
    }

    #[tokio::test]
    async fn permalink_round_trip_restores_board() {
        let mut board = board();
        let a = board.add_column();
        let b = board.add_column();
        let _unconfigured = board.add_column();
        board.select_and_load(a, strings(&["a", "s", "m"])).await;
        board.select_and_load(b, strings(&["b", "s", "m"])).await;
        board.set_custom_label(b, "second");
        board.sort_column(a, 0);
        board.set_aggregate_mode(true);
        board.click_cell("$x$");
        board.click_cell("k2");

        let fragment = board.generate_permalink();
        assert_eq!(board.surface().fragment.as_deref(), Some(fragment.as_str()));

        let mut restored = self::board();
        let columns = match restored.restore(&format!("#{fragment}")).await {
            RestoreOutcome::Restored { columns } => columns,
            other => panic!("expected restore, got {:?}", other),
        };
        assert_eq!(columns.len(), 2);
        assert_eq!(restored.permalink_state(), board.permalink_state());
        assert_eq!(restored.global_max(), 5.0);
        assert_eq!(
            restored.column(columns[0]).unwrap().sort,
            Some(SortSpec::ascending(0))
        );
        assert_eq!(
            restored.surface().selections.get(&columns[1]),
            Some(&strings(&["b", "s", "m"]))
        );
    }

    #[tokio::test]
    async fn corrupt_permalink_leaves_empty_board() {
        let mut board = board();
        let outcome = board.restore("#not base64!").await;
        assert!(matches!(outcome, RestoreOutcome::Discarded(_)));
        assert!(board.columns().is_empty());
        assert_eq!(board.surface().fragment.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn empty_fragment_is_a_no_op() {
        let mut board = board();
        assert!(matches!(board.restore("#").await, RestoreOutcome::Empty));
        assert!(board.surface().fragment.is_none());
    }

    #[tokio::test]
    async fn label_change_does_not_recompute() {
        let mut board = board();
        let a = board.add_column();
        board.select_and_load(a, strings(&["a", "s", "m"])).await;
        let before = board.surface().typeset_calls;
        assert!(board.set_custom_label(a, "mine"));
        assert_eq!(board.column(a).unwrap().title(), "mine");
        assert_eq!(board.surface().typeset_calls, before + 1);
        assert!(!board.set_custom_label(ColumnId::from_raw(42), "x"));
    }
}

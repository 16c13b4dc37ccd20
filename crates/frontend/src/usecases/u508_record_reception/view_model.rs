//! ViewModel for the reception table of an order

use super::api::{fetch_snapshot, HttpReceptionApi};
use super::batch::{apply_collective, confirm_all, BatchHooks, BatchResult, CollectivePreview};
use super::collective::{plan_collective, CollectiveMode, CollectivePlan, SelectedRow};
use super::config::ReceptionPageConfig;
use super::ledger::{
    not_delivered, EditOutcome, PendingLedger, RemainingTone, RowEdit, RowSurface, SummaryLine,
};
use crate::shared::page_unload::UnloadGuard;
use async_trait::async_trait;
use contracts::shared::number::{display_quantity, parse_or_zero};
use contracts::usecases::u508_record_reception::{OrderProgress, ReceptionLine, ReceptionTotals};
use gloo_timers::future::TimeoutFuture;
use leptos::logging::log;
use leptos::prelude::*;
use std::collections::HashMap;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;

/// Delay between the Enter-triggered blur and the summary, so the blur edit is captured first
const ENTER_SETTLE_MS: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    pub fn new(kind: NoticeKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self.kind {
            NoticeKind::Success => "alert alert--success",
            NoticeKind::Warning => "alert alert--warning",
            NoticeKind::Error => "alert alert--error",
        }
    }

    fn from_batch(result: &BatchResult) -> Option<Self> {
        let kind = match result {
            BatchResult::Succeeded { .. } => NoticeKind::Success,
            BatchResult::PartiallySucceeded { .. } => NoticeKind::Warning,
            BatchResult::Failed { .. } => NoticeKind::Error,
            BatchResult::Empty | BatchResult::Cancelled { .. } => return None,
        };
        result.notice().map(|text| Self::new(kind, text))
    }
}

/// One line of the reception table; every displayed value is its own signal
#[derive(Clone)]
pub struct ReceptionRow {
    pub business_id: String,
    pub description: String,
    pub unit_price: f64,
    pub ordered_quantity: f64,
    pub input_text: RwSignal<String>,
    /// Input text when the field gained focus
    pub text_before_edit: RwSignal<String>,
    /// Typed into since the field gained focus
    pub dirty: RwSignal<bool>,
    pub not_delivered: RwSignal<f64>,
    pub pending: RwSignal<bool>,
    /// Last server-confirmed totals; `quantity_delivered` is the cumulative total
    pub totals: RwSignal<ReceptionTotals>,
    pub selected: RwSignal<bool>,
}

impl ReceptionRow {
    fn from_line(line: ReceptionLine) -> Self {
        let cumulative = line.totals.quantity_delivered;
        let ordered = line.totals.ordered_quantity;
        let text = display_quantity(cumulative);
        Self {
            business_id: line.business_id,
            description: line.description,
            unit_price: line.unit_price,
            ordered_quantity: ordered,
            input_text: RwSignal::new(text.clone()),
            text_before_edit: RwSignal::new(text),
            dirty: RwSignal::new(false),
            not_delivered: RwSignal::new(not_delivered(ordered, cumulative)),
            pending: RwSignal::new(false),
            totals: RwSignal::new(line.totals),
            selected: RwSignal::new(false),
        }
    }

    pub fn current_total(&self) -> f64 {
        self.totals.with_untracked(|t| t.quantity_delivered)
    }

    pub fn remaining_tone(&self) -> Signal<RemainingTone> {
        let not_delivered = self.not_delivered;
        Signal::derive(move || RemainingTone::for_quantity(not_delivered.get()))
    }

    /// DOM id of the quantity input at `index`
    pub fn input_id(index: usize) -> String {
        format!("reception-qty-{}", index)
    }
}

/// Summary dialog state: the lines being confirmed
#[derive(Debug, Clone, PartialEq)]
pub enum PendingDialog {
    Summary(Vec<SummaryLine>),
    Collective(CollectivePlan, CollectivePreview),
}

#[derive(Clone)]
pub struct ReceptionVm {
    pub bon_id: String,
    pub bon_number: String,
    pub rows: RwSignal<Vec<ReceptionRow>>,
    pub progress: RwSignal<OrderProgress>,
    pub ledger: StoredValue<PendingLedger>,
    pub pending_count: RwSignal<usize>,

    pub dialog: RwSignal<Option<PendingDialog>>,
    pub collective_kind: RwSignal<String>,
    pub collective_parameter: RwSignal<String>,

    pub notice: RwSignal<Option<Notice>>,
    pub loading: RwSignal<bool>,
    pub committing: RwSignal<bool>,
    pub unload: StoredValue<UnloadGuard, LocalStorage>,
}

impl ReceptionVm {
    pub fn new(config: ReceptionPageConfig) -> Self {
        let vm = Self::detached(config);
        vm.unload.with_value(|guard| guard.install());
        vm
    }

    /// View model without the window listeners
    fn detached(config: ReceptionPageConfig) -> Self {
        let rows = config
            .lines
            .into_iter()
            .map(ReceptionRow::from_line)
            .collect::<Vec<_>>();

        Self {
            bon_id: config.bon_id,
            bon_number: config.bon_number,
            rows: RwSignal::new(rows),
            progress: RwSignal::new(OrderProgress::default()),
            ledger: StoredValue::new(PendingLedger::new()),
            pending_count: RwSignal::new(0),

            dialog: RwSignal::new(None),
            collective_kind: RwSignal::new("full".to_string()),
            collective_parameter: RwSignal::new(String::new()),

            notice: RwSignal::new(None),
            loading: RwSignal::new(false),
            committing: RwSignal::new(false),
            unload: StoredValue::new_local(UnloadGuard::new()),
        }
    }

    fn api(&self) -> HttpReceptionApi {
        HttpReceptionApi::new(self.bon_id.clone(), self.bon_number.clone())
    }

    fn row(&self, business_id: &str) -> Option<ReceptionRow> {
        self.rows.with_untracked(|rows| {
            rows.iter()
                .find(|r| r.business_id == business_id)
                .cloned()
        })
    }

    fn refresh_pending_count(&self) {
        self.pending_count
            .set(self.ledger.with_value(|ledger| ledger.len()));
    }

    pub fn selected_count(&self) -> Signal<usize> {
        let rows = self.rows;
        Signal::derive(move || {
            rows.with(|rows| rows.iter().filter(|r| r.selected.get()).count())
        })
    }

    pub fn set_all_selected(&self, selected: bool) {
        self.rows.with_untracked(|rows| {
            for row in rows {
                row.selected.set(selected);
            }
        });
    }

    /// Overlay the recorded receptions onto the rows embedded in the page
    pub fn load_snapshot(&self) {
        let vm = self.clone();
        vm.loading.set(true);

        spawn_local(async move {
            let guard = vm.unload.get_value();
            match fetch_snapshot(&vm.bon_id, &vm.bon_number, &guard).await {
                Ok(receptions) => {
                    let applied = vm.overlay_snapshot(&receptions);
                    log!(
                        "Loaded {} reception(s) for {}, {} applied",
                        receptions.len(),
                        vm.bon_number,
                        applied
                    );
                }
                Err(e) => {
                    if guard.should_surface() {
                        log!("Failed to load receptions: {}", e);
                        vm.notice.set(Some(Notice::new(NoticeKind::Error, e)));
                    }
                }
            }
            vm.loading.set(false);
        });
    }

    /// Put recorded totals on the rows; returns how many rows took them.
    ///
    /// Rows with a staged entry or with text typed since focus keep the
    /// operator's edit.
    pub fn overlay_snapshot(&self, receptions: &HashMap<String, ReceptionTotals>) -> usize {
        let mut surface = self.clone();
        let mut applied = 0;
        for (business_id, totals) in receptions {
            let Some(row) = self.row(business_id) else {
                continue;
            };
            if row.dirty.get_untracked() || self.ledger.with_value(|l| l.contains(business_id)) {
                continue;
            }
            let mut totals = totals.clone();
            totals.quantity_not_delivered =
                not_delivered(row.ordered_quantity, totals.quantity_delivered);
            surface.apply_server_totals(business_id, &totals);
            surface.set_not_delivered(business_id, totals.quantity_not_delivered);
            surface.set_input_text(business_id, &display_quantity(totals.quantity_delivered));
            applied += 1;
        }
        applied
    }

    pub fn begin_edit(&self, business_id: &str) {
        if let Some(row) = self.row(business_id) {
            row.text_before_edit.set(row.input_text.get_untracked());
            row.dirty.set(false);
        }
    }

    /// Typing-time preview of the remaining quantity
    pub fn preview_edit(&self, business_id: &str, sanitized: String) {
        let Some(row) = self.row(business_id) else {
            return;
        };
        let increment = parse_or_zero(&sanitized);
        row.input_text.set(sanitized);
        row.dirty.set(true);
        row.not_delivered
            .set(not_delivered(row.ordered_quantity, row.current_total() + increment));
    }

    /// Blur: stage or clear the typed increment
    pub fn capture_edit(&self, business_id: &str) {
        let Some(row) = self.row(business_id) else {
            return;
        };
        let has_entry = self.ledger.with_value(|l| l.contains(business_id));
        let typed = row.dirty.get_untracked();
        row.dirty.set(false);

        // focus then blur without typing
        if !has_entry && !typed {
            row.not_delivered
                .set(not_delivered(row.ordered_quantity, row.current_total()));
            return;
        }

        let raw = row.input_text.get_untracked();
        let before = row.text_before_edit.get_untracked();

        let edit = RowEdit {
            row: business_id,
            raw_input: &raw,
            ordered_quantity: row.ordered_quantity,
            current_total: row.current_total(),
            text_before_edit: &before,
        };
        let mut surface = self.clone();
        let outcome = self
            .ledger
            .try_update_value(|ledger| ledger.record_edit(&mut surface, edit));

        match outcome {
            Some(Err(e)) => {
                row.text_before_edit.set(row.input_text.get_untracked());
                self.notice.set(Some(Notice::new(NoticeKind::Warning, e.to_string())));
            }
            Some(Ok(EditOutcome::Cleared)) => {
                row.text_before_edit.set(row.input_text.get_untracked());
            }
            _ => {}
        }
        self.refresh_pending_count();
    }

    /// Escape: drop the focused row's pending edit only
    pub fn cancel_row(&self, business_id: &str) {
        let mut surface = self.clone();
        let cancelled = self
            .ledger
            .try_update_value(|ledger| ledger.cancel_edit(&mut surface, business_id))
            .unwrap_or(false);
        if let Some(row) = self.row(business_id) {
            row.dirty.set(false);
            if !cancelled {
                row.input_text.set(row.text_before_edit.get_untracked());
                row.not_delivered
                    .set(not_delivered(row.ordered_quantity, row.current_total()));
            }
            // the following blur must not re-stage the restored text
            row.text_before_edit.set(row.input_text.get_untracked());
        }
        self.refresh_pending_count();
    }

    /// Enter: give the blur handler time to run, then open the summary
    pub fn request_summary(&self) {
        let vm = self.clone();
        spawn_local(async move {
            TimeoutFuture::new(ENTER_SETTLE_MS).await;
            vm.open_summary();
        });
    }

    pub fn open_summary(&self) {
        if self.committing.get_untracked() || self.dialog.get_untracked().is_some() {
            return;
        }
        let summary = self.ledger.with_value(|l| l.summary());
        if summary.is_empty() {
            return;
        }
        self.dialog.set(Some(PendingDialog::Summary(summary)));
    }

    /// Plan the collective action from the toolbar and show its preview
    pub fn open_collective(&self) {
        if self.committing.get_untracked() {
            return;
        }
        if !self.ledger.with_value(|l| l.is_empty()) {
            self.notice.set(Some(Notice::new(
                NoticeKind::Warning,
                "Confirm or cancel the pending line edits before a collective reception",
            )));
            return;
        }

        let mode = match CollectiveMode::from_form(
            &self.collective_kind.get_untracked(),
            &self.collective_parameter.get_untracked(),
        ) {
            Some(Ok(mode)) => mode,
            Some(Err(e)) => {
                self.notice.set(Some(Notice::new(NoticeKind::Warning, e.to_string())));
                return;
            }
            None => return,
        };

        let selection = self.rows.with_untracked(|rows| {
            rows.iter()
                .filter(|r| r.selected.get_untracked())
                .map(|r| SelectedRow {
                    row: r.business_id.clone(),
                    ordered_quantity: r.ordered_quantity,
                    current_total: r.current_total(),
                })
                .collect::<Vec<_>>()
        });
        if selection.is_empty() {
            self.notice.set(Some(Notice::new(
                NoticeKind::Warning,
                "Select at least one line",
            )));
            return;
        }

        let plan = match plan_collective(mode, &selection) {
            Ok(plan) => plan,
            Err(e) => {
                self.notice.set(Some(Notice::new(NoticeKind::Warning, e.to_string())));
                return;
            }
        };
        if plan.is_empty() {
            self.notice.set(Some(Notice::new(
                NoticeKind::Warning,
                format!(
                    "Nothing to apply: {} selected line(s) skipped",
                    plan.skipped.len()
                ),
            )));
            return;
        }

        // optimistic staging while the preview is open
        let mut surface = self.clone();
        for planned in &plan.updates {
            planned.to_pending_change().stage_on(&mut surface);
        }
        let preview = CollectivePreview::from_plan(&plan);
        self.dialog.set(Some(PendingDialog::Collective(plan, preview)));
    }

    /// Answer of the open dialog
    pub fn answer_dialog(&self, accepted: bool) {
        let Some(dialog) = self.dialog.get_untracked() else {
            return;
        };
        self.dialog.set(None);
        self.committing.set(accepted);

        let vm = self.clone();
        spawn_local(async move {
            let api = vm.api();
            let hooks = DialogAnswer {
                accepted,
                vm: vm.clone(),
            };
            let mut surface = vm.clone();

            match dialog {
                PendingDialog::Summary(_) => {
                    let mut ledger = vm
                        .ledger
                        .try_update_value(std::mem::take)
                        .unwrap_or_default();
                    let result = confirm_all(&mut ledger, &api, &mut surface, &hooks).await;
                    log!("Reception batch settled: {:?}", result);
                }
                PendingDialog::Collective(plan, _) => {
                    let result = apply_collective(plan, &api, &mut surface, &hooks).await;
                    if !result.skipped.is_empty() {
                        log!("Collective reception skipped {} line(s)", result.skipped.len());
                    }
                    if result.batch.failed().is_empty() {
                        vm.set_all_selected(false);
                    }
                }
            }

            vm.refresh_pending_count();
            vm.committing.set(false);
        });
    }

    /// Move focus to the input at `index` and select its text
    pub fn focus_input(index: usize) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        let Some(input) = document
            .get_element_by_id(&ReceptionRow::input_id(index))
            .and_then(|el| el.dyn_into::<web_sys::HtmlInputElement>().ok())
        else {
            return;
        };
        let _ = input.focus();
        input.select();
    }
}

impl RowSurface for ReceptionVm {
    fn set_input_text(&mut self, row: &str, text: &str) {
        if let Some(r) = self.row(row) {
            r.input_text.set(text.to_string());
        }
    }

    fn set_not_delivered(&mut self, row: &str, not_delivered: f64) {
        if let Some(r) = self.row(row) {
            r.not_delivered.set(not_delivered);
        }
    }

    fn set_pending(&mut self, row: &str, pending: bool) {
        if let Some(r) = self.row(row) {
            r.pending.set(pending);
        }
    }

    fn apply_server_totals(&mut self, row: &str, totals: &ReceptionTotals) {
        if let Some(r) = self.row(row) {
            r.totals.update(|current| {
                let ordered = current.ordered_quantity;
                *current = totals.clone();
                // bulk replies omit the ordered quantity
                if current.ordered_quantity == 0.0 {
                    current.ordered_quantity = ordered;
                }
            });
            r.text_before_edit
                .set(display_quantity(totals.quantity_delivered));
        }
    }

    fn apply_order_progress(&mut self, progress: &OrderProgress) {
        self.progress.update(|current| {
            if progress.taux_avancement.is_some() {
                current.taux_avancement = progress.taux_avancement;
            }
            if progress.montant_total_recu.is_some() {
                current.montant_total_recu = progress.montant_total_recu;
            }
        });
    }
}

/// Batch hooks for a dialog that has already been answered
struct DialogAnswer {
    accepted: bool,
    vm: ReceptionVm,
}

#[async_trait(?Send)]
impl BatchHooks for DialogAnswer {
    async fn confirm_summary(&self, _summary: &[SummaryLine]) -> bool {
        self.accepted
    }

    async fn confirm_collective(&self, _preview: &CollectivePreview) -> bool {
        self.accepted
    }

    fn on_batch_settled(&self, result: &BatchResult) {
        self.vm.notice.set(Notice::from_batch(result));
    }

    fn page_unloading(&self) -> bool {
        self.vm.unload.with_value(|guard| guard.is_unloading())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(rows: &[(&str, f64, f64)]) -> ReceptionVm {
        let lines = rows
            .iter()
            .map(|(id, ordered, total)| ReceptionLine {
                business_id: id.to_string(),
                description: String::new(),
                unit_price: 10.0,
                totals: ReceptionTotals {
                    ordered_quantity: *ordered,
                    quantity_delivered: *total,
                    ..Default::default()
                },
            })
            .collect();
        ReceptionVm::detached(ReceptionPageConfig {
            bon_id: "42".to_string(),
            bon_number: "PO-0042".to_string(),
            lines,
        })
    }

    fn type_into(vm: &ReceptionVm, row: &str, text: &str) {
        vm.begin_edit(row);
        vm.preview_edit(row, text.to_string());
        vm.capture_edit(row);
    }

    fn staged(vm: &ReceptionVm, row: &str) -> Option<f64> {
        vm.ledger
            .with_value(|l| l.get(row).map(|c| c.quantity_delivered))
    }

    #[test]
    fn test_increment_equal_to_total_is_staged() {
        let vm = page(&[("r", 10.0, 3.0)]);
        let row = vm.row("r").unwrap();

        type_into(&vm, "r", "3");

        assert_eq!(staged(&vm, "r"), Some(3.0));
        assert!(row.pending.get_untracked());
        assert_eq!(row.input_text.get_untracked(), "3");
        assert_eq!(row.not_delivered.get_untracked(), 4.0);
        assert_eq!(vm.pending_count.get_untracked(), 1);
    }

    #[test]
    fn test_focus_then_blur_leaves_row_untouched() {
        let vm = page(&[("r", 10.0, 3.0)]);
        let row = vm.row("r").unwrap();

        vm.begin_edit("r");
        vm.capture_edit("r");

        assert!(vm.ledger.with_value(|l| l.is_empty()));
        assert!(!row.pending.get_untracked());
        assert_eq!(row.input_text.get_untracked(), "3");
        assert_eq!(row.not_delivered.get_untracked(), 7.0);
    }

    #[test]
    fn test_erased_input_restores_total() {
        let vm = page(&[("r", 10.0, 3.0)]);
        let row = vm.row("r").unwrap();

        vm.begin_edit("r");
        vm.preview_edit("r", "5".to_string());
        assert_eq!(row.not_delivered.get_untracked(), 2.0);
        vm.preview_edit("r", String::new());
        vm.capture_edit("r");

        assert_eq!(staged(&vm, "r"), None);
        assert_eq!(row.input_text.get_untracked(), "3");
        assert_eq!(row.not_delivered.get_untracked(), 7.0);
    }

    #[test]
    fn test_rejected_edit_shows_warning_and_restores() {
        let vm = page(&[("r", 10.0, 3.0)]);
        let row = vm.row("r").unwrap();

        type_into(&vm, "r", "8");

        assert_eq!(staged(&vm, "r"), None);
        assert_eq!(row.input_text.get_untracked(), "3");
        assert_eq!(row.not_delivered.get_untracked(), 7.0);
        assert_eq!(
            vm.notice.get_untracked().map(|n| n.kind),
            Some(NoticeKind::Warning)
        );
    }

    #[test]
    fn test_escape_then_blur_does_not_restage() {
        let vm = page(&[("r", 10.0, 3.0)]);
        let row = vm.row("r").unwrap();
        type_into(&vm, "r", "2");

        vm.begin_edit("r");
        vm.preview_edit("r", "4".to_string());
        vm.cancel_row("r");
        vm.capture_edit("r");

        assert_eq!(staged(&vm, "r"), None);
        assert!(!row.pending.get_untracked());
        assert_eq!(row.input_text.get_untracked(), "3");
        assert_eq!(row.not_delivered.get_untracked(), 7.0);
        assert_eq!(vm.pending_count.get_untracked(), 0);
    }

    #[test]
    fn test_snapshot_keeps_operator_edits() {
        let vm = page(&[("a", 10.0, 0.0), ("b", 10.0, 0.0), ("c", 10.0, 0.0)]);
        type_into(&vm, "a", "2");
        vm.begin_edit("b");
        vm.preview_edit("b", "1".to_string());

        let recorded = ReceptionTotals {
            quantity_delivered: 5.0,
            amount_not_delivered: 50.0,
            ..Default::default()
        };
        let snapshot: HashMap<String, ReceptionTotals> = ["a", "b", "c", "unknown"]
            .into_iter()
            .map(|id| (id.to_string(), recorded.clone()))
            .collect();

        assert_eq!(vm.overlay_snapshot(&snapshot), 1);

        let a = vm.row("a").unwrap();
        assert_eq!(a.input_text.get_untracked(), "2");
        assert!(a.pending.get_untracked());
        assert_eq!(vm.row("b").unwrap().input_text.get_untracked(), "1");

        let c = vm.row("c").unwrap();
        assert_eq!(c.input_text.get_untracked(), "5");
        assert_eq!(c.not_delivered.get_untracked(), 5.0);
        assert_eq!(c.current_total(), 5.0);
        assert_eq!(c.totals.get_untracked().ordered_quantity, 10.0);
        assert_eq!(c.totals.get_untracked().amount_not_delivered, 50.0);
    }

    #[test]
    fn test_server_totals_keep_ordered_quantity() {
        let mut vm = page(&[("r", 10.0, 3.0)]);
        let bulk_reply = ReceptionTotals {
            quantity_delivered: 6.0,
            quantity_not_delivered: 4.0,
            ..Default::default()
        };

        vm.apply_server_totals("r", &bulk_reply);

        let row = vm.row("r").unwrap();
        assert_eq!(row.totals.get_untracked().ordered_quantity, 10.0);
        assert_eq!(row.current_total(), 6.0);
        assert_eq!(row.text_before_edit.get_untracked(), "6");
    }

    #[test]
    fn test_collective_refused_while_edits_pending() {
        let vm = page(&[("a", 10.0, 0.0), ("b", 10.0, 0.0)]);
        type_into(&vm, "a", "2");
        vm.set_all_selected(true);

        vm.open_collective();

        assert!(vm.dialog.get_untracked().is_none());
        assert_eq!(
            vm.notice.get_untracked().map(|n| n.kind),
            Some(NoticeKind::Warning)
        );
        assert!(!vm.row("b").unwrap().pending.get_untracked());
    }

    #[test]
    fn test_collective_preview_stages_selected_rows() {
        let vm = page(&[("a", 10.0, 3.0), ("b", 10.0, 1.0), ("c", 10.0, 3.0)]);
        vm.row("a").unwrap().selected.set(true);
        vm.row("b").unwrap().selected.set(true);
        vm.collective_kind.set("correction".to_string());
        vm.collective_parameter.set("-2".to_string());

        vm.open_collective();

        let Some(PendingDialog::Collective(plan, preview)) = vm.dialog.get_untracked() else {
            panic!("collective dialog not opened");
        };
        assert_eq!(plan.updates.len(), 1);
        assert_eq!((preview.selected, preview.eligible, preview.skipped), (2, 1, 1));

        let a = vm.row("a").unwrap();
        assert!(a.pending.get_untracked());
        assert_eq!(a.not_delivered.get_untracked(), 9.0);
        assert!(!vm.row("b").unwrap().pending.get_untracked());
        assert!(!vm.row("c").unwrap().pending.get_untracked());
    }
}

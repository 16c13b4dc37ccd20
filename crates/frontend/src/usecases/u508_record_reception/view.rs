use super::config::ReceptionPageConfig;
use super::input_mask::sanitize_quantity_input;
use super::ledger::RemainingTone;
use super::navigation::{classify_key, neighbor_index, KeyIntent};
use super::view_model::{PendingDialog, ReceptionRow, ReceptionVm};
use crate::shared::modal_frame::ModalFrame;
use crate::shared::number_format::{format_amount, format_amount_fr, format_increment, format_percent};
use contracts::shared::number::display_quantity;
use contracts::usecases::common::UseCaseMetadata;
use contracts::usecases::u508_record_reception::RecordReception;
use leptos::ev;
use leptos::prelude::*;
use thaw::*;

#[component]
pub fn ReceptionPage(config: ReceptionPageConfig) -> impl IntoView {
    let vm = ReceptionVm::new(config);
    provide_context(vm.clone());
    vm.load_snapshot();

    let bon_number = vm.bon_number.clone();
    let progress = vm.progress;
    let loading = vm.loading;
    let notice = vm.notice;
    let page_id = format!("{}--usecase", RecordReception::full_name());

    view! {
        <div id=page_id class="page">
            <div class="page__header">
                <div class="page__header-left">
                    <h1 class="page__title" title={RecordReception::description()}>
                        {RecordReception::display_name()} ": " {bon_number}
                    </h1>
                    {move || progress.get().taux_avancement.map(|rate| view! {
                        <Badge appearance=BadgeAppearance::Tint color=BadgeColor::Brand>
                            {format_percent(rate)}
                        </Badge>
                    })}
                    {move || progress.get().montant_total_recu.map(|amount| view! {
                        <Badge appearance=BadgeAppearance::Outline color=BadgeColor::Success>
                            {format!("Received: {}", format_amount_fr(amount))}
                        </Badge>
                    })}
                    <Show when=move || loading.get()>
                        <Spinner />
                    </Show>
                </div>
            </div>

            {move || notice.get().map(|n| view! {
                <div class={n.css_class()}>
                    <span>{n.text.clone()}</span>
                    <button class="alert__close" on:click=move |_| notice.set(None)>"×"</button>
                </div>
            })}

            <div class="page__content">
                <ReceptionToolbar />
                <ReceptionTable />
            </div>

            <ReceptionDialog />
        </div>
    }
}

#[component]
fn ReceptionToolbar() -> impl IntoView {
    let vm = use_context::<ReceptionVm>().expect("ReceptionVm context");
    let pending_count = vm.pending_count;
    let committing = vm.committing;
    let kind = vm.collective_kind;
    let parameter = vm.collective_parameter;
    let selected_count = vm.selected_count();

    let vm_summary = vm.clone();
    let vm_collective = vm.clone();

    view! {
        <Flex gap=FlexGap::Small align=FlexAlign::Center class="reception__toolbar">
            <select
                class="reception__mode"
                prop:value=move || kind.get()
                on:change=move |ev| kind.set(event_target_value(&ev))
            >
                <option value="full">"Full"</option>
                <option value="partial">"Partial quantity"</option>
                <option value="rate">"Target rate (%)"</option>
                <option value="correction">"Group correction (±)"</option>
            </select>
            <Show when=move || kind.get() != "full">
                <input
                    class="reception__mode-parameter"
                    type="text"
                    inputmode="decimal"
                    placeholder=move || {
                        match kind.get().as_str() {
                            "rate" => "Rate, %",
                            "correction" => "Correction per line, e.g. -1",
                            _ => "Quantity per line",
                        }
                    }
                    prop:value=move || parameter.get()
                    on:input=move |ev| parameter.set(event_target_value(&ev))
                />
            </Show>
            <Button
                appearance=ButtonAppearance::Secondary
                on_click=move |_| vm_collective.open_collective()
                disabled=Signal::derive(move || committing.get() || selected_count.get() == 0)
            >
                {move || format!("Apply to selection ({})", selected_count.get())}
            </Button>
            <Button
                appearance=ButtonAppearance::Primary
                on_click=move |_| vm_summary.open_summary()
                disabled=Signal::derive(move || committing.get() || pending_count.get() == 0)
            >
                {move || format!("Confirm edits ({})", pending_count.get())}
            </Button>
            <Show when=move || committing.get()>
                <Spinner />
            </Show>
        </Flex>
    }
}

#[component]
fn ReceptionTable() -> impl IntoView {
    let vm = use_context::<ReceptionVm>().expect("ReceptionVm context");
    let rows = vm.rows;
    let row_count = Signal::derive(move || rows.with(|r| r.len()));
    let selected_count = vm.selected_count();
    let vm_all = vm.clone();

    view! {
        <Table attr:style="width: 100%;">
            <TableHeader>
                <TableRow>
                    <TableHeaderCell>
                        <input
                            type="checkbox"
                            prop:checked=move || { row_count.get() > 0 && selected_count.get() == row_count.get() }
                            on:change=move |ev| vm_all.set_all_selected(event_target_checked(&ev))
                        />
                    </TableHeaderCell>
                    <TableHeaderCell>"Line"</TableHeaderCell>
                    <TableHeaderCell>"Description"</TableHeaderCell>
                    <TableHeaderCell>"Ordered"</TableHeaderCell>
                    <TableHeaderCell>"Delivered"</TableHeaderCell>
                    <TableHeaderCell>"Not delivered"</TableHeaderCell>
                    <TableHeaderCell>"Amount delivered"</TableHeaderCell>
                    <TableHeaderCell>"Amount not delivered"</TableHeaderCell>
                    <TableHeaderCell>"Qty payable"</TableHeaderCell>
                    <TableHeaderCell>"Amount payable"</TableHeaderCell>
                </TableRow>
            </TableHeader>
            <TableBody>
                <For
                    each={move || rows.get().into_iter().enumerate().collect::<Vec<_>>()}
                    key={|(_, row): &(usize, ReceptionRow)| row.business_id.clone()}
                    children={move |(index, row): (usize, ReceptionRow)| view! { <ReceptionTableRow index=index row=row /> }}
                />
            </TableBody>
        </Table>
    }
}

#[component]
fn ReceptionTableRow(index: usize, row: ReceptionRow) -> impl IntoView {
    let vm = use_context::<ReceptionVm>().expect("ReceptionVm context");
    let committing = vm.committing;
    let row_count = vm.rows.with_untracked(|r| r.len());

    let id = row.business_id.clone();
    let input_text = row.input_text;
    let pending = row.pending;
    let not_delivered = row.not_delivered;
    let totals = row.totals;
    let selected = row.selected;
    let tone = row.remaining_tone();

    let on_focus = {
        let vm = vm.clone();
        let id = id.clone();
        move |_: ev::FocusEvent| vm.begin_edit(&id)
    };
    let on_input = {
        let vm = vm.clone();
        let id = id.clone();
        move |ev: ev::Event| vm.preview_edit(&id, sanitize_quantity_input(&event_target_value(&ev)))
    };
    let on_blur = {
        let vm = vm.clone();
        let id = id.clone();
        move |_: ev::FocusEvent| vm.capture_edit(&id)
    };
    let on_keydown = {
        let vm = vm.clone();
        let id = id.clone();
        move |ev: ev::KeyboardEvent| {
            let intent = classify_key(&ev.key(), ev.shift_key());
            if intent == KeyIntent::Other {
                return;
            }
            ev.prevent_default();
            let input = event_target::<web_sys::HtmlInputElement>(&ev);
            match intent {
                KeyIntent::Next | KeyIntent::Previous => {
                    if let Some(target) = neighbor_index(index, row_count, intent) {
                        let _ = input.blur();
                        ReceptionVm::focus_input(target);
                    }
                }
                KeyIntent::Confirm => {
                    let _ = input.blur();
                    vm.request_summary();
                }
                KeyIntent::Cancel => {
                    vm.cancel_row(&id);
                    let _ = input.blur();
                }
                KeyIntent::Other => {}
            }
        }
    };

    view! {
        <TableRow class:reception__row--pending=move || pending.get()>
            <TableCell>
                <input
                    type="checkbox"
                    prop:checked=move || selected.get()
                    on:change=move |ev| selected.set(event_target_checked(&ev))
                />
            </TableCell>
            <TableCell>
                <TableCellLayout>{row.business_id.clone()}</TableCellLayout>
            </TableCell>
            <TableCell>
                <TableCellLayout truncate=true>{row.description.clone()}</TableCellLayout>
            </TableCell>
            <TableCell>{display_quantity(row.ordered_quantity)}</TableCell>
            <TableCell>
                <input
                    id={ReceptionRow::input_id(index)}
                    class="reception__qty-input"
                    class:pending-change=move || pending.get()
                    type="text"
                    inputmode="decimal"
                    autocomplete="off"
                    prop:value=move || input_text.get()
                    prop:disabled=move || committing.get()
                    on:focus=on_focus
                    on:input=on_input
                    on:blur=on_blur
                    on:keydown=on_keydown
                />
            </TableCell>
            <TableCell>
                <span class=move || tone.get().css_class()>
                    {move || display_quantity(not_delivered.get())}
                </span>
                {move || (tone.get() == RemainingTone::Complete).then(|| view! {
                    <Badge appearance=BadgeAppearance::Tint color=BadgeColor::Success>"OK"</Badge>
                })}
            </TableCell>
            <TableCell>{move || format_amount(totals.get().amount_delivered)}</TableCell>
            <TableCell>{move || format_amount(totals.get().amount_not_delivered)}</TableCell>
            <TableCell>{move || display_quantity(totals.get().quantity_payable)}</TableCell>
            <TableCell>{move || format_amount(totals.get().amount_payable)}</TableCell>
        </TableRow>
    }
}

#[component]
fn ReceptionDialog() -> impl IntoView {
    let vm = use_context::<ReceptionVm>().expect("ReceptionVm context");
    let dialog = vm.dialog;

    move || {
        let vm_confirm = vm.clone();
        let vm_cancel = vm.clone();
        let (title, confirm_label, intro, lines) = match dialog.get()? {
            PendingDialog::Summary(lines) => (
                "Confirm line edits".to_string(),
                "Save edits",
                format!("{} pending edit(s)", lines.len()),
                lines,
            ),
            PendingDialog::Collective(_, preview) => (
                preview.label.clone(),
                "Apply",
                format!(
                    "{} selected, {} to receive, {} skipped",
                    preview.selected, preview.eligible, preview.skipped
                ),
                preview.lines,
            ),
        };

        Some(view! {
            <ModalFrame
                title=title
                confirm_label=confirm_label
                modal_style="min-width: 420px;"
                on_confirm=Callback::new(move |_| vm_confirm.answer_dialog(true))
                on_cancel=Callback::new(move |_| vm_cancel.answer_dialog(false))
            >
                <p>{intro}</p>
                <table class="reception__summary">
                    <thead>
                        <tr>
                            <th>"Line"</th>
                            <th>"Change"</th>
                            <th>"New total"</th>
                        </tr>
                    </thead>
                    <tbody>
                        {lines.into_iter().map(|line| view! {
                            <tr>
                                <td>{line.row}</td>
                                <td>{format_increment(line.increment)}</td>
                                <td>{display_quantity(line.resulting_total)}</td>
                            </tr>
                        }).collect_view()}
                    </tbody>
                </table>
            </ModalFrame>
        })
    }
}

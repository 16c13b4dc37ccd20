use leptos::ev;
use leptos::html;
use leptos::prelude::*;
use thaw::*;

/// Blocking confirmation surface for the reception page.
///
/// The operator must answer explicitly: overlay clicks are swallowed, Escape
/// cancels and Enter confirms while the surface has focus.
#[component]
pub fn ModalFrame(
    #[prop(into)]
    title: String,
    on_confirm: Callback<()>,
    on_cancel: Callback<()>,
    /// Label of the primary action (default: "Confirm").
    #[prop(optional, into)]
    confirm_label: Option<String>,
    /// Extra style for the surface (`div.modal`).
    #[prop(optional, into)]
    modal_style: Option<String>,
    children: Children,
) -> impl IntoView {
    let surface = NodeRef::<html::Div>::new();
    let confirm_label = confirm_label.unwrap_or_else(|| "Confirm".to_string());

    // keyboard answers need focus on the surface, not on the row input that opened it
    Effect::new(move |_| {
        if let Some(el) = surface.get() {
            let _ = el.focus();
        }
    });

    let on_keydown = move |ev: ev::KeyboardEvent| match ev.key().as_str() {
        "Escape" => {
            ev.prevent_default();
            on_cancel.run(());
        }
        "Enter" => {
            ev.prevent_default();
            on_confirm.run(());
        }
        _ => {}
    };

    let surface_style = match modal_style {
        Some(extra) => format!("position: relative; outline: none; {extra}"),
        None => "position: relative; outline: none;".to_string(),
    };

    view! {
        <div class="modal-overlay" style="z-index: 1000;">
            <div
                class="modal"
                role="alertdialog"
                aria-modal="true"
                tabindex="-1"
                node_ref=surface
                style=surface_style
                on:keydown=on_keydown
            >
                <h3 class="modal__title">{title}</h3>
                <div class="modal__body">{children()}</div>
                <Flex gap=FlexGap::Small justify=FlexJustify::End class="modal__actions">
                    <Button appearance=ButtonAppearance::Secondary on_click=move |_| on_cancel.run(())>
                        "Cancel"
                    </Button>
                    <Button appearance=ButtonAppearance::Primary on_click=move |_| on_confirm.run(())>
                        {confirm_label}
                    </Button>
                </Flex>
            </div>
        </div>
    }
}

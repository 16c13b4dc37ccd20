pub mod app;
pub mod shared;
pub mod usecases;

use usecases::u508_record_reception::config::MOUNT_ELEMENT_ID;
use wasm_bindgen::prelude::wasm_bindgen;
use wasm_bindgen::JsCast;

#[wasm_bindgen]
pub fn hydrate() {
    // initializes logging using the `log` crate
    _ = console_log::init_with_level(log::Level::Debug);
    console_error_panic_hook::set_once();

    // the order page reserves a host element; standalone pages get the body
    let host = web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.get_element_by_id(MOUNT_ELEMENT_ID))
        .and_then(|el| el.dyn_into::<web_sys::HtmlElement>().ok());

    match host {
        Some(host) => leptos::mount::mount_to(host, app::App).forget(),
        None => {
            log::warn!("#{} not found, mounting reception page on body", MOUNT_ELEMENT_ID);
            leptos::mount::mount_to_body(app::App);
        }
    }
}

#[wasm_bindgen(start)]
pub fn start() {
    hydrate();
}

use crate::usecases::u508_record_reception::config::ReceptionPageConfig;
use crate::usecases::u508_record_reception::ReceptionPage;
use leptos::prelude::*;

#[component]
pub fn App() -> impl IntoView {
    match ReceptionPageConfig::from_document() {
        Ok(config) => view! { <ReceptionPage config=config /> }.into_any(),
        Err(e) => {
            log::error!("Reception page not configured: {}", e);
            view! {
                <div class="alert alert--error">{format!("Reception unavailable: {}", e)}</div>
            }
            .into_any()
        }
    }
}

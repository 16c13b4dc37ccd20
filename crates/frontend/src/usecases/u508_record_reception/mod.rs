pub mod api;
pub mod batch;
pub mod collective;
pub mod config;
pub mod input_mask;
pub mod ledger;
pub mod navigation;
pub mod view;
pub mod view_model;

pub use view::ReceptionPage;

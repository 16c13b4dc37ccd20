pub mod api_utils;
pub mod modal_frame;
pub mod number_format;
pub mod page_unload;

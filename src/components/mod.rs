pub mod event_detail;
pub mod export_modal;
pub mod modal;
pub mod status_bar;
pub mod week_view;

pub use event_detail::EventDetail;
pub use export_modal::ExportModal;
pub use status_bar::{StatusBar, StatusLine};
pub use week_view::WeekView;

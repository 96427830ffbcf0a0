pub mod backend;
pub mod event;
pub mod palette;

pub use backend::{read_courses, BackendClient, Formatter};
pub use event::{DecoratedEvent, Event};
pub use palette::decorate_all;

use crossterm::event::{Event, EventStream, KeyEvent, KeyEventKind};
use futures::StreamExt;

/// Wait for the next key press. `None` once the terminal input closes.
pub async fn next_key_event(events: &mut EventStream) -> Option<color_eyre::Result<KeyEvent>> {
    loop {
        match events.next().await? {
            Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => return Some(Ok(key)),
            Ok(_) => continue,
            Err(err) => return Some(Err(err.into())),
        }
    }
}

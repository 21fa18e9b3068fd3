//! Cursive rendering of grouped rows.

/// Editable form built from rows.
pub mod form;

/// Transient submission notices.
pub mod notice;

use cursive::Cursive;

/// Global quit handler.
pub fn handle_quit(siv: &mut Cursive) {
    siv.quit();
}

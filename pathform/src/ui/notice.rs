use std::{
    sync::atomic::{AtomicU64, Ordering},
    thread,
    time::Duration,
};

use cursive::{Cursive, traits::Nameable, views::Dialog};

use crate::sync::SaveResponse;

/// How long a notice stays on screen.
pub const NOTICE_TIMEOUT: Duration = Duration::from_millis(2000);

static NOTICE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Show the outcome of a submission; the notice removes itself after
/// [`NOTICE_TIMEOUT`]. Returns the layer name of the notice.
pub fn show(siv: &mut Cursive, resp: &SaveResponse) -> String {
    let name = format!("notice-{}", NOTICE_SEQ.fetch_add(1, Ordering::Relaxed));
    let title = if resp.success { "Success" } else { "Error" };
    siv.add_layer(Dialog::text(resp.msg.clone()).title(title).with_name(&name));

    let sink = siv.cb_sink().clone();
    let expired = name.clone();
    thread::spawn(move || {
        thread::sleep(NOTICE_TIMEOUT);
        if sink.send(Box::new(move |s: &mut Cursive| dismiss(s, &expired))).is_err() {
            debug!("UI gone before notice expired");
        }
    });
    name
}

/// Remove the notice layer called `name`, if still shown.
pub fn dismiss(siv: &mut Cursive, name: &str) {
    let screen = siv.screen_mut();
    if let Some(pos) = screen.find_layer_from_name(name) {
        screen.remove_layer(pos);
    }
}

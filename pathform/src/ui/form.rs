use std::sync::Arc;

use cursive::{
    Cursive, View,
    theme::Effect,
    traits::{Nameable, Resizable, Scrollable},
    utils::markup::StyledString,
    views::{Checkbox, Dialog, EditView, LinearLayout, PaddedView, TextView},
};

use crate::{
    data::{
        capture::{Binding, capture},
        kind::{Constraints, Control, RawInput, Step},
        payload::PayloadTree,
        row::{FieldRow, Row},
    },
    sync::SaveResponse,
    ui::notice,
};

/// Cells of padding per depth level.
pub const INDENT: usize = 2;

const LABEL_WIDTH: usize = 24;
const CONTROL_WIDTH: usize = 32;

/// Submits a payload and reports the result. Runs on the UI thread.
pub type SubmitFn = Arc<dyn Fn(PayloadTree) -> SaveResponse + Send + Sync>;

/// Build the editable form for `rows`.
pub fn form_view(title: &str, rows: &[Row], on_submit: SubmitFn) -> impl View + use<> {
    let mut list = LinearLayout::vertical();
    if rows.is_empty() {
        list.add_child(TextView::new("No configurable fields"));
    }
    for row in rows {
        list.add_child(row_view(row));
    }

    Dialog::around(list.scrollable())
        .title(title)
        .button("Save", submit_callback(rows, on_submit))
        .button("Quit", Cursive::quit)
}

/// Callback reading the form back and submitting it.
pub fn submit_callback(
    rows: &[Row],
    on_submit: SubmitFn,
) -> impl Fn(&mut Cursive) + Clone + Send + Sync + 'static {
    let fields: Arc<[FieldRow]> = rows.iter().filter_map(Row::as_field).cloned().collect();
    move |siv| submit_form(siv, &fields, &on_submit)
}

/// Capture the form, submit it if every input is valid, and show the outcome.
pub fn submit_form(siv: &mut Cursive, fields: &[FieldRow], on_submit: &SubmitFn) {
    let resp = match capture(read_inputs(siv, fields)) {
        Ok(edit) => on_submit(PayloadTree::from_flat(&edit)),
        Err(e) => SaveResponse::error(e.to_string()),
    };
    notice::show(siv, &resp);
}

/// Read the current state of every control bound to `fields`.
///
/// Fields without a control in the view tree are skipped.
pub fn read_inputs(siv: &mut Cursive, fields: &[FieldRow]) -> Vec<Binding> {
    fields
        .iter()
        .filter_map(|field| {
            let input = match field.constraints.control {
                Control::Checkbox => siv.call_on_name(&field.path, |c: &mut Checkbox| {
                    RawInput::Checked(c.is_checked())
                }),
                Control::Text | Control::Number => {
                    siv.call_on_name(&field.path, |e: &mut EditView| {
                        RawInput::Text(e.get_content().to_string())
                    })
                }
            };
            if input.is_none() {
                warn!("no control bound to `{}`", field.path);
            }
            input.map(|input| Binding::new(field.path.clone(), field.kind, input))
        })
        .collect()
}

fn row_view(row: &Row) -> PaddedView<LinearLayout> {
    let line = match row {
        Row::Section { .. } => {
            let heading = row.heading().unwrap_or_default();
            LinearLayout::horizontal().child(TextView::new(StyledString::styled(
                heading,
                Effect::Bold,
            )))
        }
        Row::Field { field, .. } => field_line(field),
    };
    PaddedView::lrtb(row.indent(INDENT), 0, 0, 0, line)
}

fn field_line(field: &FieldRow) -> LinearLayout {
    let mut line =
        LinearLayout::horizontal().child(TextView::new(field.name.as_str()).fixed_width(LABEL_WIDTH));

    match &field.initial {
        RawInput::Checked(checked) => {
            line.add_child(Checkbox::new().with_checked(*checked).with_name(&field.path));
        }
        RawInput::Text(text) => {
            line.add_child(
                EditView::new()
                    .content(text.as_str())
                    .with_name(&field.path)
                    .fixed_width(CONTROL_WIDTH),
            );
        }
    }

    if let Some(hint) = bounds_hint(&field.constraints) {
        line.add_child(TextView::new(format!(" {hint}")));
    }
    line
}

/// Short description of a numeric control's bounds.
pub fn bounds_hint(constraints: &Constraints) -> Option<String> {
    match (constraints.min, constraints.max, constraints.step) {
        (Some(min), Some(max), _) => Some(format!("[{min}, {max}]")),
        (_, _, Some(Step::Any)) => Some("(decimal)".to_string()),
        _ => None,
    }
}

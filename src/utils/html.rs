// src/utils/html.rs

use ammonia;

use crate::models::session::AnswerValue;

/// Clean HTML content using the ammonia library.
///
/// Whitelist-based: safe inline tags (like <b>, <p>) survive, while <script>,
/// <iframe> and event-handler attributes are stripped together with their
/// content.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

/// Sanitises the free-text parts of an answer before it is stored.
/// Choice keys and table cells are compared, never rendered, so they pass
/// through untouched.
pub fn sanitize_answer(answer: AnswerValue) -> AnswerValue {
    match answer {
        AnswerValue::Text(text) => AnswerValue::Text(clean_html(&text)),
        AnswerValue::Diagram(mut diagram) => {
            diagram.justification = clean_html(&diagram.justification);
            AnswerValue::Diagram(diagram)
        }
        other => other,
    }
}

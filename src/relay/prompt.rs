use crate::api::Message;

/// Effective user text: the document, when present, goes in front of the
/// question using a fixed template.
pub fn build_user_text(user_text: &str, document_context: Option<&str>) -> String {
    match document_context {
        Some(ctx) => format!("Document context:\n{}\n\nUser question: {}", ctx, user_text),
        None => user_text.to_string(),
    }
}

/// Outbound message list: system prompt, stored history, then the new turn
pub fn assemble_messages(system_prompt: &str, history: &[Message], user_text: &str) -> Vec<Message> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(Message::system(system_prompt));
    messages.extend_from_slice(history);
    messages.push(Message::user(user_text));
    messages
}

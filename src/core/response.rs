//! Discord message text helpers
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

/// Discord message content limit
pub const MESSAGE_LIMIT: usize = 2000;

/// Sent to the user whenever generation or saving fails.
pub const GENERATION_FAILED_NOTICE: &str = "Sorry, I couldn't generate an image for that prompt.";

/// Reply for the greeting command.
pub const GREETING: &str = "Hello! Send me a prompt, and I'll generate an image for you.";

/// Sent when delivery blows up after the acknowledgement went out.
pub const PROCESSING_ERROR_NOTICE: &str = "Sorry, I encountered an error processing your message.";

const ACK_PREFIX: &str = "Generating image for: ";
const ACK_SUFFIX: &str = "...";

/// Truncate text to at most `max_bytes`, ending with "..." when cut (UTF-8 safe)
pub fn truncate_to(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let mut end = max_bytes.saturating_sub(3);
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

/// Acknowledgement sent before the generation call starts.
pub fn generating_notice(prompt: &str) -> String {
    let budget = MESSAGE_LIMIT - ACK_PREFIX.len() - ACK_SUFFIX.len();
    format!("{ACK_PREFIX}{}{ACK_SUFFIX}", truncate_to(prompt, budget))
}

//! Raw text extraction for fenced container regions

use crate::markup::Token;

/// Collect the raw text between the open token at `open_idx` and the first
/// following token with nesting -1.
///
/// Returns an empty string when the stream ends before a closing token.
pub fn extract_block_content(tokens: &[Token], open_idx: usize) -> String {
    let Some(rest) = tokens.get(open_idx + 1..) else {
        return String::new();
    };

    let mut content = String::new();
    for token in rest {
        if token.nesting == -1 {
            if content.ends_with('\n') {
                content.pop();
            }
            return content;
        }
        content.push_str(&token.content);
        content.push('\n');
    }

    log::debug!("No closing token after index {}; extracted nothing", open_idx);
    String::new()
}

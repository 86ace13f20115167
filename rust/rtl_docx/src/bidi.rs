/// LEFT-TO-RIGHT MARK.
pub const LRM: char = '\u{200E}';

fn is_mirrored_bracket(ch: char) -> bool {
    matches!(ch, '(' | ')' | '[' | ']' | '{' | '}')
}

/// Wraps every `()[]{}` in LRM marks so RTL layout does not mirror the glyph.
///
/// Not idempotent: the marks are not brackets, so a second pass wraps the
/// same brackets again. Apply once per raw piece of fragment text.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if is_mirrored_bracket(ch) {
            out.push(LRM);
            out.push(ch);
            out.push(LRM);
        } else {
            out.push(ch);
        }
    }
    out
}

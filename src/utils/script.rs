//! Escaping for JSON embedded in an HTML `<script>` element.

/// Escapes characters that could terminate a `<script>` element or break
/// JavaScript parsing. The result is still valid JSON that decodes to the same
/// value, since these characters can only occur inside JSON strings.
pub fn escape_script_json(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for ch in json.chars() {
        match ch {
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c => out.push(c),
        }
    }
    out
}

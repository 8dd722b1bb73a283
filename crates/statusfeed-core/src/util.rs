/// Escape text for inclusion in HTML or XML character data and attribute values.
///
/// Example: `"Orders & <Checkout>"` → `"Orders &amp; &lt;Checkout&gt;"`
pub fn escape_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

//! Named-placeholder template rendering

/// Renders a template by substituting `{name}` placeholders
///
/// Every placeholder in the template is replaced: names present in `params`
/// take their value, any other name renders as the empty string. A `{`
/// without a matching `}` is copied through literally.
///
/// # Example
///
/// ```
/// use wp_ingest::url::render_template;
///
/// let url = render_template("https://x.com/{field}{page}", &[("field", "posts")]);
/// assert_eq!(url, "https://x.com/posts");
/// ```
pub fn render_template(template: &str, params: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len() + 64);
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        match after.find('}') {
            Some(close) => {
                let name = &after[..close];
                if let Some((_, value)) = params.iter().find(|(key, _)| *key == name) {
                    out.push_str(value);
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}

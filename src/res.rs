#[macro_export]
macro_rules! include_res {
    (bytes, $p:expr) => {
        include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/res", $p))
    };
    (str, $p:expr) => {
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/res", $p))
    };
}

/// Directory served at `/static`.
pub const STATIC_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/res/static");

/// Fills `{key}` placeholders in a single pass.
///
/// Substituted values are never scanned again, so text containing `{name}` or
/// `{messages}` comes out verbatim. Unknown keys (CSS blocks, say) are left alone.
pub fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let hit = tail.find('}').and_then(|end| {
            let key = &tail[1..end];
            values
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, value)| (end, *value))
        });
        match hit {
            Some((end, value)) => {
                out.push_str(value);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Escapes text for use inside HTML element content and quoted attributes.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{escape_html, fill};

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html(r#"<b>"Ava" & 'Ben'</b>"#),
            "&lt;b&gt;&quot;Ava&quot; &amp; &#39;Ben&#39;&lt;/b&gt;"
        );
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn fill_does_not_rescan_values() {
        let out = fill(
            "<p>{name}</p><p>{message}</p>",
            &[("name", "{message}"), ("message", "hi")],
        );
        assert_eq!(out, "<p>{message}</p><p>hi</p>");
    }

    #[test]
    fn fill_keeps_unknown_braces() {
        assert_eq!(
            fill("body { margin: 0; } {x} {", &[("x", "1")]),
            "body { margin: 0; } 1 {"
        );
        assert_eq!(fill("no placeholders", &[]), "no placeholders");
    }
}

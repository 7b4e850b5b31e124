//! Minimal HTML building blocks for the server-rendered pages.

use axum::response::Html;

const STYLE: &str = r"
body { font-family: system-ui, sans-serif; max-width: 48rem; margin: 1rem auto; padding: 0 1rem; }
table { border-collapse: collapse; width: 100%; }
th, td { text-align: left; padding: 0.3rem 0.5rem; border-bottom: 1px solid #ddd; }
.error { color: #a00; }
.message { color: #070; }
form.inline { display: inline; }
nav a { margin-right: 1rem; }
";

/// Escape text for use in element content and quoted attributes.
pub fn escape(raw: &str) -> String {
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

/// Wrap a body in the shared page layout.
pub fn page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<style>{STYLE}</style>
</head>
<body>
<nav><a href="/">Home</a><a href="/leaderboard">Leaderboard</a><a href="/admin">Admin</a></nav>
<h1>{title}</h1>
{body}
</body>
</html>"#,
        title = escape(title),
    ))
}

/// Render optional success and error notices.
pub fn notices(message: Option<&str>, error: Option<&str>) -> String {
    let mut out = String::new();
    if let Some(error) = error {
        out.push_str(&format!(r#"<p class="error">{}</p>"#, escape(error)));
    }
    if let Some(message) = message {
        out.push_str(&format!(r#"<p class="message">{}</p>"#, escape(message)));
    }
    out
}

/// `<option>` list of categories, with `selected` preselected.
pub fn category_options(selected: &str) -> String {
    crate::competitor::Category::ALL
        .iter()
        .map(|c| {
            let value = c.to_string();
            let mark = if value == selected { " selected" } else { "" };
            format!(r#"<option value="{value}"{mark}>{}</option>"#, c.label())
        })
        .collect()
}

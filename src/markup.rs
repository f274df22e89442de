use std::sync::LazyLock;

use regex::Regex;

static UNCLOSED_IMG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(<img[^>]*[^/>])>").expect("unclosed img pattern is valid"));

/// Rewrites the handful of HTML-isms the backend emits that are not valid XHTML.
///
/// Only the first unclosed `<img ...>` on a page is rewritten.
pub fn normalize_legacy_markup(body: &str) -> String {
    let out = body
        .replace("&nbsp;", " ")
        .replace("<hr>", "<hr/>")
        .replace("<br>", "<br/>");
    UNCLOSED_IMG.replace(&out, "$1/>").into_owned()
}

/// Wraps a content body in a minimal XHTML document.
pub fn wrap_page_document(title: &str, body: &str) -> String {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str("<html xmlns=\"http://www.w3.org/1999/xhtml\" xmlns:epub=\"http://www.idpf.org/2007/ops\">\n");
    out.push_str("<head>\n");
    out.push_str(&format!("  <title>{}</title>\n", xml_escape(title)));
    out.push_str("</head>\n");
    out.push_str("<body>\n");
    out.push_str(body);
    if !body.ends_with('\n') {
        out.push('\n');
    }
    out.push_str("</body>\n");
    out.push_str("</html>\n");
    out
}

pub fn xml_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

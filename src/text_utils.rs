use ammonia::clean_text;

/// Convert plain text into paragraph HTML: blocks separated by blank lines
/// become `<p>` elements, single newlines inside a block become `<br>`.
/// All text content is HTML-escaped.
pub fn linebreaks(value: &str) -> String {
    let normalized = value.replace("\r\n", "\n").replace('\r', "\n");

    let mut paragraphs: Vec<String> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in normalized.split('\n') {
        if line.is_empty() {
            if !current.is_empty() {
                paragraphs.push(render_paragraph(&current));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(render_paragraph(&current));
    }

    paragraphs.join("\n\n")
}

fn render_paragraph(lines: &[&str]) -> String {
    let body = lines
        .iter()
        .map(|line| clean_text(line))
        .collect::<Vec<_>>()
        .join("<br>");
    format!("<p>{}</p>", body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_paragraph() {
        assert_eq!(linebreaks("hello world"), "<p>hello world</p>");
    }

    #[test]
    fn newline_becomes_br() {
        assert_eq!(linebreaks("one\ntwo"), "<p>one<br>two</p>");
    }

    #[test]
    fn blank_line_splits_paragraphs() {
        assert_eq!(linebreaks("one\n\ntwo"), "<p>one</p>\n\n<p>two</p>");
    }

    #[test]
    fn extra_blank_lines_do_not_create_empty_paragraphs() {
        assert_eq!(linebreaks("one\n\n\n\ntwo"), "<p>one</p>\n\n<p>two</p>");
        assert_eq!(linebreaks("\n\nonly\n\n"), "<p>only</p>");
    }

    #[test]
    fn carriage_returns_are_normalized() {
        assert_eq!(linebreaks("one\r\ntwo"), "<p>one<br>two</p>");
        assert_eq!(linebreaks("one\r\n\r\ntwo"), "<p>one</p>\n\n<p>two</p>");
    }

    #[test]
    fn html_is_escaped() {
        let html = linebreaks("<script>alert(1)</script>");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn empty_input_renders_nothing() {
        assert_eq!(linebreaks(""), "");
        assert_eq!(linebreaks("\n\n"), "");
    }
}

//! Plain text to compilable LaTeX document source.

pub const PREAMBLE: &str = "\\documentclass[11pt]{article}
\\usepackage[utf8]{inputenc}
\\usepackage[T1]{fontenc}
\\usepackage[margin=1in]{geometry}
\\usepackage{parskip}
\\pagestyle{empty}

\\begin{document}

";

pub const POSTAMBLE: &str = "

\\end{document}
";

/// Escapes the characters LaTeX treats as markup.
///
/// Single pass, so the braces introduced by a replacement are never escaped again.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 8);
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\textbackslash{}"),
            '~' => out.push_str("\\textasciitilde{}"),
            '^' => out.push_str("\\textasciicircum{}"),
            '&' | '%' | '$' | '#' | '_' | '{' | '}' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

/// Wraps escaped `text` in the fixed letter preamble/postamble
pub fn to_document(text: &str) -> String {
    format!("{}{}{}", PREAMBLE, escape(text), POSTAMBLE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_reserved_characters() {
        assert_eq!(escape("R&D 100% $5 #1 a_b {x}"), "R\\&D 100\\% \\$5 \\#1 a\\_b \\{x\\}");
        assert_eq!(escape("~^"), "\\textasciitilde{}\\textasciicircum{}");
    }

    #[test]
    fn test_backslash_replacement_braces_not_reescaped() {
        assert_eq!(escape("C:\\dir"), "C:\\textbackslash{}dir");
    }

    #[test]
    fn test_plain_text_untouched() {
        assert_eq!(escape("Dear Hiring Manager,\n\nThanks."), "Dear Hiring Manager,\n\nThanks.");
    }

    #[test]
    fn test_document_wraps_body() {
        let doc = to_document("Hello & welcome");
        assert!(doc.starts_with("\\documentclass"));
        assert!(doc.contains("\\begin{document}\n\nHello \\& welcome\n\n\\end{document}"));
        assert!(doc.ends_with("\\end{document}\n"));
    }
}

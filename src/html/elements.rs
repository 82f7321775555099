//! Element classification tables (names are expected lowercase).

/// Elements that never have content or an end tag.
pub fn is_void(name: &str) -> bool {
    matches!(
        name,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

/// Elements whose content is opaque text up to the matching end tag.
pub fn is_raw_text(name: &str) -> bool {
    matches!(name, "script" | "style" | "textarea" | "title" | "xmp")
}

/// Block-level elements: closing one of these at the top level is a safe
/// place to cut a document.
pub fn is_block(name: &str) -> bool {
    matches!(
        name,
        "address"
            | "article"
            | "aside"
            | "blockquote"
            | "center"
            | "details"
            | "dialog"
            | "dd"
            | "div"
            | "dl"
            | "dt"
            | "fieldset"
            | "figcaption"
            | "figure"
            | "footer"
            | "form"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "header"
            | "hgroup"
            | "hr"
            | "li"
            | "main"
            | "menu"
            | "nav"
            | "noscript"
            | "ol"
            | "p"
            | "pre"
            | "section"
            | "table"
            | "ul"
            | "br"
    )
}

/// Elements whose end tag may be omitted.
pub fn has_optional_end(name: &str) -> bool {
    matches!(
        name,
        "p" | "li"
            | "dt"
            | "dd"
            | "option"
            | "optgroup"
            | "tr"
            | "td"
            | "th"
            | "thead"
            | "tbody"
            | "tfoot"
            | "colgroup"
            | "rb"
            | "rt"
            | "rp"
    )
}

/// Whether a start tag `incoming` implicitly closes an open `open` element.
pub fn implicitly_closes(open: &str, incoming: &str) -> bool {
    if !has_optional_end(open) {
        return false;
    }
    match open {
        "p" => is_block(incoming) && incoming != "br",
        "li" => incoming == "li",
        "dt" | "dd" => matches!(incoming, "dt" | "dd"),
        "option" => matches!(incoming, "option" | "optgroup"),
        "optgroup" => incoming == "optgroup",
        "td" | "th" => matches!(incoming, "td" | "th" | "tr" | "tbody" | "thead" | "tfoot"),
        "tr" => matches!(incoming, "tr" | "tbody" | "thead" | "tfoot"),
        "thead" | "tbody" | "tfoot" => matches!(incoming, "tbody" | "tfoot"),
        "rb" | "rt" | "rp" => matches!(incoming, "rb" | "rt" | "rp"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paragraph_closed_by_block() {
        assert!(implicitly_closes("p", "div"));
        assert!(implicitly_closes("p", "p"));
        assert!(!implicitly_closes("p", "span"));
        assert!(!implicitly_closes("p", "br"));
    }

    #[test]
    fn test_table_cells() {
        assert!(implicitly_closes("td", "tr"));
        assert!(implicitly_closes("tr", "tr"));
        assert!(!implicitly_closes("tr", "td"));
    }

    #[test]
    fn test_required_end_tags_never_close_implicitly() {
        assert!(!implicitly_closes("div", "div"));
        assert!(!implicitly_closes("ul", "li"));
    }

    #[test]
    fn test_tables() {
        assert!(is_void("img"));
        assert!(!is_void("div"));
        assert!(is_raw_text("script"));
        assert!(has_optional_end("li"));
        assert!(!has_optional_end("div"));
    }
}

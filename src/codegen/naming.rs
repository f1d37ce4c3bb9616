//! Identifier conversion
//!
//! Interface specifications use camel case (`getElementById`, `DOMString`) and
//! occasionally spaces (`unsigned long`); generated Rust uses snake case for
//! functions and locals.

const RUST_KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "crate",
    "do", "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "if", "impl", "in",
    "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "self", "static", "struct", "super", "trait", "true", "try", "type", "typeof",
    "unsafe", "unsized", "use", "virtual", "where", "while", "yield",
];

/// Locals that generated trampolines declare themselves.
const RESERVED_LOCALS: &[&str] = &["info", "args", "instance", "result", "ctx"];

/// `getElementById` -> `get_element_by_id`, `DOMString` -> `dom_string`,
/// `unsigned long` -> `unsigned_long`.
pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_ascii_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if c.is_ascii_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            // `HTMLElement` splits before the `E` that starts the next word
            if prev.is_ascii_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_ascii_uppercase() && next_is_lower)
            {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c.to_ascii_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words.join("_")
}

/// `textContent` -> `TextContent`.
pub fn upper_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Snake-case identifier that does not collide with keywords or generated locals.
pub fn sanitize_ident(name: &str) -> String {
    let ident = to_snake_case(name);
    let needs_suffix = ident.is_empty()
        || ident.starts_with(|c: char| c.is_ascii_digit())
        || RUST_KEYWORDS.contains(&ident.as_str())
        || RESERVED_LOCALS.contains(&ident.as_str());
    if needs_suffix {
        format!("{}_", ident)
    } else {
        ident
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_snake_case_camel() {
        assert_eq!(to_snake_case("getElementById"), "get_element_by_id");
        assert_eq!(to_snake_case("textContent"), "text_content");
        assert_eq!(to_snake_case("appendChild"), "append_child");
    }

    #[test]
    fn test_snake_case_acronyms() {
        assert_eq!(to_snake_case("DOMString"), "dom_string");
        assert_eq!(to_snake_case("HTMLElement"), "html_element");
        assert_eq!(to_snake_case("innerHTML"), "inner_html");
        assert_eq!(to_snake_case("h1Element"), "h1_element");
    }

    #[test]
    fn test_snake_case_spaces() {
        assert_eq!(to_snake_case("unsigned long"), "unsigned_long");
        assert_eq!(to_snake_case("sequence Node"), "sequence_node");
    }

    #[test]
    fn test_upper_first() {
        assert_eq!(upper_first("textContent"), "TextContent");
        assert_eq!(upper_first(""), "");
    }

    #[test]
    fn test_sanitize_ident() {
        assert_eq!(sanitize_ident("type"), "type_");
        assert_eq!(sanitize_ident("info"), "info_");
        assert_eq!(sanitize_ident("newChild"), "new_child");
    }

    proptest! {
        #[test]
        fn test_snake_case_is_idempotent(name in "[a-zA-Z][a-zA-Z0-9 ]{0,24}") {
            let once = to_snake_case(&name);
            prop_assert_eq!(to_snake_case(&once), once.clone());
        }

        #[test]
        fn test_snake_case_charset(name in "[a-zA-Z][a-zA-Z0-9 _-]{0,24}") {
            let snake = to_snake_case(&name);
            prop_assert!(snake
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'));
            prop_assert!(!snake.contains("__"));
            prop_assert!(!snake.starts_with('_'));
        }
    }
}

pub fn truncate_utf8_prefix(value: &str, max_bytes: usize) -> String {
    if max_bytes == 0 {
        return String::new();
    }
    if value.len() <= max_bytes {
        return value.to_string();
    }
    let mut end = max_bytes;
    while end > 0 && !value.is_char_boundary(end) {
        end -= 1;
    }
    value[..end].to_string()
}

pub fn truncate_chars(value: &str, max_chars: usize) -> String {
    match value.char_indices().nth(max_chars) {
        Some((idx, _)) => value[..idx].to_string(),
        None => value.to_string(),
    }
}

pub fn apply_char_budget(text: String, limit: usize) -> String {
    let total = text.chars().count();
    if limit == 0 || total <= limit {
        return text;
    }
    let mut out = truncate_chars(&text, limit);
    out.push_str(&format!(
        "\n\n[truncated: {} characters omitted; request a smaller page or use per_page]",
        total - limit
    ));
    out
}

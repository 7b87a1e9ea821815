//! Text wrapping for console log lines

/// Greedy word wrap. Existing line breaks are kept; a single word longer than
/// `max_width` is left on its own line rather than split.
pub fn wrap_text(text: &str, max_width: usize) -> String {
    let mut wrapped: Vec<String> = Vec::new();

    for line in text.lines() {
        if line.chars().count() <= max_width {
            wrapped.push(line.to_string());
            continue;
        }

        let mut current = String::new();
        for word in line.split_whitespace() {
            let needed = if current.is_empty() {
                word.chars().count()
            } else {
                current.chars().count() + 1 + word.chars().count()
            };

            if !current.is_empty() && needed > max_width {
                wrapped.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        if !current.is_empty() {
            wrapped.push(current);
        }
    }

    wrapped.join("\n")
}

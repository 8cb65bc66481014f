use unicode_width::UnicodeWidthChar;

/// Breaks `input` into display rows of at most `width` columns, splitting
/// anywhere. Used for the prompt so the cursor maps to a single row/col.
pub fn wrap_input_lines(input: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = vec![String::new()];
    let mut used = 0usize;
    for ch in input.chars() {
        match ch {
            '\r' => continue,
            '\n' => {
                lines.push(String::new());
                used = 0;
                continue;
            }
            _ => {}
        }
        let ch_width = char_display_width(ch);
        if used + ch_width > width && used > 0 {
            lines.push(String::new());
            used = 0;
        }
        if let Some(line) = lines.last_mut() {
            line.push(ch);
        }
        used += ch_width;
    }
    lines
}

/// Word-wraps transcript text. Words wider than `width` are split.
pub fn wrap_words(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut rows = Vec::new();
    for paragraph in text.split('\n') {
        let paragraph = paragraph.trim_end_matches('\r');
        let mut row = String::new();
        let mut used = 0usize;
        for word in paragraph.split(' ') {
            let word_width = display_width(word);
            let gap = usize::from(used > 0);
            if used + gap + word_width <= width {
                if gap == 1 {
                    row.push(' ');
                }
                row.push_str(word);
                used += gap + word_width;
                continue;
            }
            if used > 0 {
                rows.push(std::mem::take(&mut row));
                used = 0;
            }
            for ch in word.chars() {
                let ch_width = char_display_width(ch);
                if used + ch_width > width && used > 0 {
                    rows.push(std::mem::take(&mut row));
                    used = 0;
                }
                row.push(ch);
                used += ch_width;
            }
        }
        rows.push(row);
    }
    rows
}

pub fn cursor_row_col(input: &str, cursor_byte: usize, width: usize) -> (usize, usize) {
    let width = width.max(1);
    let mut row = 0usize;
    let mut col = 0usize;
    let cursor_byte = clamp_to_char_boundary_left(input, cursor_byte);

    for ch in input[..cursor_byte].chars() {
        match ch {
            '\r' => continue,
            '\n' => {
                row += 1;
                col = 0;
                continue;
            }
            _ => {}
        }
        let ch_width = char_display_width(ch);
        if col + ch_width > width && col > 0 {
            row += 1;
            col = 0;
        }
        col += ch_width;
    }

    if col >= width {
        row += 1;
        col = 0;
    }
    (row, col)
}

pub fn truncate_to_display_width(text: &str, max_width: usize) -> String {
    let mut out = String::new();
    let mut used = 0usize;
    for ch in text.chars() {
        let ch_width = char_display_width(ch);
        if used + ch_width > max_width {
            break;
        }
        out.push(ch);
        used += ch_width;
    }
    out
}

pub fn char_display_width(ch: char) -> usize {
    UnicodeWidthChar::width(ch).unwrap_or(0)
}

pub fn display_width(text: &str) -> usize {
    text.chars().map(char_display_width).sum()
}

fn clamp_to_char_boundary_left(input: &str, cursor: usize) -> usize {
    let mut cursor = cursor.min(input.len());
    while cursor > 0 && !input.is_char_boundary(cursor) {
        cursor -= 1;
    }
    cursor
}

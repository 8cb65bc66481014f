use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Scroll steps for the transcript pane.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScrollAction {
    LineUp,
    LineDown,
    PageUp,
    PageDown,
    Home,
    End,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputAction {
    None,
    /// Enter on a non-blank buffer. The caller takes the text with
    /// [`InputEditor::submit`] once it knows a turn can start.
    Submit,
    CycleLanguage,
    NewConversation,
    Dismiss,
    Interrupt,
    Scroll(ScrollAction),
    Quit,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct EditorSnapshot {
    buffer: String,
    cursor: usize,
}

/// Multi-line prompt buffer with recall of previously sent messages.
///
/// `cursor` is a byte offset that always sits on a char boundary.
#[derive(Default, Debug)]
pub struct InputEditor {
    buffer: String,
    cursor: usize,
    sent: Vec<String>,
    recall_index: Option<usize>,
    recall_stash: Option<EditorSnapshot>,
}

impl InputEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_blank(&self) -> bool {
        self.buffer.trim().is_empty()
    }

    fn clamp_cursor_to_boundary_left(&self, mut idx: usize) -> usize {
        idx = idx.min(self.buffer.len());
        while idx > 0 && !self.buffer.is_char_boundary(idx) {
            idx -= 1;
        }
        idx
    }

    fn prev_char_boundary(&self, idx: usize) -> usize {
        let i = self.clamp_cursor_to_boundary_left(idx);
        self.buffer[..i]
            .char_indices()
            .next_back()
            .map_or(0, |(start, _)| start)
    }

    fn next_char_boundary(&self, idx: usize) -> usize {
        let i = self.clamp_cursor_to_boundary_left(idx);
        match self.buffer[i..].chars().next() {
            Some(ch) => i + ch.len_utf8(),
            None => self.buffer.len(),
        }
    }

    fn snapshot(&self) -> EditorSnapshot {
        EditorSnapshot {
            buffer: self.buffer.clone(),
            cursor: self.cursor,
        }
    }

    fn leave_recall(&mut self) {
        self.recall_index = None;
        self.recall_stash = None;
    }

    pub fn insert_str(&mut self, value: &str) {
        self.leave_recall();
        let cursor = self.clamp_cursor_to_boundary_left(self.cursor);
        self.buffer.insert_str(cursor, value);
        self.cursor = cursor + value.len();
    }

    pub fn backspace(&mut self) {
        let end = self.clamp_cursor_to_boundary_left(self.cursor);
        if end == 0 {
            return;
        }
        self.leave_recall();
        let start = self.prev_char_boundary(end);
        self.buffer.replace_range(start..end, "");
        self.cursor = start;
    }

    pub fn delete(&mut self) {
        let start = self.clamp_cursor_to_boundary_left(self.cursor);
        if start >= self.buffer.len() {
            return;
        }
        self.leave_recall();
        let end = self.next_char_boundary(start);
        self.buffer.replace_range(start..end, "");
        self.cursor = start;
    }

    /// Takes the trimmed buffer, or `None` when it is blank.
    pub fn submit(&mut self) -> Option<String> {
        let value = self.buffer.trim().to_string();
        if value.is_empty() {
            return None;
        }
        self.sent.push(value.clone());
        self.leave_recall();
        self.buffer.clear();
        self.cursor = 0;
        Some(value)
    }

    pub fn clear(&mut self) {
        self.leave_recall();
        self.buffer.clear();
        self.cursor = 0;
    }

    fn recall_previous(&mut self) {
        if self.sent.is_empty() {
            return;
        }
        if self.recall_index.is_none() {
            self.recall_stash = Some(self.snapshot());
        }
        let index = match self.recall_index {
            Some(idx) => idx.saturating_sub(1),
            None => self.sent.len() - 1,
        };
        self.recall_index = Some(index);
        self.buffer = self.sent[index].clone();
        self.cursor = self.buffer.len();
    }

    fn recall_next(&mut self) {
        let Some(idx) = self.recall_index else {
            return;
        };
        if idx + 1 < self.sent.len() {
            self.recall_index = Some(idx + 1);
            self.buffer = self.sent[idx + 1].clone();
            self.cursor = self.buffer.len();
            return;
        }
        self.recall_index = None;
        match self.recall_stash.take() {
            Some(stash) => {
                self.buffer = stash.buffer;
                self.cursor = self.clamp_cursor_to_boundary_left(stash.cursor);
            }
            None => {
                self.buffer.clear();
                self.cursor = 0;
            }
        }
    }

    pub fn apply_event(&mut self, event: Event) -> InputAction {
        match event {
            Event::Paste(text) => {
                self.insert_str(&text.replace("\r\n", "\n"));
                InputAction::None
            }
            Event::Key(key) if key.kind != KeyEventKind::Release => self.apply_key(key),
            _ => InputAction::None,
        }
    }

    pub fn apply_key(&mut self, key: KeyEvent) -> InputAction {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') if ctrl => return InputAction::Interrupt,
            KeyCode::Char('d') if ctrl => {
                if self.buffer.is_empty() {
                    return InputAction::Quit;
                }
            }
            KeyCode::Char('n') if ctrl => return InputAction::NewConversation,
            KeyCode::Char('j') if ctrl => self.insert_str("\n"),
            KeyCode::F(2) => return InputAction::CycleLanguage,
            KeyCode::Esc => return InputAction::Dismiss,
            KeyCode::Enter if key.modifiers.contains(KeyModifiers::SHIFT) => {
                self.insert_str("\n");
            }
            KeyCode::Enter => {
                if !self.is_blank() {
                    return InputAction::Submit;
                }
            }
            KeyCode::PageUp => return InputAction::Scroll(ScrollAction::PageUp),
            KeyCode::PageDown => return InputAction::Scroll(ScrollAction::PageDown),
            KeyCode::Home if ctrl => return InputAction::Scroll(ScrollAction::Home),
            KeyCode::End if ctrl => return InputAction::Scroll(ScrollAction::End),
            KeyCode::Up if ctrl => return InputAction::Scroll(ScrollAction::LineUp),
            KeyCode::Down if ctrl => return InputAction::Scroll(ScrollAction::LineDown),
            KeyCode::Up => self.recall_previous(),
            KeyCode::Down => self.recall_next(),
            KeyCode::Backspace => self.backspace(),
            KeyCode::Delete => self.delete(),
            KeyCode::Left => self.cursor = self.prev_char_boundary(self.cursor),
            KeyCode::Right => self.cursor = self.next_char_boundary(self.cursor),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.buffer.len(),
            KeyCode::Char(ch) if !ctrl && !key.modifiers.contains(KeyModifiers::ALT) => {
                self.insert_str(&ch.to_string());
            }
            _ => {}
        }
        InputAction::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(ch: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(ch), KeyModifiers::CONTROL)
    }

    fn type_text(editor: &mut InputEditor, text: &str) {
        for ch in text.chars() {
            editor.apply_key(key(KeyCode::Char(ch)));
        }
    }

    #[test]
    fn test_enter_on_blank_buffer_does_nothing() {
        let mut editor = InputEditor::new();
        type_text(&mut editor, "   ");
        assert_eq!(editor.apply_key(key(KeyCode::Enter)), InputAction::None);
        assert_eq!(editor.submit(), None);
    }

    #[test]
    fn test_submit_trims_and_clears() {
        let mut editor = InputEditor::new();
        type_text(&mut editor, "  fever since morning ");
        assert_eq!(editor.apply_key(key(KeyCode::Enter)), InputAction::Submit);
        assert_eq!(editor.submit().as_deref(), Some("fever since morning"));
        assert_eq!(editor.buffer(), "");
        assert_eq!(editor.cursor(), 0);
    }

    #[test]
    fn test_shift_enter_and_ctrl_j_insert_newlines() {
        let mut editor = InputEditor::new();
        type_text(&mut editor, "a");
        editor.apply_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::SHIFT));
        type_text(&mut editor, "b");
        editor.apply_key(ctrl('j'));
        type_text(&mut editor, "c");
        assert_eq!(editor.buffer(), "a\nb\nc");
    }

    #[test]
    fn test_backspace_removes_whole_multibyte_char() {
        let mut editor = InputEditor::new();
        type_text(&mut editor, "बुखार");
        editor.apply_key(key(KeyCode::Backspace));
        assert_eq!(editor.buffer(), "बुखा");
        editor.apply_key(key(KeyCode::Left));
        editor.apply_key(key(KeyCode::Delete));
        assert_eq!(editor.buffer(), "बुख");
    }

    #[test]
    fn test_recall_restores_stashed_draft() {
        let mut editor = InputEditor::new();
        type_text(&mut editor, "first");
        editor.submit();
        type_text(&mut editor, "second");
        editor.submit();
        type_text(&mut editor, "draft");

        editor.apply_key(key(KeyCode::Up));
        assert_eq!(editor.buffer(), "second");
        editor.apply_key(key(KeyCode::Up));
        assert_eq!(editor.buffer(), "first");
        editor.apply_key(key(KeyCode::Down));
        editor.apply_key(key(KeyCode::Down));
        assert_eq!(editor.buffer(), "draft");
    }

    #[test]
    fn test_control_keys_map_to_actions() {
        let mut editor = InputEditor::new();
        assert_eq!(editor.apply_key(ctrl('c')), InputAction::Interrupt);
        assert_eq!(editor.apply_key(ctrl('n')), InputAction::NewConversation);
        assert_eq!(editor.apply_key(key(KeyCode::F(2))), InputAction::CycleLanguage);
        assert_eq!(editor.apply_key(key(KeyCode::Esc)), InputAction::Dismiss);
        assert_eq!(
            editor.apply_key(key(KeyCode::PageUp)),
            InputAction::Scroll(ScrollAction::PageUp)
        );
        assert_eq!(editor.apply_key(ctrl('d')), InputAction::Quit);

        type_text(&mut editor, "x");
        assert_eq!(editor.apply_key(ctrl('d')), InputAction::None);
    }

    #[test]
    fn test_paste_normalizes_crlf() {
        let mut editor = InputEditor::new();
        editor.apply_event(Event::Paste("line one\r\nline two".to_string()));
        assert_eq!(editor.buffer(), "line one\nline two");
    }
}

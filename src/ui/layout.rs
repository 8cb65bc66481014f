use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Vertical panes of the chat screen, top to bottom.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChatLayout {
    pub header: Rect,
    pub history: Rect,
    pub status: Rect,
    pub input: Rect,
    pub footer: Rect,
}

pub fn split_chat_layout(area: Rect, input_rows: u16) -> ChatLayout {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(input_rows.max(1)),
            Constraint::Length(1),
        ])
        .split(area);

    ChatLayout {
        header: chunks[0],
        history: chunks[1],
        status: chunks[2],
        input: chunks[3],
        footer: chunks[4],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_stacks_five_panes() {
        let area = Rect::new(0, 0, 80, 20);
        let panes = split_chat_layout(area, 3);

        assert_eq!(panes.header.height, 1);
        assert_eq!(panes.history.height, 14);
        assert_eq!(panes.status.height, 1);
        assert_eq!(panes.input.height, 3);
        assert_eq!(panes.footer.height, 1);
        assert_eq!(panes.history.y, 1);
        assert_eq!(panes.status.y, 15);
        assert_eq!(panes.input.y, 16);
        assert_eq!(panes.footer.y, 19);
    }

    #[test]
    fn layout_gives_input_at_least_one_row() {
        let panes = split_chat_layout(Rect::new(0, 0, 40, 10), 0);
        assert_eq!(panes.input.height, 1);
        assert_eq!(panes.history.height, 6);
    }
}

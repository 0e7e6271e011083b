use std::path::PathBuf;

use ragcv_core::{OpKind, Session, Tab};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// What keystrokes go to while in [`InputMode::Editing`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditTarget {
    Query,
    Source,
}

pub struct App {
    pub session: Session,
    pub base_url: String,
    pub log_path: Option<PathBuf>,
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub edit_target: EditTarget,
    pub query_input: String,
    pub query_cursor: usize,
    pub source_cursor: usize,
    pub animation_frame: usize,
    pub status: Option<String>,
    scroll: [u16; 5],
}

impl App {
    pub fn new(session: Session, base_url: String, log_path: Option<PathBuf>) -> Self {
        Self {
            session,
            base_url,
            log_path,
            should_quit: false,
            input_mode: InputMode::Normal,
            edit_target: EditTarget::Query,
            query_input: String::new(),
            query_cursor: 0,
            source_cursor: 0,
            animation_frame: 0,
            status: None,
            scroll: [0; 5],
        }
    }

    pub fn active_tab(&self) -> Tab {
        self.session.active_tab()
    }

    pub fn select_tab(&mut self, tab: Tab) {
        self.session.set_active_tab(tab);
    }

    pub fn next_tab(&mut self) {
        self.select_tab(self.active_tab().next());
    }

    pub fn prev_tab(&mut self) {
        self.select_tab(self.active_tab().prev());
    }

    pub fn scroll(&self, tab: Tab) -> u16 {
        self.scroll[tab.index()]
    }

    pub fn set_scroll(&mut self, tab: Tab, offset: u16) {
        self.scroll[tab.index()] = offset;
    }

    pub fn scroll_down(&mut self, lines: u16) {
        let slot = &mut self.scroll[self.session.active_tab().index()];
        *slot = slot.saturating_add(lines);
    }

    pub fn scroll_up(&mut self, lines: u16) {
        let slot = &mut self.scroll[self.session.active_tab().index()];
        *slot = slot.saturating_sub(lines);
    }

    pub fn scroll_top(&mut self) {
        self.scroll[self.session.active_tab().index()] = 0;
    }

    pub fn is_busy(&self) -> bool {
        OpKind::all().iter().any(|kind| self.session.is_loading(*kind))
    }

    pub fn tick_animation(&mut self) {
        if self.is_busy() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    /// LaTeX tab edits the document source; every other tab edits the query on Output.
    pub fn start_editing(&mut self) {
        if self.active_tab() == Tab::Typeset {
            self.edit_target = EditTarget::Source;
            self.clamp_source_cursor();
        } else {
            self.edit_target = EditTarget::Query;
            self.select_tab(Tab::Output);
        }
        self.input_mode = InputMode::Editing;
    }

    pub fn stop_editing(&mut self) {
        self.input_mode = InputMode::Normal;
    }

    pub fn submit_query(&mut self) {
        if self.session.submit_query(&self.query_input) {
            self.set_scroll(Tab::Output, 0);
            self.status = None;
        } else {
            self.status = Some("Enter a query first".to_string());
        }
    }

    // Query input

    pub fn query_insert(&mut self, c: char) {
        let idx = char_to_byte_index(&self.query_input, self.query_cursor);
        self.query_input.insert(idx, c);
        self.query_cursor += 1;
    }

    pub fn query_backspace(&mut self) {
        if self.query_cursor == 0 {
            return;
        }
        self.query_cursor -= 1;
        let idx = char_to_byte_index(&self.query_input, self.query_cursor);
        self.query_input.remove(idx);
    }

    pub fn query_left(&mut self) {
        self.query_cursor = self.query_cursor.saturating_sub(1);
    }

    pub fn query_right(&mut self) {
        self.query_cursor = (self.query_cursor + 1).min(self.query_input.chars().count());
    }

    pub fn query_home(&mut self) {
        self.query_cursor = 0;
    }

    pub fn query_end(&mut self) {
        self.query_cursor = self.query_input.chars().count();
    }

    // Source editor. Each change hands the full text to the session, which
    // latches the manual-edit guard and restarts the compile debounce.

    /// Generated text can replace the source under the cursor.
    pub fn clamp_source_cursor(&mut self) {
        self.source_cursor = self.source_cursor.min(self.session.source().chars().count());
    }

    pub fn source_insert(&mut self, text: &str) {
        self.clamp_source_cursor();
        let mut source = self.session.source().to_string();
        let idx = char_to_byte_index(&source, self.source_cursor);
        source.insert_str(idx, text);
        self.source_cursor += text.chars().count();
        self.session.edit_source(source);
    }

    pub fn source_backspace(&mut self) {
        self.clamp_source_cursor();
        if self.source_cursor == 0 {
            return;
        }
        let mut source = self.session.source().to_string();
        self.source_cursor -= 1;
        let idx = char_to_byte_index(&source, self.source_cursor);
        source.remove(idx);
        self.session.edit_source(source);
    }

    pub fn source_delete(&mut self) {
        self.clamp_source_cursor();
        let mut source = self.session.source().to_string();
        if self.source_cursor >= source.chars().count() {
            return;
        }
        let idx = char_to_byte_index(&source, self.source_cursor);
        source.remove(idx);
        self.session.edit_source(source);
    }

    pub fn source_left(&mut self) {
        self.clamp_source_cursor();
        self.source_cursor = self.source_cursor.saturating_sub(1);
    }

    pub fn source_right(&mut self) {
        let len = self.session.source().chars().count();
        self.source_cursor = (self.source_cursor + 1).min(len);
    }

    pub fn source_up(&mut self) {
        let source = self.session.source();
        let (line, col) = line_col(source, self.source_cursor);
        if line > 0 {
            self.source_cursor = cursor_at(source, line - 1, col);
        }
    }

    pub fn source_down(&mut self) {
        let source = self.session.source();
        let (line, col) = line_col(source, self.source_cursor);
        self.source_cursor = cursor_at(source, line + 1, col);
    }

    pub fn source_home(&mut self) {
        let source = self.session.source();
        let (line, _) = line_col(source, self.source_cursor);
        self.source_cursor = cursor_at(source, line, 0);
    }

    pub fn source_end(&mut self) {
        let source = self.session.source();
        let (line, _) = line_col(source, self.source_cursor);
        self.source_cursor = cursor_at(source, line, usize::MAX);
    }
}

/// Convert a character index to a byte index for UTF-8 safe string operations
pub fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Zero-based (line, column) of a character index, both in chars.
pub fn line_col(text: &str, cursor: usize) -> (usize, usize) {
    let mut line = 0;
    let mut col = 0;
    for c in text.chars().take(cursor) {
        if c == '\n' {
            line += 1;
            col = 0;
        } else {
            col += 1;
        }
    }
    (line, col)
}

/// Character index for (line, column), clamped to the line's end and the last line.
pub fn cursor_at(text: &str, line: usize, col: usize) -> usize {
    let mut index = 0;
    let line_count = text.split('\n').count();
    let target = line.min(line_count.saturating_sub(1));
    for (i, content) in text.split('\n').enumerate() {
        let width = content.chars().count();
        if i == target {
            return index + col.min(width);
        }
        index += width + 1;
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_to_byte_index_handles_multibyte() {
        assert_eq!(char_to_byte_index("añb", 2), 3);
        assert_eq!(char_to_byte_index("añb", 9), 4);
    }

    #[test]
    fn test_line_col_and_back() {
        let text = "ab\ncdef\n\ng";
        assert_eq!(line_col(text, 0), (0, 0));
        assert_eq!(line_col(text, 5), (1, 2));
        assert_eq!(line_col(text, 8), (2, 0));
        assert_eq!(cursor_at(text, 1, 2), 5);
        assert_eq!(cursor_at(text, 0, 10), 2);
        assert_eq!(cursor_at(text, 2, 3), 8);
        assert_eq!(cursor_at(text, 7, 0), 9);
        assert_eq!(cursor_at("", 0, 4), 0);
    }
}

use crate::annotation::history::AnnotationHistory;
use crate::annotation::model::{palette, AnnotationElement, BackgroundBoard, Tool, ToolSelection};
use crate::compositor::raster::Rgba;
use crate::geometry::Point;
use crate::input::{InputEvent, Key, Modifiers};
use tracing::debug;

const MIN_POINT_DISTANCE: f32 = 1.0;

/// Pointer gesture capture and drawing shortcuts for one drawing session.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawingSession {
    selection: ToolSelection,
    highlighter: bool,
    board: BackgroundBoard,
    history: AnnotationHistory,
    in_progress: Option<AnnotationElement>,
    text_entry: Option<AnnotationElement>,
    restore_tool: Option<Tool>,
}

impl DrawingSession {
    pub fn new(selection: ToolSelection) -> Self {
        let selection = selection.sanitized();
        Self {
            highlighter: selection.tool == Tool::Highlighter,
            selection,
            board: BackgroundBoard::Transparent,
            history: AnnotationHistory::default(),
            in_progress: None,
            text_entry: None,
            restore_tool: None,
        }
    }

    pub fn selection(&self) -> ToolSelection {
        self.selection
    }

    pub fn set_selection(&mut self, selection: ToolSelection) {
        let selection = selection.sanitized();
        self.highlighter = selection.tool == Tool::Highlighter;
        self.selection = selection;
    }

    pub fn board(&self) -> BackgroundBoard {
        self.board
    }

    pub fn elements(&self) -> &[AnnotationElement] {
        self.history.elements()
    }

    pub fn history(&self) -> &AnnotationHistory {
        &self.history
    }

    /// The element being drawn or typed, if any.
    pub fn in_progress(&self) -> Option<&AnnotationElement> {
        self.in_progress.as_ref().or(self.text_entry.as_ref())
    }

    pub fn is_gesture_active(&self) -> bool {
        self.in_progress.is_some()
    }

    fn effective_tool(&self) -> Tool {
        match self.selection.tool {
            Tool::Pen | Tool::Highlighter if self.highlighter => Tool::Highlighter,
            Tool::Highlighter => Tool::Pen,
            other => other,
        }
    }

    /// Routes one surface event. Returns `true` when the event changed what is drawn.
    pub fn handle_input(&mut self, event: &InputEvent) -> bool {
        match event {
            InputEvent::PointerDown {
                position,
                modifiers,
            } => self.pointer_down(*position, *modifiers),
            InputEvent::PointerMove { position, .. } => self.pointer_move(*position),
            InputEvent::PointerUp { position, .. } => self.pointer_up(*position),
            InputEvent::Key { key, modifiers } => self.handle_key(*key, *modifiers),
            InputEvent::Text(c) => self.type_char(*c),
            InputEvent::Scroll { .. } | InputEvent::Pinch { .. } => false,
        }
    }

    pub fn pointer_down(&mut self, position: Point, modifiers: Modifiers) -> bool {
        if self.in_progress.is_some() {
            return false;
        }
        self.commit_text_entry();

        let override_tool = match (modifiers.ctrl, modifiers.shift) {
            (true, true) => Some(Tool::Arrow),
            (true, false) => Some(Tool::Rectangle),
            (false, true) => Some(Tool::Line),
            (false, false) => None,
        };
        if let Some(tool) = override_tool {
            if self.restore_tool.is_none() {
                self.restore_tool = Some(self.selection.tool);
            }
            self.selection.tool = tool;
        }

        let tool = self.effective_tool();
        let element =
            AnnotationElement::new(tool, self.selection.color, self.selection.stroke_width, position);
        if tool == Tool::Text {
            self.text_entry = Some(element.with_text(String::new()));
            self.restore_original_tool();
        } else {
            self.in_progress = Some(element);
        }
        true
    }

    pub fn pointer_move(&mut self, position: Point) -> bool {
        let Some(element) = self.in_progress.as_mut() else {
            return false;
        };
        if element.tool.is_freehand() {
            if let Some(last) = element.last_point() {
                if last.distance(position) < MIN_POINT_DISTANCE {
                    return false;
                }
            }
        }
        element.extend_to(position);
        true
    }

    pub fn pointer_up(&mut self, position: Point) -> bool {
        let Some(mut element) = self.in_progress.take() else {
            return false;
        };
        element.extend_to(position);
        self.restore_original_tool();

        let degenerate = !element.tool.is_freehand()
            && match (element.first_point(), element.last_point()) {
                (Some(first), Some(last)) => first == last,
                _ => true,
            };
        if degenerate {
            debug!(tool = ?element.tool, "dropping zero-size annotation");
        } else {
            self.history.add(element);
        }
        true
    }

    fn restore_original_tool(&mut self) {
        if let Some(tool) = self.restore_tool.take() {
            self.selection.tool = tool;
        }
    }

    fn type_char(&mut self, c: char) -> bool {
        let Some(text) = self.text_entry.as_mut().and_then(|e| e.text.as_mut()) else {
            return false;
        };
        if c.is_control() {
            return false;
        }
        text.push(c);
        true
    }

    /// Commits the text being typed; an empty entry is discarded.
    pub fn commit_text_entry(&mut self) -> bool {
        let Some(element) = self.text_entry.take() else {
            return false;
        };
        if element.text.as_deref().is_some_and(|t| !t.trim().is_empty()) {
            self.history.add(element);
            return true;
        }
        false
    }

    /// Adds a finished text annotation at `at`.
    pub fn commit_text(&mut self, at: Point, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        let element =
            AnnotationElement::new(Tool::Text, self.selection.color, self.selection.stroke_width, at)
                .with_text(text);
        self.history.add(element);
    }

    pub fn handle_key(&mut self, key: Key, modifiers: Modifiers) -> bool {
        if self.text_entry.is_some() {
            return self.handle_text_entry_key(key);
        }

        if modifiers.ctrl {
            return match key {
                Key::Char('Z') => self.undo(),
                _ => false,
            };
        }

        if let Key::Char(c) = key {
            if let Some(color) = quick_color(c) {
                self.selection.color = color;
                self.highlighter = modifiers.shift;
                if modifiers.shift && !self.selection.tool.is_freehand() {
                    self.selection.tool = Tool::Pen;
                }
                return true;
            }
        }

        match key {
            Key::Char('W') => {
                self.board = self.board.toggled(BackgroundBoard::Whiteboard);
                true
            }
            Key::Char('K') => {
                self.board = self.board.toggled(BackgroundBoard::Blackboard);
                true
            }
            Key::Char('E') => {
                self.clear();
                self.board = BackgroundBoard::Transparent;
                true
            }
            Key::Tab => {
                if self.selection.tool != Tool::Circle && self.restore_tool.is_none() {
                    self.restore_tool = Some(self.selection.tool);
                    self.selection.tool = Tool::Circle;
                }
                true
            }
            _ => false,
        }
    }

    fn handle_text_entry_key(&mut self, key: Key) -> bool {
        match key {
            Key::Enter => {
                self.commit_text_entry();
                true
            }
            Key::Escape => {
                self.text_entry = None;
                true
            }
            Key::Backspace => {
                if let Some(text) = self.text_entry.as_mut().and_then(|e| e.text.as_mut()) {
                    text.pop();
                }
                true
            }
            _ => false,
        }
    }

    /// Whether Escape should be consumed by the session instead of leaving the mode.
    pub fn wants_escape(&self) -> bool {
        self.text_entry.is_some()
    }

    pub fn undo(&mut self) -> bool {
        self.history.undo()
    }

    pub fn clear(&mut self) {
        self.in_progress = None;
        self.text_entry = None;
        self.history.clear();
    }

    /// Drops annotations, history and board. Used when the session ends.
    pub fn reset(&mut self) {
        self.in_progress = None;
        self.text_entry = None;
        self.restore_original_tool();
        self.history.reset();
        self.board = BackgroundBoard::Transparent;
    }
}

pub fn quick_color(c: char) -> Option<Rgba> {
    match c.to_ascii_uppercase() {
        'R' => Some(palette::RED),
        'G' => Some(palette::GREEN),
        'B' => Some(palette::BLUE),
        'Y' => Some(palette::YELLOW),
        'O' => Some(palette::ORANGE),
        'P' => Some(palette::PINK),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> DrawingSession {
        DrawingSession::new(ToolSelection::default())
    }

    fn stroke(session: &mut DrawingSession, from: Point, to: Point, modifiers: Modifiers) {
        session.pointer_down(from, modifiers);
        session.pointer_move(Point::new((from.x + to.x) / 2.0, (from.y + to.y) / 2.0));
        session.pointer_up(to);
    }

    #[test]
    fn pen_stroke_commits_single_element() {
        let mut s = session();
        stroke(&mut s, Point::new(0.0, 0.0), Point::new(20.0, 0.0), Modifiers::NONE);
        assert_eq!(s.elements().len(), 1);
        assert_eq!(s.elements()[0].tool, Tool::Pen);
        assert_eq!(s.elements()[0].points.len(), 3);
        assert!(s.in_progress().is_none());
    }

    #[test]
    fn modifier_override_is_restored_on_pointer_up() {
        let mut s = session();
        stroke(&mut s, Point::ZERO, Point::new(30.0, 30.0), Modifiers::ctrl_shift());
        stroke(&mut s, Point::ZERO, Point::new(30.0, 30.0), Modifiers::ctrl());
        stroke(&mut s, Point::ZERO, Point::new(30.0, 30.0), Modifiers::shift());
        let tools: Vec<Tool> = s.elements().iter().map(|e| e.tool).collect();
        assert_eq!(tools, vec![Tool::Arrow, Tool::Rectangle, Tool::Line]);
        assert_eq!(s.selection().tool, Tool::Pen);
    }

    #[test]
    fn shift_color_key_switches_to_highlighter() {
        let mut s = session();
        assert!(s.handle_key(Key::Char('Y'), Modifiers::shift()));
        stroke(&mut s, Point::ZERO, Point::new(10.0, 0.0), Modifiers::NONE);
        assert_eq!(s.elements()[0].tool, Tool::Highlighter);
        assert_eq!(s.elements()[0].color, palette::YELLOW);

        s.handle_key(Key::Char('G'), Modifiers::NONE);
        stroke(&mut s, Point::ZERO, Point::new(10.0, 0.0), Modifiers::NONE);
        assert_eq!(s.elements()[1].tool, Tool::Pen);
    }

    #[test]
    fn tab_selects_circle_for_one_stroke() {
        let mut s = session();
        s.handle_key(Key::Tab, Modifiers::NONE);
        stroke(&mut s, Point::ZERO, Point::new(10.0, 0.0), Modifiers::NONE);
        assert_eq!(s.elements()[0].tool, Tool::Circle);
        assert_eq!(s.selection().tool, Tool::Pen);
    }

    #[test]
    fn clear_key_resets_board_and_undo_brings_elements_back() {
        let mut s = session();
        stroke(&mut s, Point::ZERO, Point::new(10.0, 0.0), Modifiers::NONE);
        s.handle_key(Key::Char('K'), Modifiers::NONE);
        assert_eq!(s.board(), BackgroundBoard::Blackboard);
        s.handle_key(Key::Char('E'), Modifiers::NONE);
        assert!(s.elements().is_empty());
        assert_eq!(s.board(), BackgroundBoard::Transparent);
        assert!(s.handle_key(Key::Char('Z'), Modifiers::ctrl()));
        assert_eq!(s.elements().len(), 1);
    }

    #[test]
    fn click_without_drag_drops_shape() {
        let mut s = session();
        s.pointer_down(Point::new(5.0, 5.0), Modifiers::ctrl());
        s.pointer_up(Point::new(5.0, 5.0));
        assert!(s.elements().is_empty());
    }

    #[test]
    fn text_entry_types_and_commits_on_enter() {
        let mut s = session();
        s.set_selection(ToolSelection {
            tool: Tool::Text,
            ..ToolSelection::default()
        });
        s.pointer_down(Point::new(40.0, 40.0), Modifiers::NONE);
        for c in "Hi!".chars() {
            s.handle_input(&InputEvent::Text(c));
        }
        assert!(!s.handle_key(Key::Char('R'), Modifiers::NONE));
        assert_eq!(s.selection().color, palette::RED);
        assert!(s.wants_escape());
        s.handle_key(Key::Enter, Modifiers::NONE);
        assert_eq!(s.elements()[0].text.as_deref(), Some("Hi!"));
        assert!(!s.wants_escape());
    }

    #[test]
    fn reset_drops_everything() {
        let mut s = session();
        stroke(&mut s, Point::ZERO, Point::new(10.0, 0.0), Modifiers::NONE);
        s.handle_key(Key::Char('W'), Modifiers::NONE);
        s.reset();
        assert!(s.elements().is_empty());
        assert_eq!(s.history().undo_len(), 0);
        assert_eq!(s.board(), BackgroundBoard::Transparent);
    }
}

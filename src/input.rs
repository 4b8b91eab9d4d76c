use crate::geometry::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        ctrl: false,
        shift: false,
        alt: false,
    };

    pub const fn ctrl() -> Self {
        Self {
            ctrl: true,
            shift: false,
            alt: false,
        }
    }

    pub const fn shift() -> Self {
        Self {
            ctrl: false,
            shift: true,
            alt: false,
        }
    }

    pub const fn ctrl_shift() -> Self {
        Self {
            ctrl: true,
            shift: true,
            alt: false,
        }
    }
}

/// Keys the engine reacts to. Letters are stored upper-case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Plus,
    Minus,
    Space,
    Enter,
    Tab,
    Backspace,
    Escape,
    Up,
    Down,
    Left,
    Right,
}

impl Key {
    pub fn from_char(c: char) -> Key {
        match c {
            '+' | '=' => Key::Plus,
            '-' | '_' => Key::Minus,
            ' ' => Key::Space,
            '\t' => Key::Tab,
            '\n' | '\r' => Key::Enter,
            other => Key::Char(other.to_ascii_uppercase()),
        }
    }

    pub fn digit(self) -> Option<u32> {
        match self {
            Key::Char(c) => c.to_digit(10),
            _ => None,
        }
    }
}

/// Input delivered by an overlay surface, in the surface's view coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    PointerDown { position: Point, modifiers: Modifiers },
    PointerMove { position: Point, modifiers: Modifiers },
    PointerUp { position: Point, modifiers: Modifiers },
    /// Positive `delta` scrolls up.
    Scroll { position: Point, delta: f32, modifiers: Modifiers },
    Pinch { position: Point, magnification: f32 },
    Key { key: Key, modifiers: Modifiers },
    /// Printable text typed while a surface has focus.
    Text(char),
}

impl InputEvent {
    pub fn position(&self) -> Option<Point> {
        match self {
            InputEvent::PointerDown { position, .. }
            | InputEvent::PointerMove { position, .. }
            | InputEvent::PointerUp { position, .. }
            | InputEvent::Scroll { position, .. }
            | InputEvent::Pinch { position, .. } => Some(*position),
            InputEvent::Key { .. } | InputEvent::Text(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_from_char_normalises_case_and_symbols() {
        assert_eq!(Key::from_char('r'), Key::Char('R'));
        assert_eq!(Key::from_char('='), Key::Plus);
        assert_eq!(Key::from_char('3').digit(), Some(3));
        assert_eq!(Key::Space.digit(), None);
    }
}

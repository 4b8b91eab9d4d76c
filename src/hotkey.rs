use crate::input::{Key, Modifiers};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hotkey {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl Hotkey {
    pub fn new(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }
}

impl fmt::Display for Hotkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.ctrl {
            f.write_str("Ctrl+")?;
        }
        if self.modifiers.shift {
            f.write_str("Shift+")?;
        }
        if self.modifiers.alt {
            f.write_str("Alt+")?;
        }
        match self.key {
            Key::Char(c) => write!(f, "{c}"),
            Key::Plus => f.write_str("Plus"),
            Key::Minus => f.write_str("Minus"),
            Key::Space => f.write_str("Space"),
            Key::Enter => f.write_str("Enter"),
            Key::Tab => f.write_str("Tab"),
            Key::Backspace => f.write_str("Backspace"),
            Key::Escape => f.write_str("Esc"),
            Key::Up => f.write_str("Up"),
            Key::Down => f.write_str("Down"),
            Key::Left => f.write_str("Left"),
            Key::Right => f.write_str("Right"),
        }
    }
}

/// Parse a hotkey string like "Ctrl+Shift+3" into a [`Hotkey`].
pub fn parse_hotkey(s: &str) -> Option<Hotkey> {
    let mut modifiers = Modifiers::NONE;
    let mut key: Option<Key> = None;

    for part in s.split('+') {
        let upper = part.trim().to_ascii_uppercase();
        match upper.as_str() {
            "CTRL" | "CONTROL" => modifiers.ctrl = true,
            "SHIFT" => modifiers.shift = true,
            "ALT" => modifiers.alt = true,
            "" => {}
            _ => {
                if key.is_some() {
                    return None;
                }
                key = Some(parse_key(&upper)?);
            }
        }
    }

    key.map(|key| Hotkey { key, modifiers })
}

fn parse_key(upper: &str) -> Option<Key> {
    match upper {
        "SPACE" => Some(Key::Space),
        "TAB" => Some(Key::Tab),
        "ENTER" | "RETURN" => Some(Key::Enter),
        "ESC" | "ESCAPE" => Some(Key::Escape),
        "BACKSPACE" => Some(Key::Backspace),
        "PLUS" => Some(Key::Plus),
        "MINUS" => Some(Key::Minus),
        "LEFT" | "LEFTARROW" => Some(Key::Left),
        "RIGHT" | "RIGHTARROW" => Some(Key::Right),
        "UP" | "UPARROW" => Some(Key::Up),
        "DOWN" | "DOWNARROW" => Some(Key::Down),
        _ => {
            let mut chars = upper.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii_alphanumeric() => Some(Key::Char(c)),
                _ => None,
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HotkeyCommand {
    ToggleDrawing,
    ToggleZoom,
    ToggleHighlight,
    ToggleSpotlight,
    ToggleTimer,
    ClearAnnotations,
    Escape,
    CycleHighlightStyle,
    CycleHighlightColor,
    ToggleSpotlightZoom,
}

fn default_drawing() -> String {
    "Ctrl+1".into()
}
fn default_zoom() -> String {
    "Ctrl+2".into()
}
fn default_highlight() -> String {
    "Ctrl+3".into()
}
fn default_spotlight() -> String {
    "Ctrl+4".into()
}
fn default_timer() -> String {
    "Ctrl+5".into()
}
fn default_clear() -> String {
    "Ctrl+Shift+C".into()
}
fn default_escape() -> String {
    "Esc".into()
}
fn default_cycle_style() -> String {
    "Ctrl+Shift+3".into()
}
fn default_cycle_color() -> String {
    "Ctrl+Alt+3".into()
}
fn default_spotlight_zoom() -> String {
    "Ctrl+Shift+4".into()
}

/// Hotkey strings as stored in the settings file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotkeyBindings {
    #[serde(default = "default_drawing")]
    pub drawing: String,
    #[serde(default = "default_zoom")]
    pub zoom: String,
    #[serde(default = "default_highlight")]
    pub highlight: String,
    #[serde(default = "default_spotlight")]
    pub spotlight: String,
    #[serde(default = "default_timer")]
    pub timer: String,
    #[serde(default = "default_clear")]
    pub clear: String,
    #[serde(default = "default_escape")]
    pub escape: String,
    #[serde(default = "default_cycle_style")]
    pub cycle_highlight_style: String,
    #[serde(default = "default_cycle_color")]
    pub cycle_highlight_color: String,
    #[serde(default = "default_spotlight_zoom")]
    pub toggle_spotlight_zoom: String,
}

impl Default for HotkeyBindings {
    fn default() -> Self {
        Self {
            drawing: default_drawing(),
            zoom: default_zoom(),
            highlight: default_highlight(),
            spotlight: default_spotlight(),
            timer: default_timer(),
            clear: default_clear(),
            escape: default_escape(),
            cycle_highlight_style: default_cycle_style(),
            cycle_highlight_color: default_cycle_color(),
            toggle_spotlight_zoom: default_spotlight_zoom(),
        }
    }
}

impl HotkeyBindings {
    fn entries(&self) -> [(&str, HotkeyCommand, fn() -> String); 10] {
        [
            (self.drawing.as_str(), HotkeyCommand::ToggleDrawing, default_drawing),
            (self.zoom.as_str(), HotkeyCommand::ToggleZoom, default_zoom),
            (self.highlight.as_str(), HotkeyCommand::ToggleHighlight, default_highlight),
            (self.spotlight.as_str(), HotkeyCommand::ToggleSpotlight, default_spotlight),
            (self.timer.as_str(), HotkeyCommand::ToggleTimer, default_timer),
            (self.clear.as_str(), HotkeyCommand::ClearAnnotations, default_clear),
            (self.escape.as_str(), HotkeyCommand::Escape, default_escape),
            (
                self.cycle_highlight_style.as_str(),
                HotkeyCommand::CycleHighlightStyle,
                default_cycle_style,
            ),
            (
                self.cycle_highlight_color.as_str(),
                HotkeyCommand::CycleHighlightColor,
                default_cycle_color,
            ),
            (
                self.toggle_spotlight_zoom.as_str(),
                HotkeyCommand::ToggleSpotlightZoom,
                default_spotlight_zoom,
            ),
        ]
    }

    /// Resolves every binding. Unparsable strings fall back to the default binding.
    pub fn table(&self) -> HotkeyTable {
        let bindings = self
            .entries()
            .into_iter()
            .filter_map(|(text, command, fallback)| {
                let hotkey = parse_hotkey(text).or_else(|| {
                    let default = fallback();
                    warn!(hotkey = text, ?command, fallback = %default, "invalid hotkey");
                    parse_hotkey(&default)
                })?;
                Some((hotkey, command))
            })
            .collect();
        HotkeyTable { bindings }
    }
}

/// Resolved hotkeys. Modifiers must match exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotkeyTable {
    bindings: Vec<(Hotkey, HotkeyCommand)>,
}

impl Default for HotkeyTable {
    fn default() -> Self {
        HotkeyBindings::default().table()
    }
}

impl HotkeyTable {
    pub fn lookup(&self, key: Key, modifiers: Modifiers) -> Option<HotkeyCommand> {
        self.bindings
            .iter()
            .find(|(hotkey, _)| hotkey.key == key && hotkey.modifiers == modifiers)
            .map(|(_, command)| *command)
    }

    pub fn hotkey_for(&self, command: HotkeyCommand) -> Option<Hotkey> {
        self.bindings
            .iter()
            .find(|(_, c)| *c == command)
            .map(|(hotkey, _)| *hotkey)
    }

    pub fn bindings(&self) -> &[(Hotkey, HotkeyCommand)] {
        &self.bindings
    }
}

/// What the global listener forwards to the engine thread.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GlobalInput {
    Command(HotkeyCommand),
    /// Mouse wheel anywhere on screen; positive `delta` scrolls up.
    Scroll { delta: f32, modifiers: Modifiers },
}

#[cfg(windows)]
pub use listener::spawn_hotkey_listener;

#[cfg(windows)]
mod listener {
    use super::{GlobalInput, HotkeyTable};
    use crate::input::{Key, Modifiers};
    use rdev::{listen, EventType, Key as RawKey};
    use std::sync::mpsc::Sender;
    use std::thread;
    use std::time::Duration;

    fn map_key(key: RawKey) -> Option<Key> {
        let key = match key {
            RawKey::Escape => Key::Escape,
            RawKey::Space => Key::Space,
            RawKey::Tab => Key::Tab,
            RawKey::Return => Key::Enter,
            RawKey::Backspace => Key::Backspace,
            RawKey::UpArrow => Key::Up,
            RawKey::DownArrow => Key::Down,
            RawKey::LeftArrow => Key::Left,
            RawKey::RightArrow => Key::Right,
            RawKey::Equal | RawKey::KpPlus => Key::Plus,
            RawKey::Minus | RawKey::KpMinus => Key::Minus,
            RawKey::Num0 | RawKey::Kp0 => Key::Char('0'),
            RawKey::Num1 | RawKey::Kp1 => Key::Char('1'),
            RawKey::Num2 | RawKey::Kp2 => Key::Char('2'),
            RawKey::Num3 | RawKey::Kp3 => Key::Char('3'),
            RawKey::Num4 | RawKey::Kp4 => Key::Char('4'),
            RawKey::Num5 | RawKey::Kp5 => Key::Char('5'),
            RawKey::Num6 | RawKey::Kp6 => Key::Char('6'),
            RawKey::Num7 | RawKey::Kp7 => Key::Char('7'),
            RawKey::Num8 | RawKey::Kp8 => Key::Char('8'),
            RawKey::Num9 | RawKey::Kp9 => Key::Char('9'),
            RawKey::KeyA => Key::Char('A'),
            RawKey::KeyB => Key::Char('B'),
            RawKey::KeyC => Key::Char('C'),
            RawKey::KeyD => Key::Char('D'),
            RawKey::KeyE => Key::Char('E'),
            RawKey::KeyF => Key::Char('F'),
            RawKey::KeyG => Key::Char('G'),
            RawKey::KeyH => Key::Char('H'),
            RawKey::KeyI => Key::Char('I'),
            RawKey::KeyJ => Key::Char('J'),
            RawKey::KeyK => Key::Char('K'),
            RawKey::KeyL => Key::Char('L'),
            RawKey::KeyM => Key::Char('M'),
            RawKey::KeyN => Key::Char('N'),
            RawKey::KeyO => Key::Char('O'),
            RawKey::KeyP => Key::Char('P'),
            RawKey::KeyQ => Key::Char('Q'),
            RawKey::KeyR => Key::Char('R'),
            RawKey::KeyS => Key::Char('S'),
            RawKey::KeyT => Key::Char('T'),
            RawKey::KeyU => Key::Char('U'),
            RawKey::KeyV => Key::Char('V'),
            RawKey::KeyW => Key::Char('W'),
            RawKey::KeyX => Key::Char('X'),
            RawKey::KeyY => Key::Char('Y'),
            RawKey::KeyZ => Key::Char('Z'),
            _ => return None,
        };
        Some(key)
    }

    /// Listens for global key presses and wheel turns and forwards matching commands and
    /// scrolls. The listener restarts if the OS hook drops.
    pub fn spawn_hotkey_listener(table: HotkeyTable, commands: Sender<GlobalInput>) {
        tracing::debug!(bindings = table.bindings().len(), "starting hotkey listener");
        thread::spawn(move || loop {
            let table = table.clone();
            let tx = commands.clone();
            let mut modifiers = Modifiers::NONE;
            let result = listen(move |event| match event.event_type {
                EventType::KeyPress(raw) => match raw {
                    RawKey::ControlLeft | RawKey::ControlRight => modifiers.ctrl = true,
                    RawKey::ShiftLeft | RawKey::ShiftRight => modifiers.shift = true,
                    RawKey::Alt | RawKey::AltGr => modifiers.alt = true,
                    other => {
                        if let Some(command) = map_key(other).and_then(|k| table.lookup(k, modifiers)) {
                            tracing::debug!(?command, "hotkey matched");
                            let _ = tx.send(GlobalInput::Command(command));
                        }
                    }
                },
                EventType::Wheel { delta_y, .. } if delta_y != 0 => {
                    let _ = tx.send(GlobalInput::Scroll {
                        delta: delta_y as f32,
                        modifiers,
                    });
                }
                EventType::KeyRelease(raw) => match raw {
                    RawKey::ControlLeft | RawKey::ControlRight => modifiers.ctrl = false,
                    RawKey::ShiftLeft | RawKey::ShiftRight => modifiers.shift = false,
                    RawKey::Alt | RawKey::AltGr => modifiers.alt = false,
                    _ => {}
                },
                _ => {}
            });

            match result {
                Ok(()) => tracing::warn!("hotkey listener exited unexpectedly, restarting shortly"),
                Err(e) => tracing::warn!("hotkey listener failed: {:?}, retrying shortly", e),
            }
            thread::sleep(Duration::from_millis(500));
        });
    }
}

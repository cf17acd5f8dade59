//! Input handling - translating terminal events into app events

use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};

/// Key modifier flags
pub mod key_flags {
    pub const CONTROL: u32 = 0x1000_0000;
    pub const META: u32 = 0x2000_0000;
    pub const SPEC: u32 = 0x8000_0000;
}

/// Special key codes (combined with `key_flags::SPEC`)
pub mod special {
    pub const ESCAPE: u32 = 0x01;
    pub const UP: u32 = 0x48;
    pub const PAGE_UP: u32 = 0x49;
    pub const DOWN: u32 = 0x50;
    pub const PAGE_DOWN: u32 = 0x51;
    pub const DELETE: u32 = 0x53;
}

/// Represents a key input with modifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Key(pub u32);

impl Key {
    /// Create a key from a character
    pub fn char(ch: char) -> Self {
        Key(ch as u32)
    }

    /// Create a control key (C-x)
    pub fn ctrl(ch: char) -> Self {
        Key(key_flags::CONTROL | ch.to_ascii_lowercase() as u32)
    }

    /// Create a meta key (M-x)
    pub fn meta(ch: char) -> Self {
        Key(key_flags::META | ch.to_ascii_lowercase() as u32)
    }

    /// Create a special key
    pub fn special(code: u32) -> Self {
        Key(key_flags::SPEC | code)
    }

    pub fn enter() -> Self {
        Key::ctrl('m')
    }

    pub fn backspace() -> Self {
        Key(0x7f)
    }

    pub fn escape() -> Self {
        Key::special(special::ESCAPE)
    }

    /// Check if this is a control key
    pub fn is_ctrl(&self) -> bool {
        self.0 & key_flags::CONTROL != 0
    }

    /// Check if this is a meta key
    pub fn is_meta(&self) -> bool {
        self.0 & key_flags::META != 0
    }

    /// Check if this is a special key
    pub fn is_special(&self) -> bool {
        self.0 & key_flags::SPEC != 0
    }

    /// Get the base character (without modifiers)
    pub fn base_char(&self) -> Option<char> {
        char::from_u32(self.0 & 0x00FF_FFFF)
    }

    /// Check if this is a printable character for the prompt
    pub fn is_self_insert(&self) -> bool {
        if self.0 & 0xF000_0000 != 0 {
            return false;
        }
        char::from_u32(self.0).is_some_and(|ch| ch >= ' ' && ch != '\x7f')
    }

    /// Human-readable name (e.g., "C-g", "M-x", "Esc")
    pub fn display_name(&self) -> String {
        if self.is_special() {
            return match self.0 & 0xFF {
                special::ESCAPE => "Esc".to_string(),
                special::UP => "Up".to_string(),
                special::PAGE_UP => "PageUp".to_string(),
                special::DOWN => "Down".to_string(),
                special::PAGE_DOWN => "PageDown".to_string(),
                special::DELETE => "Delete".to_string(),
                code => format!("special-0x{:02x}", code),
            };
        }

        let mut result = String::new();
        if self.is_meta() {
            result.push_str("M-");
        }
        if self.is_ctrl() {
            result.push_str("C-");
        }
        match self.0 & 0x00FF_FFFF {
            0x7f => result.push_str("Backspace"),
            0x20 => result.push_str("SPC"),
            base => match char::from_u32(base) {
                Some(ch) => result.push(ch),
                None => result.push_str(&format!("0x{:x}", base)),
            },
        }
        result
    }
}

/// Pointer action reported by the terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerAction {
    Press,
    Drag,
    Release,
}

/// Events the app loop handles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    Key(Key),
    /// Left-button pointer activity at a screen cell
    Pointer {
        action: PointerAction,
        row: u16,
        col: u16,
    },
    Resize,
}

/// Translate a crossterm event
pub fn translate_event(event: Event) -> Option<AppEvent> {
    match event {
        Event::Key(key) => translate_key(key).map(AppEvent::Key),
        Event::Mouse(mouse) => translate_mouse(mouse),
        Event::Resize(_, _) => Some(AppEvent::Resize),
        _ => None,
    }
}

/// Translate a crossterm KeyEvent to our Key representation
pub fn translate_key(event: KeyEvent) -> Option<Key> {
    let KeyEvent {
        code, modifiers, kind, ..
    } = event;

    // Only process key press events, ignore release and repeat
    // This is critical on Windows where crossterm sends all event types
    if kind != KeyEventKind::Press {
        return None;
    }

    let ctrl = modifiers.contains(KeyModifiers::CONTROL);
    let alt = modifiers.contains(KeyModifiers::ALT);

    match code {
        KeyCode::Char(ch) => {
            if ctrl && alt {
                Some(Key(key_flags::META | key_flags::CONTROL | ch.to_ascii_lowercase() as u32))
            } else if ctrl {
                Some(Key::ctrl(ch))
            } else if alt {
                Some(Key::meta(ch))
            } else {
                Some(Key::char(ch))
            }
        }
        KeyCode::Enter => Some(Key::enter()),
        KeyCode::Tab => Some(Key::char('\t')),
        KeyCode::Backspace => Some(Key::backspace()),
        KeyCode::Delete => Some(Key::special(special::DELETE)),
        KeyCode::Esc => Some(Key::escape()),
        KeyCode::Up => Some(Key::special(special::UP)),
        KeyCode::Down => Some(Key::special(special::DOWN)),
        KeyCode::PageUp => Some(Key::special(special::PAGE_UP)),
        KeyCode::PageDown => Some(Key::special(special::PAGE_DOWN)),
        _ => None,
    }
}

fn translate_mouse(event: MouseEvent) -> Option<AppEvent> {
    let action = match event.kind {
        MouseEventKind::Down(MouseButton::Left) => PointerAction::Press,
        MouseEventKind::Drag(MouseButton::Left) => PointerAction::Drag,
        MouseEventKind::Up(MouseButton::Left) => PointerAction::Release,
        _ => return None,
    };
    Some(AppEvent::Pointer {
        action,
        row: event.row,
        col: event.column,
    })
}

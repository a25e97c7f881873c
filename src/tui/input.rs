//! Decodes raw terminal bytes from the SSH channel into key events.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

const ESC: char = '\x1b';

/// Splits one chunk of client input into key presses. Unknown escape
/// sequences are dropped.
pub fn parse_keys(bytes: &[u8]) -> Vec<KeyEvent> {
    let text = String::from_utf8_lossy(bytes);
    let mut chars = text.chars().peekable();
    let mut keys = Vec::new();

    while let Some(c) = chars.next() {
        let key = match c {
            ESC => match chars.peek() {
                Some('[') | Some('O') => {
                    chars.next();
                    escape_sequence(&mut chars)
                }
                _ => Some(plain(KeyCode::Esc)),
            },
            '\r' | '\n' => Some(plain(KeyCode::Enter)),
            '\t' => Some(plain(KeyCode::Tab)),
            '\x7f' | '\x08' => Some(plain(KeyCode::Backspace)),
            '\x01'..='\x1a' => {
                let letter = (b'a' + (c as u8 - 1)) as char;
                Some(KeyEvent::new(KeyCode::Char(letter), KeyModifiers::CONTROL))
            }
            c if c.is_control() => None,
            c => Some(plain(KeyCode::Char(c))),
        };
        keys.extend(key);
    }
    keys
}

fn plain(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

fn escape_sequence(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<KeyEvent> {
    let mut params = String::new();
    while let Some(&c) = chars.peek() {
        if c.is_ascii_digit() || c == ';' {
            params.push(c);
            chars.next();
        } else {
            break;
        }
    }

    let code = match chars.next()? {
        'A' => KeyCode::Up,
        'B' => KeyCode::Down,
        'C' => KeyCode::Right,
        'D' => KeyCode::Left,
        'H' => KeyCode::Home,
        'F' => KeyCode::End,
        'Z' => KeyCode::BackTab,
        '~' => match params.split(';').next().unwrap_or_default() {
            "1" | "7" => KeyCode::Home,
            "3" => KeyCode::Delete,
            "4" | "8" => KeyCode::End,
            "5" => KeyCode::PageUp,
            "6" => KeyCode::PageDown,
            _ => return None,
        },
        _ => return None,
    };
    Some(plain(code))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(bytes: &[u8]) -> Vec<KeyCode> {
        parse_keys(bytes).into_iter().map(|k| k.code).collect()
    }

    #[test]
    fn test_printable_and_controls() {
        assert_eq!(
            codes(b"ab\r\t\x7f"),
            vec![
                KeyCode::Char('a'),
                KeyCode::Char('b'),
                KeyCode::Enter,
                KeyCode::Tab,
                KeyCode::Backspace,
            ]
        );
    }

    #[test]
    fn test_ctrl_c() {
        let keys = parse_keys(b"\x03");
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].code, KeyCode::Char('c'));
        assert!(keys[0].modifiers.contains(KeyModifiers::CONTROL));
    }

    #[test]
    fn test_arrows_and_paging() {
        assert_eq!(
            codes(b"\x1b[A\x1b[B\x1bOC\x1b[D\x1b[5~\x1b[6~"),
            vec![
                KeyCode::Up,
                KeyCode::Down,
                KeyCode::Right,
                KeyCode::Left,
                KeyCode::PageUp,
                KeyCode::PageDown,
            ]
        );
    }

    #[test]
    fn test_lone_escape() {
        assert_eq!(codes(b"\x1b"), vec![KeyCode::Esc]);
        assert_eq!(codes(b"\x1bq"), vec![KeyCode::Esc, KeyCode::Char('q')]);
    }

    #[test]
    fn test_utf8() {
        assert_eq!(codes("é".as_bytes()), vec![KeyCode::Char('é')]);
    }

    #[test]
    fn test_unknown_sequence_dropped() {
        assert_eq!(codes(b"\x1b[99xz"), vec![KeyCode::Char('z')]);
    }
}

use ratatui::crossterm::style::Stylize;

use super::session::SessionContext;
use crate::error::Result;

/// Asks a yes/no question on the session and reads one line of answer.
/// Anything other than `y` or `yes` counts as no, as does end of input.
pub async fn confirm(ctx: &mut SessionContext, question: &str) -> Result<bool> {
    ctx.print(&format!("{} {} ", question, "[y/N]".dark_grey()));

    let echo = ctx.pty.is_some();
    let mut answer = Vec::new();
    'read: while let Some(chunk) = ctx.read().await? {
        for b in chunk {
            match b {
                b'\r' | b'\n' => break 'read,
                // ctrl+c
                0x03 => {
                    answer.clear();
                    break 'read;
                }
                0x7f | 0x08 => {
                    if answer.pop().is_some() && echo {
                        ctx.write_raw(b"\x08 \x08".to_vec());
                    }
                }
                b => {
                    answer.push(b);
                    if echo {
                        ctx.write_raw(vec![b]);
                    }
                }
            }
        }
    }
    ctx.print("\n");

    let answer = String::from_utf8_lossy(&answer).trim().to_lowercase();
    Ok(matches!(answer.as_str(), "y" | "yes"))
}

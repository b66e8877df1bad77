//! AppleScript builders and output parsers for driving iTerm2.
//!
//! Anything that reaches a script literal goes through [`quote`]; window ids
//! are numeric and validated before they are spliced in.

use super::types::{NewWindow, TerminalError, TerminalSessionInfo};

pub const APP_NAME: &str = "iTerm2";

/// Marker a session lookup returns when no session has the requested id.
pub const MISSING: &str = "missing";
const OK: &str = "ok";

/// Escapes `text` for use inside an AppleScript double-quoted string.
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            other => escaped.push(other),
        }
    }
    escaped
}

pub fn quote(text: &str) -> String {
    format!("\"{}\"", escape(text))
}

pub fn is_running() -> String {
    format!("return application {} is running", quote(APP_NAME))
}

pub fn activate() -> String {
    format!("tell application {} to activate", quote(APP_NAME))
}

/// One line per session: `window id <TAB> session id <TAB> name`.
pub fn list_sessions() -> String {
    format!(
        r#"set sep to ASCII character 9
set output to ""
tell application {app}
    repeat with w in windows
        repeat with t in tabs of w
            repeat with s in sessions of t
                set output to output & (id of w as text) & sep & (unique id of s) & sep & (name of s) & linefeed
            end repeat
        end repeat
    end repeat
end tell
return output"#,
        app = quote(APP_NAME)
    )
}

pub fn create_window() -> String {
    format!(
        r#"tell application {app}
    set newWindow to (create window with default profile)
    set s to current session of current tab of newWindow
    return (id of newWindow as text) & linefeed & (unique id of s)
end tell"#,
        app = quote(APP_NAME)
    )
}

pub fn create_tab(window_id: u64) -> String {
    format!(
        r#"tell application {app}
    set w to (first window whose id is {window_id})
    tell w
        set newTab to (create tab with default profile)
    end tell
    return unique id of current session of newTab
end tell"#,
        app = quote(APP_NAME),
        window_id = window_id
    )
}

/// Runs `body` with `w`, `t` and `s` bound to the window, tab and session
/// whose unique id is `session_id`. Returns [`MISSING`] if there is none.
fn with_session(session_id: &str, body: &str) -> String {
    format!(
        r#"tell application {app}
    repeat with w in windows
        repeat with t in tabs of w
            repeat with s in sessions of t
                if (unique id of s) is {id} then
{body}
                end if
            end repeat
        end repeat
    end repeat
end tell
return "{missing}""#,
        app = quote(APP_NAME),
        id = quote(session_id),
        body = body,
        missing = MISSING
    )
}

pub fn split_vertically(session_id: &str) -> String {
    with_session(
        session_id,
        r#"                    tell s
                        set newSession to (split vertically with default profile)
                    end tell
                    return unique id of newSession"#,
    )
}

pub fn set_name(session_id: &str, name: &str) -> String {
    with_session(
        session_id,
        &format!(
            "                    tell s to set name to {}\n                    return \"{}\"",
            quote(name),
            OK
        ),
    )
}

pub fn write_text(session_id: &str, text: &str) -> String {
    with_session(
        session_id,
        &format!(
            "                    tell s to write text {}\n                    return \"{}\"",
            quote(text),
            OK
        ),
    )
}

pub fn interrupt(session_id: &str) -> String {
    with_session(
        session_id,
        &format!(
            "                    tell s to write text (ASCII character 3) without newline\n                    return \"{}\"",
            OK
        ),
    )
}

pub fn close_tab(session_id: &str) -> String {
    with_session(
        session_id,
        &format!("                    close t\n                    return \"{}\"", OK),
    )
}

pub fn select(session_id: &str) -> String {
    with_session(
        session_id,
        &format!(
            "                    select w\n                    tell t to select\n                    tell s to select\n                    return \"{}\"",
            OK
        ),
    )
}

pub fn parse_window_id(window_id: &str) -> Result<u64, TerminalError> {
    window_id
        .trim()
        .parse()
        .map_err(|_| TerminalError::Response(format!("invalid window id '{}'", window_id)))
}

pub fn parse_session_list(output: &str) -> Vec<TerminalSessionInfo> {
    output
        .lines()
        .filter_map(|line| {
            let mut parts = line.splitn(3, '\t');
            let window_id = parts.next()?.trim();
            let session_id = parts.next()?.trim();
            let name = parts.next().unwrap_or_default().trim();
            if window_id.is_empty() || session_id.is_empty() {
                return None;
            }
            Some(TerminalSessionInfo {
                window_id: window_id.to_string(),
                session_id: session_id.to_string(),
                name: name.to_string(),
            })
        })
        .collect()
}

pub fn parse_new_window(output: &str) -> Result<NewWindow, TerminalError> {
    let mut lines = output.lines().map(str::trim).filter(|l| !l.is_empty());
    match (lines.next(), lines.next()) {
        (Some(window_id), Some(session_id)) => Ok(NewWindow {
            window_id: window_id.to_string(),
            session_id: session_id.to_string(),
        }),
        _ => Err(TerminalError::Response(format!(
            "expected window and session id, got '{}'",
            output.trim()
        ))),
    }
}

/// `Ok(true)` for the acknowledgement, `Ok(false)` for [`MISSING`].
pub fn parse_ack(output: &str) -> Result<bool, TerminalError> {
    match output.trim() {
        OK => Ok(true),
        MISSING => Ok(false),
        other => Err(TerminalError::Response(other.to_string())),
    }
}

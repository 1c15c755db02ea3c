// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Terminal output sanitization.
//!
//! Platform text is attacker-controlled input that ends up on a process's
//! standard input. Everything that can move the cursor, rewrite previously
//! displayed lines, or smuggle a terminal query gets stripped: CSI and OSC
//! sequences, two-byte escapes, stray escape bytes, and control bytes other
//! than tab and newline. Carriage return is included in the strip set since
//! it can overwrite a displayed line and spoof a different message.

const ESC: char = '\u{1b}';

/// Strip terminal control sequences and control bytes from untrusted text.
pub fn sanitize_for_terminal(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == ESC {
            match chars.peek() {
                // CSI: ESC [ params... final byte in 0x40..=0x7e.
                Some('[') => {
                    chars.next();
                    for c in chars.by_ref() {
                        if ('\u{40}'..='\u{7e}').contains(&c) {
                            break;
                        }
                    }
                }
                // OSC: ESC ] ... terminated by BEL or ST (ESC \).
                Some(']') => {
                    chars.next();
                    while let Some(c) = chars.next() {
                        if c == '\u{07}' {
                            break;
                        }
                        if c == ESC {
                            if chars.peek() == Some(&'\\') {
                                chars.next();
                            }
                            break;
                        }
                    }
                }
                // Any other two-byte escape sequence.
                Some(_) => {
                    chars.next();
                }
                None => {}
            }
            continue;
        }
        if c.is_control() && c != '\t' && c != '\n' {
            continue;
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_csi_color_sequences() {
        assert_eq!(
            sanitize_for_terminal("\x1b[31mDROP TABLE\x1b[0m\r"),
            "DROP TABLE"
        );
    }

    #[test]
    fn strips_osc_with_bel_and_st_terminators() {
        assert_eq!(
            sanitize_for_terminal("\x1b]0;evil title\x07hello"),
            "hello"
        );
        assert_eq!(
            sanitize_for_terminal("\x1b]8;;http://x\x1b\\link"),
            "link"
        );
    }

    #[test]
    fn strips_two_byte_escapes_and_bare_esc() {
        assert_eq!(sanitize_for_terminal("a\x1bcb"), "ab");
        assert_eq!(sanitize_for_terminal("trailing\x1b"), "trailing");
    }

    #[test]
    fn strips_carriage_return_but_keeps_tab_and_newline() {
        assert_eq!(
            sanitize_for_terminal("line1\r\nline2\tend"),
            "line1\nline2\tend"
        );
    }

    #[test]
    fn strips_other_control_bytes() {
        assert_eq!(sanitize_for_terminal("a\x00b\x08c\x7fd"), "abcd");
    }

    #[test]
    fn plain_text_passes_through() {
        let text = "deploy v1.2.3 to prod? приветствие 你好";
        assert_eq!(sanitize_for_terminal(text), text);
    }

    #[test]
    fn cursor_movement_inside_csi_is_removed() {
        assert_eq!(sanitize_for_terminal("ok\x1b[2J\x1b[H!"), "ok!");
    }
}

//! Reader for the legacy flat exclusion format.
//!
//! The legacy file is an INI document with a single `[remove]` section whose
//! options hold comma-separated, backslash-escaped string lists:
//!
//! ```text
//! [remove]
//! commands=/bin/rpm -qa,/bin/ls
//! files=/etc/cron.daily,/etc/selinux/config
//! ```

/// One `[section]` with its options in file order
pub(crate) type Section = (String, Vec<(String, String)>);

/// Split an INI document into sections.
///
/// Option names are lowercased, values are trimmed. Indented lines continue
/// the previous value. Returns a description of the first syntax error.
pub(crate) fn parse_sections(content: &str) -> Result<Vec<Section>, String> {
    let mut sections: Vec<Section> = Vec::new();
    let mut continuing = false;

    for (lineno, raw) in content.lines().enumerate() {
        let line = raw.trim_end_matches('\r');
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continuing = false;
            continue;
        }
        if trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }

        let indented = line.starts_with(' ') || line.starts_with('\t');
        if indented && continuing {
            if let Some((_, options)) = sections.last_mut() {
                if let Some((_, value)) = options.last_mut() {
                    value.push('\n');
                    value.push_str(trimmed);
                }
            }
            continue;
        }

        if trimmed.starts_with('[') && trimmed.ends_with(']') {
            let name = trimmed[1..trimmed.len() - 1].to_string();
            sections.push((name, Vec::new()));
            continuing = false;
            continue;
        }

        let (_, options) = sections
            .last_mut()
            .ok_or_else(|| format!("line {}: option outside of any section", lineno + 1))?;

        let split_at = trimmed
            .find(['=', ':'])
            .ok_or_else(|| format!("line {}: expected `key=value`", lineno + 1))?;
        let key = trimmed[..split_at].trim().to_lowercase();
        let value = trimmed[split_at + 1..].trim().to_string();
        options.push((key, value));
        continuing = true;
    }

    Ok(sections)
}

/// Decode backslash escape sequences the way the legacy client did.
///
/// Unknown escapes are kept verbatim; malformed numeric escapes and a
/// trailing lone backslash are errors.
pub(crate) fn decode_escapes(value: &str) -> Result<String, String> {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(escape) = chars.next() else {
            return Err("\\ at end of string".to_string());
        };
        match escape {
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            'a' => out.push('\u{07}'),
            'b' => out.push('\u{08}'),
            'f' => out.push('\u{0c}'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'v' => out.push('\u{0b}'),
            '\n' => {}
            '0'..='7' => {
                let mut code = escape.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek().and_then(|d| d.to_digit(8)) {
                        Some(digit) => {
                            code = code * 8 + digit;
                            chars.next();
                        }
                        None => break,
                    }
                }
                out.push(char::from_u32(code).ok_or("invalid octal escape")?);
            }
            'x' => out.push(read_hex(&mut chars, 2)?),
            'u' => out.push(read_hex(&mut chars, 4)?),
            'U' => out.push(read_hex(&mut chars, 8)?),
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }

    Ok(out)
}

fn read_hex(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    width: usize,
) -> Result<char, String> {
    let mut code = 0u32;
    for _ in 0..width {
        let digit = chars
            .next()
            .and_then(|d| d.to_digit(16))
            .ok_or_else(|| format!("truncated \\x/\\u escape (expected {} hex digits)", width))?;
        code = code * 16 + digit;
    }
    char::from_u32(code).ok_or_else(|| format!("escape out of range: {:#x}", code))
}

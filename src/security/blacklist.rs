//! Command blacklist enforcement for pre-commands.
//!
//! Pre-commands run through a shell to produce arguments for other commands,
//! so a forbidden executable may hide behind a control operator (`;`, `&&`,
//! `|`, backticks, `$(...)`) or inside a quoted nested command string. The
//! checker flattens both before testing tokens.
//!
//! This is a heuristic safety net, not a shell parser: it does not follow
//! variables, globs or aliases.

use std::collections::HashSet;
use std::path::Path;

use lazy_static::lazy_static;
use log::warn;

use crate::constants::{COMMAND_BLACKLIST, MAX_NESTING_DEPTH};

lazy_static! {
    static ref BLACKLIST: HashSet<&'static str> = COMMAND_BLACKLIST.iter().copied().collect();
}

/// Check whether a shell command invokes a blacklisted executable.
///
/// Tokens are compared both verbatim and by file name, so `/bin/rm` counts
/// as `rm`. A command that cannot be tokenized is treated as blacklisted.
///
/// # Example
///
/// ```
/// use diag_collector::security::blacklist::is_blacklisted;
///
/// assert!(is_blacklisted("rm -rf /; echo ok"));
/// assert!(!is_blacklisted("echo 'safe command'"));
/// ```
pub fn is_blacklisted(command: &str) -> bool {
    match command_parts(command, 0) {
        Some(parts) => parts.iter().any(|part| is_forbidden(part)),
        None => {
            warn!("Could not tokenize pre-command, refusing to run it");
            true
        }
    }
}

/// All tokens of `command`, plus the tokens of every token that is itself
/// a multi-word command string.
fn command_parts(command: &str, depth: usize) -> Option<Vec<String>> {
    let parts = shlex::split(&command.replace(is_control_char, " "))?;
    let mut all_parts = parts.clone();

    if depth >= MAX_NESTING_DEPTH {
        return Some(all_parts);
    }
    for part in &parts {
        if shlex::split(part)?.len() > 1 {
            all_parts.extend(command_parts(part, depth + 1)?);
        }
    }

    Some(all_parts)
}

/// Characters that start or end another command in a shell line
fn is_control_char(c: char) -> bool {
    matches!(c, ';' | '&' | '|' | '`' | '(' | ')')
}

fn is_forbidden(token: &str) -> bool {
    if BLACKLIST.contains(token) {
        return true;
    }
    Path::new(token)
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| BLACKLIST.contains(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sequenced_command() {
        assert!(is_blacklisted("rm -rf /; echo ok"));
        assert!(is_blacklisted("echo ok;rm -rf /"));
    }

    #[test]
    fn test_control_operators_split_commands() {
        assert!(is_blacklisted("ls&&rm x"));
        assert!(is_blacklisted("ls || reboot"));
        assert!(is_blacklisted("ls|rm x"));
        assert!(is_blacklisted("echo `rm x`"));
        assert!(is_blacklisted("echo $(rm x)"));
        assert!(is_blacklisted("sleep 1 & kill 1"));
        assert!(!is_blacklisted("ls -l /etc 2>&1 | sort"));
    }

    #[test]
    fn test_safe_command() {
        assert!(!is_blacklisted("echo 'safe command'"));
        assert!(!is_blacklisted("/sbin/ip -o link"));
        assert!(!is_blacklisted("ls -l /etc | awk '{print $9}'"));
    }

    #[test]
    fn test_nested_quoted_command() {
        assert!(is_blacklisted("sh -c 'echo hi; kill -9 1'"));
        assert!(is_blacklisted("bash -c \"sudo sh -c 'reboot now'\""));
    }

    #[test]
    fn test_absolute_path_counts() {
        assert!(is_blacklisted("/sbin/shutdown -h now"));
        assert!(is_blacklisted("/usr/bin/env /bin/rm x"));
    }

    #[test]
    fn test_word_containing_blacklisted_name_is_safe() {
        assert!(!is_blacklisted("echo firmware"));
        assert!(!is_blacklisted("pkill-like-tool --list"));
    }

    #[test]
    fn test_unbalanced_quotes_fail_closed() {
        assert!(is_blacklisted("echo 'unterminated"));
    }

    #[test]
    fn test_deep_nesting_is_bounded() {
        let mut command = "echo done".to_string();
        for _ in 0..(MAX_NESTING_DEPTH + 2) {
            command = format!("sh -c {}", shlex::try_quote(&command).unwrap());
        }
        assert!(!is_blacklisted(&command));
    }

    proptest! {
        #[test]
        fn prop_blacklisted_word_anywhere_is_caught(
            words in prop::collection::vec("[a-z]{3,8}", 0..5),
            position in 0usize..6,
            forbidden in prop::sample::select(COMMAND_BLACKLIST.to_vec()),
        ) {
            let mut commands: Vec<String> = words.iter().map(|w| format!("echo {}", w)).collect();
            let index = position.min(commands.len());
            commands.insert(index, format!("{} target", forbidden));
            prop_assert!(is_blacklisted(&commands.join("; ")));
        }

        #[test]
        fn prop_plain_echo_is_safe(words in prop::collection::vec("[a-j]{2,6}", 1..6)) {
            // Letters a-j cannot spell any blacklisted name
            let command = format!("echo {}", words.join(" "));
            prop_assert!(!is_blacklisted(&command));
        }
    }
}

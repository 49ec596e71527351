use lazy_static::lazy_static;
use regex::Regex;

use crate::constants::MANGLE_NAME_MAX;

lazy_static! {
    static ref BIN_PREFIX: Regex = Regex::new(r"^/(usr/)?s?bin/").unwrap();
    static ref UNSAFE_CHARS: Regex = Regex::new(r"[^A-Za-z0-9_\-./]+").unwrap();
}

/// Turn a command line into the file name its output is stored under.
///
/// `/usr/sbin/ethtool -i eth0` becomes `ethtool_-i_eth0`. Directory
/// separators left in the arguments become dots so the name stays a single
/// path component.
pub fn mangle_command(command: &str) -> String {
    let command = command.replace(" -- ", " ");
    let mangled = BIN_PREFIX.replace(&command, "");
    let mangled = UNSAFE_CHARS.replace_all(&mangled, "_");
    let mangled = mangled.replace('/', ".");
    let mangled = mangled.trim_matches(|c| matches!(c, ' ' | '.' | '_' | '-'));

    mangled.chars().take(MANGLE_NAME_MAX).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_bin_prefixes() {
        assert_eq!(mangle_command("/bin/hostname"), "hostname");
        assert_eq!(mangle_command("/usr/bin/uptime"), "uptime");
        assert_eq!(mangle_command("/usr/sbin/dmidecode"), "dmidecode");
        assert_eq!(mangle_command("/opt/tool/bin/run"), "opt.tool.bin.run");
    }

    #[test]
    fn test_arguments_are_flattened() {
        assert_eq!(mangle_command("/sbin/ethtool -i eth0"), "ethtool_-i_eth0");
        assert_eq!(mangle_command("/bin/ls -lanR /boot"), "ls_-lanR_.boot");
        assert_eq!(mangle_command("/usr/bin/yum -C --noplugins repolist"), "yum_-C_--noplugins_repolist");
    }

    #[test]
    fn test_double_dash_separator_dropped() {
        assert_eq!(mangle_command("/usr/bin/find -- /etc"), "find_.etc");
    }

    #[test]
    fn test_long_names_truncated() {
        let long = format!("/bin/echo {}", "a".repeat(400));
        assert_eq!(mangle_command(&long).chars().count(), MANGLE_NAME_MAX);
    }
}

//! Placeholder expansion for agent directory conventions.
//!
//! Agent catalogs describe user-scope paths such as `~/.claude/skills` or
//! `$XDG_CONFIG/opencode/skills`. Expansion rules:
//!
//! - a leading `~` becomes the home directory,
//! - `$XDG_CONFIG` becomes `XDG_CONFIG_HOME`, falling back to `<home>/.config`,
//! - any other `$VAR` / `${VAR}` becomes its value, or nothing when unset.

use std::path::PathBuf;

/// Home directory: `HOME` when set, otherwise the platform default.
pub fn home_dir() -> Option<PathBuf> {
    home_with_lookup(&|name| std::env::var(name).ok())
}

pub(crate) fn home_with_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Option<PathBuf> {
    lookup("HOME")
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
        .or_else(|| directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()))
}

/// Expand `~`, `$XDG_CONFIG` and `$VAR` placeholders using the process env.
pub fn expand_path(input: &str) -> PathBuf {
    PathBuf::from(expand_with(input, &|name| std::env::var(name).ok()))
}

pub(crate) fn expand_with(input: &str, lookup: &dyn Fn(&str) -> Option<String>) -> String {
    let home = || {
        home_with_lookup(lookup)
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default()
    };

    let mut rest = input;
    let mut out = String::with_capacity(input.len());
    if rest == "~" || rest.starts_with("~/") {
        out.push_str(&home());
        rest = &rest[1..];
    }

    let mut chars = rest.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '$' {
            out.push(ch);
            continue;
        }
        let braced = chars.peek() == Some(&'{');
        if braced {
            chars.next();
        }
        let mut name = String::new();
        while let Some(&c) = chars.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                name.push(c);
                chars.next();
            } else {
                break;
            }
        }
        if braced && chars.peek() == Some(&'}') {
            chars.next();
        }
        if name.is_empty() {
            out.push('$');
            continue;
        }
        if name == "XDG_CONFIG" {
            match lookup("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
                Some(v) => out.push_str(&v),
                None => {
                    out.push_str(&home());
                    out.push_str("/.config");
                },
            }
        } else if name == "HOME" {
            out.push_str(&home());
        } else {
            out.push_str(&lookup(&name).unwrap_or_default());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(name: &str) -> Option<String> {
        match name {
            "HOME" => Some("/home/dev".into()),
            "PROJECT_ROOT" => Some("/work".into()),
            _ => None,
        }
    }

    #[test]
    fn expands_tilde() {
        assert_eq!(expand_with("~/.claude/skills", &env), "/home/dev/.claude/skills");
        assert_eq!(expand_with("~", &env), "/home/dev");
        assert_eq!(expand_with("a/~b", &env), "a/~b");
    }

    #[test]
    fn xdg_config_falls_back_to_home() {
        assert_eq!(
            expand_with("$XDG_CONFIG/opencode/skills", &env),
            "/home/dev/.config/opencode/skills"
        );
    }

    #[test]
    fn xdg_config_prefers_env() {
        let lookup = |name: &str| match name {
            "XDG_CONFIG_HOME" => Some("/cfg".to_string()),
            other => env(other),
        };
        assert_eq!(expand_with("$XDG_CONFIG/goose", &lookup), "/cfg/goose");
    }

    #[test]
    fn general_vars_and_missing_vars() {
        assert_eq!(expand_with("${PROJECT_ROOT}/x", &env), "/work/x");
        assert_eq!(expand_with("$PROJECT_ROOT/x", &env), "/work/x");
        assert_eq!(expand_with("$NOPE/x", &env), "/x");
        assert_eq!(expand_with("cost $ 5", &env), "cost $ 5");
    }
}

//! Path helpers shared by config loading and the CLI.

use std::path::{Path, PathBuf};

/// Expand `~`, `$VAR` and `${VAR}`; unknown variables are left as written.
pub fn expand_env_vars(input: &str) -> String {
    shellexpand::full(input)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| shellexpand::tilde(input).into_owned())
}

/// `path` as is when absolute, otherwise joined onto `base`.
pub fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_unknown_variable_when_expanding_then_keeps_text() {
        let out = expand_env_vars("$BACTREE_SURELY_UNSET_VAR/x");
        assert_eq!(out, "$BACTREE_SURELY_UNSET_VAR/x");
    }

    #[test]
    fn given_tilde_when_expanding_then_uses_home() {
        let home = std::env::var("HOME").expect("HOME should be set");
        assert_eq!(expand_env_vars("~/trees"), format!("{home}/trees"));
    }

    #[test]
    fn given_relative_path_when_resolving_then_joins_base() {
        assert_eq!(
            resolve_against(Path::new("/base"), Path::new("a.json")),
            PathBuf::from("/base/a.json")
        );
        assert_eq!(
            resolve_against(Path::new("/base"), Path::new("/abs/a.json")),
            PathBuf::from("/abs/a.json")
        );
    }
}

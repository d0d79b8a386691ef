//! Path normalization for file names, include paths and pre-includes.
//!
//! IAR writes project-relative paths as `$PROJ_DIR$\sub\file.c`. The generated
//! script lives next to the project file, so the placeholder is dropped and
//! separators are unified to `/`.

/// Placeholder IAR uses for the directory containing the `.ewp` file.
pub const PROJECT_DIR_TOKEN: &str = "$PROJ_DIR$";

/// Strip every leading `$PROJ_DIR$\` / `$PROJ_DIR$/` and convert the
/// remaining backslashes to forward slashes.
///
/// Applying this twice gives the same result as applying it once.
pub fn normalize_path(path: &str) -> String {
    let mut rest = path;
    while let Some(stripped) = strip_project_dir(rest) {
        rest = stripped;
    }
    rest.replace('\\', "/")
}

fn strip_project_dir(path: &str) -> Option<&str> {
    let after = path.strip_prefix(PROJECT_DIR_TOKEN)?;
    after
        .strip_prefix('\\')
        .or_else(|| after.strip_prefix('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("$PROJ_DIR$\\sub\\file.c", "sub/file.c")]
    #[case("$PROJ_DIR$/sub/file.c", "sub/file.c")]
    #[case("sub/file.c", "sub/file.c")]
    #[case("$PROJ_DIR$\\..\\common\\inc", "../common/inc")]
    #[case("$TOOLKIT_DIR$\\CMSIS\\Include", "$TOOLKIT_DIR$/CMSIS/Include")]
    #[case("$PROJ_DIR$", "$PROJ_DIR$")]
    #[case("$PROJ_DIR$\\$PROJ_DIR$/x.c", "x.c")]
    #[case("lib\\$PROJ_DIR$\\x.c", "lib/$PROJ_DIR$/x.c")]
    #[case("", "")]
    fn normalizes(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_path(input), expected);
    }

    proptest! {
        #[test]
        fn normalization_is_idempotent(s in "(\\$PROJ_DIR\\$|[\\\\/]|[a-z.$_]){0,24}") {
            let once = normalize_path(&s);
            prop_assert_eq!(normalize_path(&once), once.clone());
        }

        #[test]
        fn normalization_is_idempotent_for_any_string(s in ".*") {
            let once = normalize_path(&s);
            prop_assert_eq!(normalize_path(&once), once.clone());
        }
    }
}

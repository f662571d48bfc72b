//! Property-based tests for path manipulation functions.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use crate::path::{ancestor_directories, is_directory, split_extension, split_parent, to_directory, unix_name};
    use proptest::prelude::*;

    // ============================================================================
    // split_extension / split_parent property tests
    // ============================================================================

    proptest! {
        /// Property: splitting off an extension loses nothing
        #[test]
        fn split_extension_concatenates_back(input in "[a-z./_]{0,24}") {
            let (base, ext) = split_extension(&input);
            prop_assert_eq!(format!("{}{}", base, ext), input);
        }

        /// Property: an extension is either empty or starts with a dot and has no slash
        #[test]
        fn split_extension_shape(input in "[a-z./_]{0,24}") {
            let (_, ext) = split_extension(&input);
            prop_assert!(ext.is_empty() || (ext.starts_with('.') && !ext.contains('/')));
        }

        /// Property: parent plus name rebuilds the path and the parent is a directory
        #[test]
        fn split_parent_concatenates_back(input in "([a-z]{1,5}/){0,4}[a-z]{0,5}") {
            let (parent, name) = split_parent(&input);
            prop_assert_eq!(format!("{}{}", parent, name), input.clone());
            prop_assert!(is_directory(parent));
        }

        /// Property: every ancestor is a directory and a prefix of the path
        #[test]
        fn ancestors_are_directory_prefixes(input in "([a-z]{1,5}/){0,4}[a-z]{1,5}") {
            for ancestor in ancestor_directories(&input) {
                prop_assert!(is_directory(ancestor));
                prop_assert!(input.starts_with(ancestor));
                prop_assert!(ancestor.len() < input.len());
            }
        }

        /// Property: to_directory is idempotent
        #[test]
        fn to_directory_is_idempotent(input in "[a-z/]{0,16}") {
            let once = to_directory(&input);
            prop_assert_eq!(to_directory(&once), once.clone());
            prop_assert!(is_directory(&once));
        }
    }

    // ============================================================================
    // unix_name property tests
    // ============================================================================

    proptest! {
        /// Property: unix_name output has no uppercase letters and no periods
        #[test]
        fn unix_name_is_lowercase_without_periods(input in "[a-zA-Z.]{0,20}") {
            let result = unix_name(&input);
            prop_assert!(!result.chars().any(|c| c.is_uppercase()));
            prop_assert!(!result.contains('.'));
        }

        /// Property: unix_name is idempotent
        #[test]
        fn unix_name_is_idempotent(input in "[a-zA-Z.]{0,20}") {
            let once = unix_name(&input);
            prop_assert_eq!(unix_name(&once), once.clone());
        }

        /// Property: lowercase input without periods is unchanged
        #[test]
        fn unix_name_preserves_lowercase(input in "[a-z_]{0,20}") {
            prop_assert_eq!(unix_name(&input), input);
        }
    }
}

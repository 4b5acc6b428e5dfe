//! Relative import paths between dot-separated output folders.

use crate::ContractError;

/// Returned when both folders are the same.
pub const CURRENT_DIRECTORY: &str = ".";

/// Computes the relative module path from folder `relative_to` to folder `target`.
///
/// Both arguments are dot-separated folder names (`Acme.Contracts.V1`). The
/// result is either `.` for identical folders, or a run of `../` segments
/// (or `./` when nothing needs climbing) followed by the target's remaining
/// segments, each ending with `/`. Folders that do not share a first segment
/// cannot be related and produce a [`ContractError::PathError`].
pub fn relative_path(target: &str, relative_to: &str) -> Result<String, ContractError> {
    if target == relative_to {
        return Ok(CURRENT_DIRECTORY.to_string());
    }

    let target_segments: Vec<&str> = target.split('.').collect();
    let relative_segments: Vec<&str> = relative_to.split('.').collect();

    let common = target_segments
        .iter()
        .zip(relative_segments.iter())
        .take_while(|(left, right)| left == right)
        .count();
    if common == 0 {
        return Err(ContractError::PathError(format!(
            "paths '{target}' and '{relative_to}' do not have a common base"
        )));
    }

    let mut out = String::new();
    for segment in &relative_segments[common..] {
        if !segment.is_empty() {
            out.push_str("../");
        }
    }
    if out.is_empty() {
        out.push_str("./");
    }
    for segment in &target_segments[common..] {
        out.push_str(segment);
        out.push('/');
    }
    Ok(out)
}

/// Joins a relative folder path and a file name into a module specifier.
pub fn import_path(relative: &str, file_name: &str) -> String {
    format!("{relative}/{file_name}").replace("//", "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_folders_are_current_directory() {
        assert_eq!(relative_path("", "").unwrap(), ".");
        assert_eq!(relative_path("Acme.Contracts", "Acme.Contracts").unwrap(), ".");
    }

    #[test]
    fn climbs_one_level_up() {
        assert_eq!(
            relative_path("ExampleContracts", "ExampleContracts.v1").unwrap(),
            "../"
        );
    }

    #[test]
    fn descends_one_and_two_levels() {
        assert_eq!(
            relative_path("Some.Nested.Deeper", "Some.Nested").unwrap(),
            "./Deeper/"
        );
        assert_eq!(
            relative_path("Some.Nested.Deeper.Still", "Some.Nested").unwrap(),
            "./Deeper/Still/"
        );
    }

    #[test]
    fn crosses_into_sibling_folder() {
        assert_eq!(
            relative_path("Acme.Billing", "Acme.Users.Admin").unwrap(),
            "../../Billing/"
        );
    }

    #[test]
    fn unrelated_roots_fail() {
        let err = relative_path("Other", "Acme.Contracts").unwrap_err();
        assert!(err.to_string().contains("do not have a common base"));
    }

    #[test]
    fn import_paths_collapse_double_slashes() {
        assert_eq!(import_path(".", "userDto"), "./userDto");
        assert_eq!(import_path("../", "userDto"), "../userDto");
        assert_eq!(import_path("./Deeper/", "UserDto"), "./Deeper/UserDto");
    }
}

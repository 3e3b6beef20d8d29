//! Display name normalization and validation
//!
//! Groups and teacher-observers carry a role prefix in their display name
//! (`Group 2 - Falcons`, `Teacher - Ms. Lan`). Clients often send a name
//! that already contains a prefix, for example after editing it, so every
//! incoming name is stripped of existing prefixes before exactly one
//! canonical prefix is applied. The prefix is presentation only: the role
//! itself lives in [`crate::roster::Role`].

use rustrict::CensorStr;
use serde::Serialize;
use thiserror::Error;

use crate::constants::names::{GROUP_PREFIX, MAX_LENGTH, SEPARATOR, TEACHER_PREFIX};

/// Errors that can occur during name validation
#[derive(Error, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The name is empty or contains only whitespace and prefixes
    #[error("name cannot be empty")]
    Empty,
    /// The name contains inappropriate content
    #[error("name is inappropriate")]
    Sinful,
    /// The name exceeds the maximum allowed length
    #[error("name is too long")]
    TooLong,
}

fn strip_prefix_ignore_case<'a>(name: &'a str, prefix: &str) -> Option<&'a str> {
    name.get(..prefix.len())
        .filter(|head| head.eq_ignore_ascii_case(prefix))
        .map(|_| &name[prefix.len()..])
}

/// Removes one leading role prefix, returning `None` if there is none
fn strip_role_prefix(name: &str) -> Option<&str> {
    let rest = strip_prefix_ignore_case(name, GROUP_PREFIX)
        .map(|rest| {
            rest.trim_start()
                .trim_start_matches(|c: char| c.is_ascii_digit())
        })
        .or_else(|| strip_prefix_ignore_case(name, TEACHER_PREFIX))?;

    rest.trim_start().strip_prefix('-').map(str::trim_start)
}

/// Strips every role prefix from a name and validates what remains
///
/// # Errors
///
/// * `Error::Empty` - Nothing is left after trimming and stripping prefixes
/// * `Error::TooLong` - The cleaned name exceeds the maximum length
/// * `Error::Sinful` - The cleaned name contains inappropriate content
pub fn clean(name: &str) -> Result<String, Error> {
    let mut name = rustrict::trim_whitespace(name);
    while let Some(rest) = strip_role_prefix(name) {
        name = rest;
    }
    let name = name.trim();

    if name.is_empty() {
        return Err(Error::Empty);
    }
    if name.len() > MAX_LENGTH {
        return Err(Error::TooLong);
    }
    if name.is_inappropriate() {
        return Err(Error::Sinful);
    }

    Ok(name.to_owned())
}

/// Name shown for an unclaimed group slot
pub fn placeholder(group_number: u8) -> String {
    format!("{GROUP_PREFIX} {group_number}")
}

/// Canonical display name for a group
///
/// # Errors
///
/// Propagates any validation error from [`clean`].
pub fn group(group_number: u8, name: &str) -> Result<String, Error> {
    Ok(format!(
        "{}{SEPARATOR}{}",
        placeholder(group_number),
        clean(name)?
    ))
}

/// Canonical display name for a teacher-observer
///
/// # Errors
///
/// Propagates any validation error from [`clean`].
pub fn teacher(name: &str) -> Result<String, Error> {
    Ok(format!("{TEACHER_PREFIX}{SEPARATOR}{}", clean(name)?))
}

/// Validates a host's display name, which carries no prefix
///
/// # Errors
///
/// Returns an error if the trimmed name is empty, too long, or inappropriate.
pub fn host(name: &str) -> Result<String, Error> {
    let name = rustrict::trim_whitespace(name);
    if name.is_empty() {
        return Err(Error::Empty);
    }
    if name.len() > MAX_LENGTH {
        return Err(Error::TooLong);
    }
    if name.is_inappropriate() {
        return Err(Error::Sinful);
    }
    Ok(name.to_owned())
}

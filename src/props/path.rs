/*
    Gyre, flight dynamics executive
    Copyright (C) 2018-onwards Christopher Rabotin <christopher.rabotin@gmail.com>

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use super::PropertyError;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref NAME: Regex = Regex::new(r"^[_a-zA-Z][-._a-zA-Z0-9]*$").unwrap();
    static ref COMPONENT: Regex =
        Regex::new(r"^(?P<name>[_a-zA-Z][-._a-zA-Z0-9]*)(?:\[(?P<index>[0-9]+)\])?$").unwrap();
}

/// Returns whether the provided string is a valid property node name.
pub fn is_valid_name(name: &str) -> bool {
    NAME.is_match(name)
}

/// One step of a parsed property path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum PathStep {
    Root,
    Current,
    Parent,
    Child { name: String, index: usize },
}

/// Parses a slash delimited property path.
///
/// A leading `/` starts from the root of the tree. Empty components (`a//b`, trailing `/`) are ignored.
pub(crate) fn parse_path(path: &str) -> Result<Vec<PathStep>, PropertyError> {
    let mut steps = Vec::new();
    if path.starts_with('/') {
        steps.push(PathStep::Root);
    }

    for component in path.split('/') {
        match component {
            "" => continue,
            "." => steps.push(PathStep::Current),
            ".." => steps.push(PathStep::Parent),
            _ => {
                let caps = COMPONENT.captures(component).ok_or_else(|| {
                    PropertyError::InvalidPath {
                        path: path.to_string(),
                        reason: format!("`{component}` does not match [_a-zA-Z][-._a-zA-Z0-9]*[index]"),
                    }
                })?;

                let index = match caps.name("index") {
                    Some(idx) => idx.as_str().parse::<usize>().map_err(|e| {
                        PropertyError::InvalidPath {
                            path: path.to_string(),
                            reason: format!("index of `{component}`: {e}"),
                        }
                    })?,
                    None => 0,
                };

                steps.push(PathStep::Child {
                    name: caps["name"].to_string(),
                    index,
                });
            }
        }
    }

    Ok(steps)
}

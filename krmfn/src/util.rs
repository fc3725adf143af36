// SPDX-FileCopyrightText: © 2023 Technical University of Munich, Chair of Connected Mobility
// SPDX-FileCopyrightText: © 2023 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

use crate::error::KrmFnError;

/// Make a path absolute, relative to the current directory, and clean it
/// lexically: `.` components are dropped and `..` components remove their
/// parent. The filesystem is not accessed, except to read the current
/// directory, hence the path does not need to exist.
pub fn absolute_path(path: &std::path::Path) -> Result<std::path::PathBuf, KrmFnError> {
    if path.as_os_str().is_empty() {
        return Err(KrmFnError::PathResolution {
            path: String::new(),
            reason: String::from("empty path"),
        });
    }
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(err) => {
                return Err(KrmFnError::PathResolution {
                    path: path.display().to_string(),
                    reason: format!("cannot read the current directory: {}", err),
                })
            }
        }
    };
    Ok(clean_path(&joined))
}

fn clean_path(path: &std::path::Path) -> std::path::PathBuf {
    let mut ret = std::path::PathBuf::new();
    for component in path.components() {
        match component {
            std::path::Component::CurDir => {}
            std::path::Component::ParentDir => {
                // The parent of the root is the root itself.
                if matches!(ret.components().next_back(), Some(std::path::Component::Normal(_))) {
                    ret.pop();
                }
            }
            other => ret.push(other.as_os_str()),
        }
    }
    ret
}

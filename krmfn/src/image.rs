// SPDX-FileCopyrightText: © 2023 Technical University of Munich, Chair of Connected Mobility
// SPDX-FileCopyrightText: © 2023 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

use crate::error::KrmFnError;

const PATH_COMPONENT: &str = r"(?:[a-z0-9](?:(?:[_.]|__|-*)[a-z0-9]+)*)";
const DOMAIN_COMPONENT: &str = r"(?:[a-zA-Z0-9]|[a-zA-Z0-9][a-zA-Z0-9-]*[a-zA-Z0-9])";
const TAG: &str = r"(?:[A-Za-z0-9_][A-Za-z0-9_.-]{0,127})";
const DIGEST: &str = r"(?:sha256:[a-zA-Z0-9]{64})";

fn image_regex() -> &'static regex::Regex {
    static IMAGE_REGEX: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    IMAGE_REGEX.get_or_init(|| {
        let domain = format!(r"{dc}(?:\.{dc})*(?::[0-9]+)?", dc = DOMAIN_COMPONENT);
        let name = format!(r"(?:{}/)?{pc}(?:/{pc})*", domain, pc = PATH_COMPONENT);
        let version = format!(r"(?:{}|{})", TAG, DIGEST);
        regex::Regex::new(&format!(r"^(?:{}(?:[:@]{})?)$", name, version)).expect("the image reference grammar is a valid regex")
    })
}

/// Validate the image reference of a function.
///
/// The grammar follows the Docker distribution reference:
///
/// ```text
/// name             := [domain '/'] path-component ['/' path-component]*
/// domain           := domain-component ['.' domain-component]* [':' port-number]
/// domain-component := /([a-zA-Z0-9]|[a-zA-Z0-9][a-zA-Z0-9-]*[a-zA-Z0-9])/
/// port-number      := /[0-9]+/
/// path-component   := alpha-numeric [separator alpha-numeric]*
/// alpha-numeric    := /[a-z0-9]+/
/// separator        := /[_.]|__|[-]*/
/// ```
///
/// optionally followed by `:<tag>` or `@sha256:<digest>`.
pub fn validate_function_image(image: &str) -> Result<(), KrmFnError> {
    if image_regex().is_match(image) {
        Ok(())
    } else {
        Err(KrmFnError::InvalidImageReference(image.to_string()))
    }
}

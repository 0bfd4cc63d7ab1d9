use std::collections::{HashMap, HashSet};
use std::error::Error as StdError;
use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    HtmlParse(String),
    SelectorNotFound(String),
    UnsupportedSelector(String),
    MenuRuntime(String),
    AssertionFailed {
        selector: String,
        expected: String,
        actual: String,
        dom_snippet: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HtmlParse(msg) => write!(f, "html parse error: {msg}"),
            Self::SelectorNotFound(selector) => write!(f, "selector not found: {selector}"),
            Self::UnsupportedSelector(selector) => write!(f, "unsupported selector: {selector}"),
            Self::MenuRuntime(msg) => write!(f, "menu runtime error: {msg}"),
            Self::AssertionFailed {
                selector,
                expected,
                actual,
                dom_snippet,
            } => write!(
                f,
                "assertion failed for {selector}: expected {expected}, actual {actual}, snippet {dom_snippet}"
            ),
        }
    }
}

impl StdError for Error {}

mod dom;
mod events;
mod html;
mod menu;
mod page;
mod platform;
mod selector;
mod shim;

use dom::*;
use events::*;
use html::*;
use menu::*;
use platform::*;
use selector::*;

pub use dom::NodeId;
pub use page::Page;
pub use platform::{MatcherKind, PlatformSupport};
pub use shim::NodeList;

#[cfg(test)]
mod tests;

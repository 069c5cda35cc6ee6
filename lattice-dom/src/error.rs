//! Error types for the DOM driver.
//!
//! Configuration errors are returned synchronously from the call that
//! detected them. Invariant violations found during a render cycle travel
//! down the stream as an error notification, which is why `Error` is `Clone`:
//! subjects hand the same error to every subscriber.

use thiserror::Error;

/// Errors raised by the driver, its streams and its collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A selector container matched nothing in the document.
    #[error("cannot render into unknown element '{0}'")]
    UnknownContainer(String),

    /// The container resolved to something that cannot host a rendering.
    #[error("given container is not a DOM element neither a selector string")]
    InvalidContainer,

    /// A CSS selector could not be parsed.
    #[error("invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    /// `Interactions::get` was called with a blank event name.
    #[error("interactions.get() expects a non-empty event name, got '{0}'")]
    InvalidEventName(String),

    /// The definition function returned sinks without a tree stream.
    #[error(
        "definition function given to apply_to_dom must return a stream of \
         virtual DOM elements, or sinks containing such a stream as `vtree`"
    )]
    MissingTreeStream,

    /// A custom-element widget was used as the top-level tree of a view.
    #[error("illegal to use custom element '{tag}' as the root of a view")]
    CustomElementAsRoot { tag: String },

    /// Patching the top-level tree produced something other than an element.
    #[error("patching the root produced a non-element node")]
    RootNotElement,

    /// A patch was applied to a node it was not computed for.
    #[error("patch does not fit the rendered node: {0}")]
    PatchMismatch(String),

    /// A custom-element tag is not a usable element name.
    #[error("invalid custom element name '{0}'")]
    InvalidCustomElementName(String),

    /// A custom-element tag was registered twice.
    #[error("custom element '{0}' is already registered")]
    DuplicateCustomElement(String),

    /// The driver configuration failed to load or validate.
    #[error("invalid driver configuration: {0}")]
    Config(String),

    /// A timer was subscribed outside of a tokio runtime.
    #[error("no tokio runtime available to drive timers")]
    NoRuntime,

    /// An application-level failure carried through a stream.
    #[error("{0}")]
    Stream(String),
}

impl Error {
    /// Build an application-level stream error.
    pub fn stream(message: impl Into<String>) -> Self {
        Self::Stream(message.into())
    }

    pub(crate) fn invalid_selector(selector: &str, reason: impl Into<String>) -> Self {
        Self::InvalidSelector {
            selector: selector.to_owned(),
            reason: reason.into(),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

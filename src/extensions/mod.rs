//! Optional extensions to interactive controls.

#[cfg(feature = "extension_pointer_indicator")]
pub mod pointer_indicator;

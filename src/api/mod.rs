//! Purpose: Define the stable public Rust API boundary for echoact.
//! Exports: Core types and operations needed by the CLI and tests.
//! Role: Public, additive-only surface; hides internal module layout.
//! Invariants: This module is the only public path callers should rely on.

mod client;

pub use crate::core::action::{
    BUILD_STAMP_FALLBACK, PARAM_DEFAULT, PARAM_KEY, RuntimeStamp, annotate, apply_param_default,
    echo, parse_params, parse_value, stringify,
};
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use client::ActionClient;

//! Configuration for bundling operations.
//!
//! [`BundleSpecBuilder`] resolves defaults and validates once; the resulting
//! [`BundleSpec`] is never mutated afterwards.

mod arch;
mod builder;
mod core;
mod runtime;
mod tools;

pub use arch::{Arch, Os};
pub use builder::{BundleSpecBuilder, DEFAULT_ENTRYPOINT};
pub use core::{BundleSpec, STAGING_DIR_NAME};
pub use runtime::{
    DEFAULT_RUNTIME_DIR, NODE_DIST_MEMBER_TEMPLATE, NODE_DIST_URL_TEMPLATE, ResolvedRuntime,
    RuntimeSpec,
};
pub use tools::{Timeouts, ToolCommand};

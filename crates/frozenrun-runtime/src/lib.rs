//! Frozenrun bootstrap runtime
//!
//! Everything a launcher does between process start and handing control to
//! the interpreter:
//! - **flags**: command-line parsing into a [`BootstrapContext`]
//! - **mode**: choosing how the target is run
//! - **path**: deterministic search path resolution, with `.pth` expansion in **site**
//! - **finder**: unit lookup over the frozen table, directories and archives
//! - **dispatch**: the state machine tying it all together
//!
//! The interpreter itself sits behind the [`Host`] trait; [`mini::MiniHost`]
//! is a small reference implementation used by the launcher binaries and tests.

pub mod archive;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod env;
pub mod error;
pub mod finder;
pub mod flags;
pub mod host;
pub mod mini;
pub mod mode;
pub mod path;
pub mod site;
pub mod streams;
pub mod usage;

pub use config::{ConfigError, EnvNames, Installation, LauncherConfig};
pub use context::{BootstrapContext, Flags, Phase, RunMode, WarningAction, WarningFilter, WarningFilters};
pub use dispatch::{Completion, Dispatcher, Invocation};
pub use env::Environment;
pub use error::BootstrapError;
pub use finder::{ImportError, LocatedModule, ModuleCode, ModuleFinder};
pub use flags::{parse_command_line, ParseOutcome, ParsedCommandLine, Payload};
pub use host::{code_file_bytes, strip_code_header, Host, HostEnv, HostError, TargetError, TraceFrame};
pub use mode::{classify_reference, ExecutionMode};
pub use path::{normalize_path, resolve_search_path, PathInputs, ResolvedPath};
pub use site::{PthSiteExpander, SiteExpander, SiteExpansion};
pub use streams::{Console, Streams};

//! Process lifecycle management for locally registered dev servers.
//!
//! This module finds which processes own a TCP port, launches command files
//! as detached children, remembers what it launched, and terminates
//! processes gracefully or forcefully. All public operations are instrumented
//! with `tracing` spans.
//!
//! # Components
//!
//! * `probe` - Port ownership lookup ([`PortProbe`], [`LsofProbe`])
//! * `signal` - Signal delivery ([`ProcessSignaller`], [`UnixSignaller`])
//! * `terminator` - Graceful and forced termination of pid sets
//! * `launcher` - Spawning command files with output redirected to a log
//! * `registry` - Per-entry record of launched processes
//! * `events` - Bounded history and live feed of lifecycle events
//! * `lifecycle` - [`LifecycleManager`], which ties the above together
//!
//! # Examples
//!
//! ```no_run
//! use port_manager::config::Config;
//! use port_manager::process::{EntryId, LifecycleManager};
//!
//! # async fn run() -> port_manager::Result<()> {
//! let manager = LifecycleManager::new(&Config::default());
//! let id = EntryId::from("1712345678901");
//!
//! let process = manager.start(&id, "/home/me/app/dev.command").await?;
//! println!("Started pid {}", process.pid);
//!
//! if manager.check_status(3000).await? {
//!     let report = manager.stop(&id, 3000).await?;
//!     println!("Stopped {:?}", report.killed);
//! }
//! # Ok(())
//! # }
//! ```
pub mod events;
pub mod launcher;
pub mod lifecycle;
pub mod probe;
pub mod registry;
pub mod signal;
pub mod terminator;
mod types;

pub use events::{EventLog, LifecycleEvent, LifecycleRecord};
pub use launcher::{LaunchRequest, Launcher, ShellLauncher, log_path};
pub use lifecycle::{Components, LifecycleManager};
pub use probe::{LsofProbe, PortProbe};
pub use registry::{EntryGuard, ProcessRegistry};
pub use signal::{ProcessSignaller, SignalOutcome, TermSignal, UnixSignaller};
pub use terminator::{TerminationFailure, TerminationReport, Terminator};
pub use types::{EntryId, EntryStatus, ExitNotice, ManagedProcess, ProcessId};

//! Metric collection for Linux.
//!
//! Reads `/proc`, `/sys` and a few external programs, turns cumulative
//! counters into rates and writes one JSON document per cycle.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                          Collector                            │
//! │  ┌──────────────────────┐   ┌──────────────────────────────┐  │
//! │  │   SystemCollector    │   │   external commands          │  │
//! │  │  - /proc/stat        │   │  - lsblk / ip (discovery)    │  │
//! │  │  - /proc/diskstats   │   │  - lscpu, lshw               │  │
//! │  │  - /proc/net/dev     │   │  - ip -brief address         │  │
//! │  │  - mtab + statvfs    │   └──────────────┬───────────────┘  │
//! │  └──────────┬───────────┘                  │                  │
//! │             │   CpuSampler, EntityTracker  │                  │
//! │             └──────────────┬───────────────┘                  │
//! │                     ┌──────▼──────┐                           │
//! │                     │ JsonWriter  │                           │
//! │                     └─────────────┘                           │
//! └───────────────────────────────────────────────────────────────┘
//!        FileSystem (RealFs | MockFs)   CommandRunner (RealCommands | MockCommands)
//! ```
//!
//! # Usage
//!
//! ```
//! use chrono::Utc;
//! use statstream::collector::{Collector, CycleContext, MockCommands, MockFs};
//! use statstream::config::SamplerConfig;
//! use statstream::output::{JsonWriter, OutputSink};
//!
//! let mut collector = Collector::new(
//!     MockFs::typical_system(),
//!     MockCommands::typical_system(),
//!     SamplerConfig::default(),
//! );
//! collector.prime().unwrap();
//!
//! let mut writer = JsonWriter::new(OutputSink::new(Vec::new()));
//! let ctx = CycleContext { elapsed: 1.0, loop_index: 0, now: Utc::now() };
//! collector.collect_cycle(&mut writer, &ctx).unwrap();
//! assert_eq!(writer.documents_written(), 1);
//! ```

#[allow(clippy::module_inception)]
mod collector;
pub mod external;
pub mod mock;
pub mod procfs;
pub mod records;
pub mod sections;
pub mod traits;

pub use collector::{Collector, CollectorTiming, CycleError};
pub use mock::{MockCommands, MockFs};
pub use procfs::{CollectError, Filesystem, Identity, SystemCollector, UserIdentity};
pub use sections::CycleContext;
pub use traits::{CommandRunner, FileSystem, FsUsage, RealCommands, RealFs};

pub mod aggregate;
pub mod cache;
pub mod checker;
pub mod config;
pub mod engine;
pub mod error;
pub mod ioc;
pub mod lockfile;
pub mod model;
pub mod output;
pub mod scanner;
pub mod signatures;

pub use cache::IocCache;
pub use config::Config;
pub use engine::{discover_projects, Engine, ScanOptions};
pub use error::{Diagnostic, ScanError};
pub use ioc::IocDatabase;
pub use model::{Category, Finding, Location, ScanResult, Severity, SeverityCounts};
pub use signatures::Signatures;

// Concrete implementations of the domain ports: ROOT files, local processes, HTCondor.

pub mod condor;
pub mod process;
pub mod root;

pub use condor::{CondorSubmitter, DryRunSubmitter};
pub use process::LocalExecutor;
pub use root::{AutoReader, RootTreeReader, TextTableReader};

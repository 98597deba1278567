//! Admission control: window resolution, quota ledger and gate.

mod backend;
mod gate;
mod ledger;
mod policy;
mod scope;
mod verdict;
mod window;

pub use backend::AdmissionControl;
pub use gate::AdmissionGate;
pub use ledger::{MemoryLedger, QuotaLedger};
pub use policy::QuotaPolicy;
pub use scope::Scope;
pub use verdict::{DenyReason, Verdict};
pub use window::{now_millis, TimeUnit, Window};

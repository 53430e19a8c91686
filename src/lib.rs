//! Disposable anonymous scratch files.
//!
//! New files are created in a scratch directory under random `af_XXX` names.
//! When one is closed it is moved to a "recently closed" directory that only
//! ever holds the newest few, unless it was saved somewhere else first.

pub mod error;
pub mod launcher;
pub mod ledger;
pub mod logging;
pub mod paths;
pub mod session;
pub mod settings;

pub use error::{AnonError, Result};
pub use ledger::{Eviction, Ledger};
pub use session::{CloseOutcome, Session};
pub use settings::{RawSettings, SettingChange, Settings};

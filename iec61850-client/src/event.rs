//! Callbacks into the client application

use crate::report::Report;
use iec61850_core::Iec61850Error;

/// Receiver of reports and of the end of an association.
///
/// Reports are delivered on their own task each, so an implementation may
/// block without stalling the association.
#[cfg_attr(test, mockall::automock)]
pub trait ClientEventListener: Send + Sync {
    /// A report was received and decoded
    fn new_report(&self, report: Report);

    /// The association ended. Called exactly once per association, including
    /// after an orderly disconnect.
    fn association_closed(&self, error: Iec61850Error);
}

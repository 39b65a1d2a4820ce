// Print dispatch
// Typed print requests from the UI and forwarding to the external print
// subsystem.

mod dispatcher;
mod types;

pub use dispatcher::PrintDispatcher;
pub use types::{PrintError, PrintJob, PrintRequest, PrintSubsystem, UnavailablePrintSubsystem};

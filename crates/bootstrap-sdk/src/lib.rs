// bootstrap-sdk: foundation layer for the z80 toolchain installer.
// No dependencies on the other workspace crates; provides process invocation,
// executable lookup, the trace writer abstraction and filesystem helpers.

pub mod io_util;
pub mod process_invoker;
pub mod trace;
pub mod which_util;

pub use io_util::IOUtil;
pub use process_invoker::{ProcessError, ProcessExitCodeError, ProcessInvoker, ProcessOutput};
pub use trace::{CollectingTraceWriter, NullTraceWriter, TraceLevel, TraceWriter, TracingTraceWriter};
pub use which_util::WhichUtil;

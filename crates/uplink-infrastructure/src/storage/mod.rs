//! Persistence sinks backing the session store.

mod atomic_file;
mod file_sink;
mod memory_sink;

pub use atomic_file::{AtomicFile, AtomicFileError};
pub use file_sink::FileSink;
pub use memory_sink::MemorySink;

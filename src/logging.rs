//! Log output routing: warnings and errors go to one writer, everything
//! else to another (stderr and stdout in the binary).

use tracing::Level;
use tracing_subscriber::fmt::writer::{MakeWriter, MakeWriterExt};

/// Send WARN and ERROR events to `errors`, the rest to `other`
pub fn split_by_level<E, O>(errors: E, other: O) -> impl for<'a> MakeWriter<'a> + Send + Sync + 'static
where
    E: for<'a> MakeWriter<'a> + Send + Sync + 'static,
    O: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    errors.with_max_level(Level::WARN).or_else(other)
}

use std::error::Error;
use std::fmt;

/// Formats an error and its `source()` chain on a single line,
/// `cause1: cause2: cause3`, instead of `{:#}`'s multi-line rendering.
///
/// Meant for `tracing` fields (`err = %e.fmt_compact()`), where a
/// multi-line value makes structured log output unreadable.
pub struct FmtCompactError<'e>(&'e (dyn Error + 'static));

impl fmt::Display for FmtCompactError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)?;
        let mut source = self.0.source();
        while let Some(err) = source {
            write!(f, ": {err}")?;
            source = err.source();
        }
        Ok(())
    }
}

pub trait FmtCompact {
    fn fmt_compact(&self) -> FmtCompactError<'_>;
}

impl<E> FmtCompact for E
where
    E: Error + 'static,
{
    fn fmt_compact(&self) -> FmtCompactError<'_> {
        FmtCompactError(self)
    }
}

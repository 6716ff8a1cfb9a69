//! Splits registration arguments into the service candidate and the
//! middleware around it.

use crate::error::Error;
use crate::middleware::Middleware;

use super::Arg;

/// Middleware registered around a service, in execution order.
#[derive(Clone, Debug, Default)]
pub struct Partition {
    /// Runs before the service method.
    pub before: Vec<Middleware>,
    /// Runs after the service method, with its result in
    /// [`Request::data`](crate::Request::data).
    pub after: Vec<Middleware>,
}

impl Partition {
    pub fn is_empty(&self) -> bool {
        self.before.is_empty() && self.after.is_empty()
    }
}

/// Result of [`collect`]: at most one candidate, plus everything else.
#[derive(Debug)]
pub struct Collected<'a> {
    pub service: Option<&'a Arg>,
    pub middleware: Partition,
}

/// Scans `args` left to right. Middleware lands in `before` until the first
/// non-middleware argument is seen, in `after` from then on.
///
/// A second non-middleware argument is [`Error::InvalidOptions`].
pub fn collect(args: &[Arg]) -> Result<Collected<'_>, Error> {
    let mut service = None;
    let mut middleware = Partition::default();

    for arg in args {
        match arg {
            Arg::Middleware(mw) if service.is_none() => middleware.before.push(mw.clone()),
            Arg::Middleware(mw) => middleware.after.push(mw.clone()),
            candidate if service.is_none() => service = Some(candidate),
            _ => return Err(Error::InvalidOptions),
        }
    }

    Ok(Collected { service, middleware })
}

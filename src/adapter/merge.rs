//! The operation table of a merged application.
//!
//! An [`App`](crate::App) answers to the router's operations and to the
//! framework's. Where both define a name, the router's wins; the framework
//! only fills in what the router lacks.

use std::collections::BTreeMap;

/// Which half of the application an operation resolves to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Origin {
    Server,
    Framework,
}

/// Operation name → the half that answers it.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Surface {
    ops: BTreeMap<&'static str, Origin>,
}

impl Surface {
    /// The table of a bare server.
    pub fn server(ops: &[&'static str]) -> Self {
        Self { ops: ops.iter().map(|&op| (op, Origin::Server)).collect() }
    }

    pub fn origin(&self, name: &str) -> Option<Origin> {
        self.ops.get(name).copied()
    }

    pub fn exposes(&self, name: &str) -> bool {
        self.ops.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Origin)> + '_ {
        self.ops.iter().map(|(&name, &origin)| (name, origin))
    }
}

/// Adds every framework operation `server` does not already have.
///
/// Existing entries are never touched, so merging the same framework twice
/// changes nothing the second time.
pub fn merge(framework_ops: &[&'static str], mut server: Surface) -> Surface {
    for &op in framework_ops {
        server.ops.entry(op).or_insert(Origin::Framework);
    }
    server
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router;
    use crate::service::application::SURFACE as FRAMEWORK_SURFACE;

    #[test]
    fn server_operations_win() {
        let merged = merge(FRAMEWORK_SURFACE, Surface::server(router::SURFACE));
        assert_eq!(merged.origin("use"), Some(Origin::Server));
        assert_eq!(merged.origin("set"), Some(Origin::Server));
        assert_eq!(merged.origin("listen"), Some(Origin::Server));
        assert_eq!(merged.origin("service"), Some(Origin::Framework));
        assert_eq!(merged.origin("setup"), Some(Origin::Framework));
        assert_eq!(merged.origin("hooks"), None);
    }

    #[test]
    fn merging_twice_is_merging_once() {
        let once = merge(FRAMEWORK_SURFACE, Surface::server(router::SURFACE));
        let twice = merge(FRAMEWORK_SURFACE, once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn bare_server_has_no_framework_operations() {
        let bare = Surface::server(router::SURFACE);
        assert!(bare.exposes("handle"));
        assert!(!bare.exposes("service"));
        assert!(bare.iter().all(|(_, origin)| origin == Origin::Server));
    }
}

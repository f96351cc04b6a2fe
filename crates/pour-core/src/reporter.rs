//! Reporter trait for dependency injection
//!
//! Core operations report progress through this trait so they are not
//! coupled to a particular terminal UI.

use pour_schema::{PackageName, Version};

/// Receives user-facing progress from core operations.
pub trait Reporter: Send + Sync {
    /// An artifact download has started.
    fn fetching(&self, name: &PackageName, version: &Version, url: &str);

    /// Downloaded bytes passed verification.
    fn verified(&self, name: &PackageName, version: &Version);

    /// The application bundle is being placed.
    fn installing(&self, name: &PackageName, version: &Version);

    /// The application bundle is being removed.
    fn removing(&self, name: &PackageName, version: &Version);

    /// An operation on a package finished successfully.
    fn done(&self, name: &PackageName, version: &Version, detail: &str);

    /// An operation on a package failed.
    fn failed(&self, name: &PackageName, version: &Version, reason: &str);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a success message.
    fn success(&self, msg: &str);

    /// Log a warning message.
    fn warning(&self, msg: &str);

    /// Log an error message.
    fn error(&self, msg: &str);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn fetching(&self, name: &PackageName, version: &Version, url: &str) {
        (**self).fetching(name, version, url);
    }
    fn verified(&self, name: &PackageName, version: &Version) {
        (**self).verified(name, version);
    }
    fn installing(&self, name: &PackageName, version: &Version) {
        (**self).installing(name, version);
    }
    fn removing(&self, name: &PackageName, version: &Version) {
        (**self).removing(name, version);
    }
    fn done(&self, name: &PackageName, version: &Version, detail: &str) {
        (**self).done(name, version, detail);
    }
    fn failed(&self, name: &PackageName, version: &Version, reason: &str) {
        (**self).failed(name, version, reason);
    }
    fn info(&self, msg: &str) {
        (**self).info(msg);
    }
    fn success(&self, msg: &str) {
        (**self).success(msg);
    }
    fn warning(&self, msg: &str) {
        (**self).warning(msg);
    }
    fn error(&self, msg: &str) {
        (**self).error(msg);
    }
}

/// A no-op reporter for silent operations (e.g., verification, testing).
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn fetching(&self, _: &PackageName, _: &Version, _: &str) {}
    fn verified(&self, _: &PackageName, _: &Version) {}
    fn installing(&self, _: &PackageName, _: &Version) {}
    fn removing(&self, _: &PackageName, _: &Version) {}
    fn done(&self, _: &PackageName, _: &Version, _: &str) {}
    fn failed(&self, _: &PackageName, _: &Version, _: &str) {}
    fn info(&self, _: &str) {}
    fn success(&self, _: &str) {}
    fn warning(&self, _: &str) {}
    fn error(&self, _: &str) {}
}

//! IO modules - side effects (network, filesystem)

pub mod dmg;
pub mod extract;
pub mod fetch;
pub mod fs;

// Lock controller link

pub mod link;

pub use link::{HardwareLinkController, LinkAddress, LinkSettings};

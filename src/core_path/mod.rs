pub mod virtual_path;

pub use virtual_path::VirtualPath;

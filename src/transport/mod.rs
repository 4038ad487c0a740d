/// Tar containers, optionally gzip-wrapped.
pub mod tarball;

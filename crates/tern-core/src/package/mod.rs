//! Packages: metadata, source headers and import-path resolution.

mod header;
mod metadata;
mod resolver;

pub use header::{Header, HeaderError, parse_header};
pub use metadata::{
    MAIN_PACKAGE, PackageMetadata, PackageRecord, SOURCE_SUFFIX, SourceFile, TEST_SUFFIX,
};
pub use resolver::{Resolver, has_source_suffix, local_import_path};

//! Error types for conversion.

use std::path::PathBuf;

use md2cf_diagrams::DiagramError;

/// Failure to place an asset into the output directory.
#[derive(Debug, thiserror::Error)]
pub enum MaterializeError {
    /// The asset directory could not be created.
    #[error("cannot create asset directory {}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Neither linking nor a staged copy succeeded.
    #[error("cannot copy {} to {}", from.display(), to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The source could not be read to name it apart from another asset.
    #[error("cannot read asset {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The source path has no file name component.
    #[error("asset path {} has no file name", path.display())]
    NoFileName { path: PathBuf },
}

/// Error that aborts a conversion.
///
/// Diagram problems that only affect one diagram never surface here; they
/// are reported as warnings and the diagram stays a code block.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error(transparent)]
    Diagram(#[from] DiagramError),

    #[error(transparent)]
    Materialize(#[from] MaterializeError),
}

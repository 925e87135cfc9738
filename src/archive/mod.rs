pub mod assembler;
pub mod workspace;

pub use assembler::{ArchiveAssembler, ArchiveContents, OutputArchive};
pub use workspace::Workspace;

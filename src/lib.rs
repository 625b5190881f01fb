pub mod blocks;
pub mod config;
pub mod editor;
pub mod error;
pub mod github;
pub mod lines;
pub mod mock_github;

// Re-export the everyday types at crate root for convenience
pub use blocks::{BlockArgs, GitHubBlocks, Opcode, extension_info};
pub use editor::{EditOutcome, RepositoryFileEditor};
pub use error::EditorError;
pub use github::{BoxedContentsClient, ContentsClient, Credential, FileLocator, RemoteFile, Revision, WriteReceipt};
pub use lines::LineEdit;

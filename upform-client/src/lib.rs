//! upform Client
//!
//! Uploads payloads to an object store through its HTTP form API.
//! - Single-shot: one signed multipart post, for small payloads
//! - Sliced: resumable block-by-block upload coordinated by a server-side
//!   session, for large payloads
//!
//! ```no_run
//! use upform_client::{ClientConfig, FormClient};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let client = FormClient::new("my-bucket", "account-key", ClientConfig::default())?;
//! client.slice_post_file("backup.tar", "/backups/backup.tar").await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod endpoint;
pub mod error;
pub mod form;
pub mod slice;
pub mod source;
pub mod transport;

pub use config::ClientConfig;
pub use endpoint::{Endpoint, Route};
pub use error::{ClientError, ErrorKind, UploadError};
pub use form::{FormClient, FormOptions, PostReport, ProgressFn};
pub use slice::{BlockEvent, SliceReport, SliceState};
pub use source::{read_exact_at, ByteSource, FileSource, MemorySource};
pub use transport::{FilePart, HttpResponse, HttpTransport, Transport};
pub use upform_core::WireFormat;

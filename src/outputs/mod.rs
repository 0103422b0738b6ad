//! Output writers for a run's [`PaperDigest`](crate::models::PaperDigest).
//!
//! Writers only read the digest. A failing writer is logged by the caller and
//! does not stop the others.
//!
//! # Submodules
//!
//! - [`json`]: `papers.json` snapshot, also read back as the fallback source
//! - [`markdown`]: repository `README.md`
//! - [`archive`]: per-day archive files and their index
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── papers.json            # Snapshot of the latest digest
//! ├── README.md              # Latest papers with statistics
//! └── papers/
//!     ├── README.md          # Index of collected days
//!     ├── 2025-05-05.md
//!     └── 2025-05-06.md      # Day file, grouped by month
//! ```

pub mod archive;
pub mod json;
pub mod markdown;

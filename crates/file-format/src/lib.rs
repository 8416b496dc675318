//! Reading and writing shapes: the native versioned JSON container, STEP
//! import and export, and STL export.

pub mod errors;
pub mod exchange;
pub mod load;
pub mod metadata;
pub mod migrate;
pub mod save;
pub mod step_export;
pub mod step_import;
pub mod stl;

pub use errors::{ExportError, LoadError};
pub use exchange::{export_iges, import_iges, import_step, BrepExchange};
pub use load::{load_bodies, load_brep, read_brep};
pub use metadata::ProjectMetadata;
pub use save::{save_bodies, save_brep, write_brep, Body, BrepFile, FORMAT_ID, FORMAT_VERSION};
pub use step_export::{export_step, write_step, LengthUnit, StepOptions};
pub use step_import::{parse_step, read_step};
pub use stl::{export_ascii_stl, export_binary_stl, export_stl, write_stl, StlOptions};

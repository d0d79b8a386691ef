pub mod argvars;
pub mod convert;
pub mod custom_argvars;
pub mod error;
pub mod ewp;
pub mod generator;
pub mod path;
pub mod premake;

pub use convert::{convert, ConvertOptions, Conversion};
pub use error::{EwpError, EwpResult};
pub use ewp::{extract_configurations, parse_groups, Ewp, EwpBuilder};
pub use generator::{Generator, GeneratorOutput};
pub use premake::PremakeScript;

pub mod colorspaces;
pub mod convert;
pub mod plot;

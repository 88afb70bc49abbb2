pub mod partition;
pub mod safe;

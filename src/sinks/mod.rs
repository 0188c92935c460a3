//! Where a fetched token goes: rendered to stdout or handed to curl.

pub mod curl;
pub mod output_format;

//! Section rotation plugin
//!
//! Serves `accelbyte.platform.catalog.section.v1.Section` on top of
//! [`grpc_app::App`]; [`bootstrap::build_options`] turns the environment
//! toggles into the option list.

pub mod bootstrap;
pub mod config;
pub mod logging;
pub mod service;

pub mod section_proto {
    tonic::include_proto!("accelbyte.platform.catalog.section.v1");

    pub const FILE_DESCRIPTOR_SET: &[u8] =
        tonic::include_file_descriptor_set!("section_descriptor");
}

pub use config::Config;
pub use service::{BackfillPolicy, SectionServiceImpl};

pub const DEFAULT_APP_PORT: u16 = 6565;

//! Utility modules

pub mod paths;
pub mod slug;

pub use paths::{
    data_dir, init_data_dir, log_file_path, logs_dir, session_path, settings_path,
};
pub use slug::{generate_id, slugify};

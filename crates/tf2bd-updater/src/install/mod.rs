mod pipeline;
mod unzip;

pub use pipeline::{download_and_extract, download_build, download_update_tool, ARCHIVE_FILE, EXTRACT_DIR};
pub use unzip::unzip_into;

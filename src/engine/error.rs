// Error type for the fallible edges of the engine: loading settings and
// accepting page images. Geometry and page-turn updates never fail.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CurlError {
    #[error("error loading settings: {0}")]
    Config(#[from] config::ConfigError),

    #[error("page image is empty ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    #[error("page image is {width}x{height} but has {len} bytes of RGBA data, expected {expected}")]
    ImageSize { width: u32, height: u32, len: usize, expected: usize },
}

pub type Result<T, E = CurlError> = std::result::Result<T, E>;

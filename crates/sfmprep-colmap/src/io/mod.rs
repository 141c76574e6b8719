/// Bundler (bundle.out) reader and image lists.
pub mod bundler;

/// COLMAP text model reader and writer.
pub mod colmap;

use crate::error::ColmapError;

/// Parse one whitespace separated token of a text file.
pub(crate) fn parse_part<T: std::str::FromStr>(s: &str) -> Result<T, ColmapError>
where
    T::Err: std::fmt::Display,
{
    s.parse::<T>()
        .map_err(|e| ColmapError::ParseError(format!("{}: {}", s, e)))
}

use std::fmt;
use std::sync::Arc;

mod error;

pub use error::{Error, Result};

/// The maximum allowed length for a [`ContainerID`].
const CONTAINER_ID_MAX_LEN: usize = 255;

/// A validated container identifier.
///
/// # Examples
///
/// ```
/// # use creo_exporter::container::ContainerID;
/// let container_id = ContainerID::new("web-1").unwrap();
/// assert_eq!(container_id.as_ref(), "web-1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerID(Arc<str>);

impl ContainerID {
    /// Creates a new `ContainerID` from the given raw id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContainerID`] if the input is empty or longer
    /// than [`CONTAINER_ID_MAX_LEN`].
    pub fn new(src: impl AsRef<str>) -> Result<Self> {
        let src = src.as_ref();
        if src.is_empty() || src.len() > CONTAINER_ID_MAX_LEN {
            return Err(Error::InvalidContainerID(src.to_owned()));
        }

        Ok(Self(src.into()))
    }

    /// Creates a `ContainerID` from the id part of a runtime scope name.
    ///
    /// Runtimes name scopes after the hex digest of the container, so only
    /// lowercase ASCII letters and digits are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContainerID`] if `src` is not valid for
    /// [`ContainerID::new`] or contains other characters.
    ///
    /// # Examples
    ///
    /// ```
    /// # use creo_exporter::container::ContainerID;
    /// let raw = "abcdef012345abcdef012345abcdef012345abcdef012345abcdef012345abcd";
    /// assert!(ContainerID::from_scope_id(raw.as_bytes()).is_ok());
    /// assert!(ContainerID::from_scope_id(b"ABC").is_err());
    /// ```
    pub fn from_scope_id(src: &[u8]) -> Result<Self> {
        let id = std::str::from_utf8(src)
            .ok()
            .filter(|id| is_lowercase_alpha_numeric(id.as_bytes()))
            .ok_or_else(|| Error::InvalidContainerID(String::from_utf8_lossy(src).into_owned()))?;
        Self::new(id)
    }
}

impl AsRef<str> for ContainerID {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Checks whether all bytes are lowercase ASCII letters or digits.
fn is_lowercase_alpha_numeric(src: &[u8]) -> bool {
    src.iter()
        .all(|b| b.is_ascii_digit() || b.is_ascii_lowercase())
}

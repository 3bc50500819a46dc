//! Discover the privileges needed to open raw `IPv4` sockets.
//!
//! traceflow writes its own `IPv4` headers through an `IPPROTO_RAW` socket
//! and reads replies from a raw `ICMP` socket, both of which are privileged
//! on every supported platform.
//!
//! [`Privilege::acquire_privileges`]:
//!
//! - On Linux, if `CAP_NET_RAW` is in the permitted set it is raised to the
//!   effective set
//! - Elsewhere this is a no-op
//!
//! [`Privilege::has_privileges`]:
//!
//! - On Linux, `CAP_NET_RAW` must be in the effective set
//! - On other Unix platforms the effective user must be root
//! - Elsewhere privileges are never reported
//!
//! # Example
//!
//! ```rust
//! # fn main() -> anyhow::Result<()> {
//! # use traceflow_privilege::Privilege;
//! let privilege = Privilege::acquire_privileges()?;
//! match privilege.check() {
//!     Ok(()) => println!("raw sockets are available"),
//!     Err(err) => println!("{err}"),
//! }
//! # Ok(())
//! # }
//! ```
#![forbid(unsafe_code)]

/// A privilege error result.
pub type Result<T> = std::result::Result<T, Error>;

/// A privilege error.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[cfg(target_os = "linux")]
    #[error("caps error: {0}")]
    CapsError(#[from] caps::errors::CapsError),
    #[error("requires elevated privilege ({0})")]
    InsufficientPrivileges(&'static str),
}

/// The privileges of the running process.
///
/// Both raw sockets are always privileged, so there is no unprivileged
/// mode to fall back to.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Privilege {
    has_privileges: bool,
}

impl Privilege {
    /// Discover the current privileges without changing them.
    pub fn discover() -> Result<Self> {
        Ok(Self {
            has_privileges: Self::check_has_privileges()?,
        })
    }

    #[must_use]
    pub const fn has_privileges(&self) -> bool {
        self.has_privileges
    }

    /// Fail unless raw sockets can be opened with the current privileges.
    pub fn check(&self) -> Result<()> {
        if !self.has_privileges {
            Err(Error::InsufficientPrivileges(REQUIRED_PRIVILEGE))
        } else {
            Ok(())
        }
    }

    #[cfg(target_os = "linux")]
    pub fn acquire_privileges() -> Result<Self> {
        if caps::has_cap(None, caps::CapSet::Permitted, caps::Capability::CAP_NET_RAW)? {
            caps::raise(None, caps::CapSet::Effective, caps::Capability::CAP_NET_RAW)?;
        }
        Self::discover()
    }

    #[cfg(target_os = "linux")]
    fn check_has_privileges() -> Result<bool> {
        Ok(caps::has_cap(
            None,
            caps::CapSet::Effective,
            caps::Capability::CAP_NET_RAW,
        )?)
    }

    /// Clear the effective capability set once the raw sockets are open.
    #[cfg(target_os = "linux")]
    pub fn drop_privileges() -> Result<()> {
        caps::clear(None, caps::CapSet::Effective)?;
        Ok(())
    }

    #[cfg(not(target_os = "linux"))]
    pub fn acquire_privileges() -> Result<Self> {
        Self::discover()
    }

    #[cfg(all(unix, not(target_os = "linux")))]
    #[allow(clippy::unnecessary_wraps)]
    fn check_has_privileges() -> Result<bool> {
        Ok(nix::unistd::Uid::effective().is_root())
    }

    #[cfg(not(unix))]
    #[allow(clippy::unnecessary_wraps)]
    const fn check_has_privileges() -> Result<bool> {
        Ok(false)
    }

    #[cfg(not(target_os = "linux"))]
    pub const fn drop_privileges() -> Result<()> {
        Ok(())
    }
}

#[cfg(target_os = "linux")]
const REQUIRED_PRIVILEGE: &str = "root or CAP_NET_RAW";

#[cfg(not(target_os = "linux"))]
const REQUIRED_PRIVILEGE: &str = "root";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check() {
        let privileged = Privilege {
            has_privileges: true,
        };
        assert!(privileged.check().is_ok());
        let unprivileged = Privilege {
            has_privileges: false,
        };
        let err = unprivileged.check().unwrap_err();
        assert_eq!(
            format!("requires elevated privilege ({REQUIRED_PRIVILEGE})"),
            err.to_string()
        );
    }

    #[test]
    fn test_discover_matches_check() -> anyhow::Result<()> {
        let privilege = Privilege::discover()?;
        assert_eq!(privilege.has_privileges(), privilege.check().is_ok());
        Ok(())
    }
}

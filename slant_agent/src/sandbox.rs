//! One-way filesystem restriction applied before the sampling loop starts.
//! Nothing in the crate undoes it.

use tracing::debug;

use crate::error::AgentError;

/// Trees the Linux provider reads counters from after the restriction.
#[cfg(target_os = "linux")]
pub const READABLE_TREES: [&str; 2] = ["/proc", "/sys"];

/// Moves to `/` and hides the rest of the filesystem from the process for
/// the rest of its life.
///
/// On Linux the ruleset binds the calling thread and any thread it spawns
/// afterwards, so call this before worker threads exist.
pub fn restrict_filesystem() -> Result<(), AgentError> {
    std::env::set_current_dir("/").map_err(|source| AgentError::Restrict { op: "chdir", source })?;
    lock_filesystem()
}

#[cfg(target_os = "openbsd")]
fn lock_filesystem() -> Result<(), AgentError> {
    use std::io;
    use std::ptr;

    // SAFETY: both arguments are NUL-terminated literals; NULL/NULL locks the
    // unveil list.
    unsafe {
        if libc::unveil(c"/var/empty".as_ptr(), c"".as_ptr()) == -1 {
            return Err(AgentError::Restrict {
                op: "unveil",
                source: io::Error::last_os_error(),
            });
        }
        if libc::unveil(ptr::null(), ptr::null()) == -1 {
            return Err(AgentError::Restrict {
                op: "unveil",
                source: io::Error::last_os_error(),
            });
        }
    }
    debug!("filesystem hidden behind /var/empty");
    Ok(())
}

#[cfg(target_os = "linux")]
fn lock_filesystem() -> Result<(), AgentError> {
    use std::io;

    use landlock::{
        path_beneath_rules, Access, AccessFs, Ruleset, RulesetAttr, RulesetCreatedAttr,
        RulesetStatus, ABI,
    };

    let landlock_err = |e: landlock::RulesetError| AgentError::Restrict {
        op: "landlock",
        source: io::Error::other(e),
    };

    let abi = ABI::V3;
    let status = Ruleset::default()
        .handle_access(AccessFs::from_all(abi))
        .map_err(landlock_err)?
        .create()
        .map_err(landlock_err)?
        .add_rules(path_beneath_rules(READABLE_TREES, AccessFs::from_read(abi)))
        .map_err(landlock_err)?
        .restrict_self()
        .map_err(landlock_err)?;

    match status.ruleset {
        RulesetStatus::NotEnforced => Err(AgentError::Restrict {
            op: "landlock",
            source: io::Error::new(
                io::ErrorKind::Unsupported,
                "kernel does not enforce landlock rulesets",
            ),
        }),
        enforced => {
            debug!(?enforced, trees = ?READABLE_TREES, "filesystem limited to read-only counter trees");
            Ok(())
        }
    }
}

#[cfg(not(any(target_os = "openbsd", target_os = "linux")))]
fn lock_filesystem() -> Result<(), AgentError> {
    debug!("no filesystem lock on this platform, working directory is /");
    Ok(())
}

// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::ffi::OsString;
use std::path::Path;

/// Mount point of the work directory inside the jail.
pub(crate) const JAIL_WORKDIR: &str = "/workspace";

/// System directories bound read-only.  Missing ones are tolerated.
const RO_SYSTEM_DIRS: &[&str] = &["/usr", "/bin", "/sbin", "/lib", "/lib32", "/lib64", "/etc", "/opt"];

/// bubblewrap arguments that run `cmd` through `sh -c` with a read-only
/// system, private `/tmp`, `/proc` and `/dev`, and `workdir` writable at
/// [`JAIL_WORKDIR`].  The jail dies with its parent and gets its own PID
/// namespace.
pub fn jail_args(workdir: &Path, cmd: &str) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();
    for dir in RO_SYSTEM_DIRS {
        args.extend(["--ro-bind-try", dir, dir].map(OsString::from));
    }
    args.extend(["--tmpfs", "/tmp", "--proc", "/proc", "--dev", "/dev"].map(OsString::from));
    args.push("--bind".into());
    args.push(workdir.as_os_str().to_owned());
    args.push(JAIL_WORKDIR.into());
    args.extend(
        [
            "--chdir",
            JAIL_WORKDIR,
            "--setenv",
            "HOME",
            JAIL_WORKDIR,
            "--die-with-parent",
            "--unshare-pid",
            "--",
            "sh",
            "-c",
        ]
        .map(OsString::from),
    );
    args.push(cmd.into());
    args
}

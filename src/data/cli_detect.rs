use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::Result;

/// Check if a CLI tool is available on PATH.
pub fn is_available(cmd: &str) -> bool {
    Command::new(cmd)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .is_ok()
}

/// Open a URL in the default browser.
pub fn open_url(url: &str) -> Result<()> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        anyhow::bail!("refusing to open non-http URL: {}", url);
    }

    #[cfg(target_os = "windows")]
    let mut cmd = {
        let mut c = Command::new("cmd");
        c.args(["/C", "start", "", url]);
        c
    };
    #[cfg(target_os = "macos")]
    let mut cmd = {
        let mut c = Command::new("open");
        c.arg(url);
        c
    };
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    let mut cmd = {
        let mut c = Command::new("xdg-open");
        c.arg(url);
        c
    };

    cmd.stdout(Stdio::null()).stderr(Stdio::null()).spawn()?;
    Ok(())
}

/// Check out a PR's head branch with `gh pr checkout` in `cwd`.
pub fn checkout_pr(cwd: &Path, repo: &str, number: u64) -> Result<()> {
    let output = Command::new("gh")
        .args(["pr", "checkout", &number.to_string(), "--repo", repo])
        .current_dir(cwd)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("gh pr checkout failed: {}", stderr.trim());
    }
    Ok(())
}

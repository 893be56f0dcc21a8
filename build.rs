use std::process::Command;

fn main() {
    // FRECKLE_VERSION wins (set by release builds); otherwise describe the
    // checkout for local builds.
    if let Ok(version) = std::env::var("FRECKLE_VERSION") {
        println!("cargo:rustc-env=FRECKLE_VERSION={version}");
    } else if let Ok(output) = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        && output.status.success()
    {
        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        println!("cargo:rustc-env=FRECKLE_VERSION={version}");
    }

    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/");
    println!("cargo:rerun-if-env-changed=FRECKLE_VERSION");
}

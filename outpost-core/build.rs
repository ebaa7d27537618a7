use std::env;
use std::process::Command;

fn main() {
    let target = env::var("TARGET").unwrap_or_else(|_| "unknown".to_string());
    let profile = env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());

    let rustc = env::var("RUSTC").unwrap_or_else(|_| "rustc".to_string());
    let rustc_version = Command::new(rustc)
        .arg("--version")
        .output()
        .ok()
        .filter(|out| out.status.success())
        .map(|out| String::from_utf8_lossy(&out.stdout).trim().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=OUTPOST_BUILD_TARGET={target}");
    println!("cargo:rustc-env=OUTPOST_BUILD_PROFILE={profile}");
    println!("cargo:rustc-env=OUTPOST_RUSTC_VERSION={rustc_version}");
    println!("cargo:rerun-if-changed=build.rs");
}

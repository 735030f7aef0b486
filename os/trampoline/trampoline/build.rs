use std::{env, path::PathBuf};

/// Where the boot loader places the trampoline.
const PHYS_LOAD: u64 = 0x0010_0000;

fn main() {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").expect("set by cargo"));
    let ld = manifest_dir.join("trampoline.ld");

    // Rebuild when inputs change
    println!("cargo:rerun-if-changed={}", ld.display());

    // Hosted builds (tests) use the platform's default layout.
    if env::var("CARGO_CFG_TARGET_OS").as_deref() != Ok("none") {
        return;
    }

    assert_eq!(
        PHYS_LOAD & 0xfff,
        0,
        "PHYS_LOAD must be 4 KiB aligned (got {PHYS_LOAD:#x})"
    );

    println!("cargo:rustc-link-arg-bins=-T{}", ld.display());
    println!("cargo:rustc-link-arg-bins=--defsym=PHYS_LOAD={PHYS_LOAD:#x}");
}

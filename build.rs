use std::env;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Only the firmware binary links against cortex-m-rt
    if env::var_os("CARGO_FEATURE_RT").is_none() {
        return;
    }

    let out = &PathBuf::from(env::var_os("OUT_DIR").unwrap());

    // Put the linker script somewhere the linker can find it
    let mut linkscr = File::create(out.join("memory.x")).unwrap();
    writeln!(
        linkscr,
        "\
        MEMORY {{\n\
            FLASH (rx) : ORIGIN = 0x08000000, LENGTH = 256K\n\
            RAM (rwx) : ORIGIN = 0x20000000, LENGTH = 64K\n\
        }}"
    )
    .unwrap();
    drop(linkscr);

    println!("cargo:rustc-link-search={}", out.display());
}

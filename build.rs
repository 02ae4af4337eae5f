// build.rs

fn main() {
    // --- Link against X11 and the extensions the backend calls directly ---
    // pkg-config first; if that fails, fall back to plain linker flags.
    // libGL is deliberately absent: it is opened at runtime when the first
    // GL peer is created.

    let libraries = ["x11", "xxf86vm", "xcursor"];

    let mut pkg_config_success = true;

    for lib in &libraries {
        if pkg_config::probe_library(lib).is_err() {
            eprintln!(
                "pkg-config failed for library '{}'. Falling back to manual linking.",
                lib
            );
            pkg_config_success = false;
            break;
        }
    }

    if !pkg_config_success {
        println!("cargo:rustc-link-lib=X11");
        println!("cargo:rustc-link-lib=Xxf86vm");
        println!("cargo:rustc-link-lib=Xcursor");
        println!("cargo:rustc-link-search=/usr/lib");
        eprintln!(
            "Manual linking flags applied. Ensure X11, Xxf86vm and Xcursor development libraries are installed."
        );
    } else {
        eprintln!("pkg-config successfully found libraries. Linking configured automatically.");
    }
}

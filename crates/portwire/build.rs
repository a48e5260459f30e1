//! Stamps build metadata reported by `portwire version --extended`.

const STAMPED: &[(&str, &str)] = &[
    ("TARGET", "PORTWIRE_BUILD_TARGET"),
    ("PROFILE", "PORTWIRE_BUILD_PROFILE"),
    ("OPT_LEVEL", "PORTWIRE_BUILD_OPT_LEVEL"),
];

fn main() {
    for (source, stamped) in STAMPED {
        if let Ok(value) = std::env::var(source) {
            println!("cargo:rustc-env={stamped}={value}");
        }
        println!("cargo:rerun-if-env-changed={source}");
    }
}

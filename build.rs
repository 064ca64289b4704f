use std::env;
use std::fs;
use std::path::Path;

// Embeds config.toml so the binary has working defaults when run outside the repo.
fn main() {
    println!("cargo:rerun-if-changed=config.toml");

    let defaults = fs::read_to_string("config.toml").expect("config.toml must exist at the crate root");

    let out_dir = env::var("OUT_DIR").expect("OUT_DIR is set by cargo");
    let target = Path::new(&out_dir).join("default_config.rs");

    fs::write(
        target,
        format!("pub const DEFAULT_CONFIG: &str = r#\"{defaults}\"#;"),
    )
    .expect("failed to write embedded default config");
}

use camino::Utf8Path;
use eventlog_cfg::Config;
use std::{error::Error, fs};

fn main() -> Result<(), Box<dyn Error>> {
    println!("cargo:rerun-if-changed=eventlog-cfg/src/config.rs");
    let cfg = Config::default();

    let toml_path = Utf8Path::new("demos/config.toml");
    if let Some(parent) = toml_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let toml = toml::to_string(&cfg)?;
    fs::write(toml_path, toml)?;

    Ok(())
}

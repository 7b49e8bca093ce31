use std::env;
use std::fs;
use std::path::Path;

fn main() {
    println!("cargo:rerun-if-changed=../../formulas.toml");

    // OUT_DIR is typically: target/debug/build/importer-xxx/out
    // formulas.toml goes to: target/debug or target/release
    let (Ok(out_dir), Ok(profile)) = (env::var("OUT_DIR"), env::var("PROFILE")) else {
        return;
    };
    let Some(target_dir) = Path::new(&out_dir).ancestors().find(|p| p.ends_with(&profile)) else {
        println!("cargo:warning=Could not find target profile directory, formulas.toml not copied");
        return;
    };

    // Source formulas.toml from workspace root
    let workspace_root = Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .and_then(|p| p.parent());
    let Some(workspace_root) = workspace_root else {
        return;
    };

    let source_config = workspace_root.join("formulas.toml");
    let dest_config = target_dir.join("formulas.toml");

    if source_config.exists() {
        match fs::copy(&source_config, &dest_config) {
            Ok(_) => println!("cargo:warning=Copied formulas.toml to {:?}", dest_config),
            Err(e) => println!("cargo:warning=Failed to copy formulas.toml: {}", e),
        }
    } else {
        println!(
            "cargo:warning=formulas.toml not found at {:?}, using default config",
            source_config
        );
    }
}

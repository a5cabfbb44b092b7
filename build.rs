// build.rs

use std::collections::BTreeMap;
use std::env;
use std::error::Error;
use std::fs;
use std::path::Path;

fn main() -> Result<(), Box<dyn Error>> {
    // --- 1. Determine the language ---
    // Priority 1: `lang_*` feature flags set by Cargo.
    let mut active_langs: Vec<String> = env::vars()
        .filter_map(|(key, _)| {
            key.strip_prefix("CARGO_FEATURE_LANG_")
                .map(str::to_lowercase)
        })
        .collect();
    active_langs.sort();

    let lang = match active_langs.first() {
        Some(first) => {
            if active_langs.len() > 1 {
                println!(
                    "cargo:warning=Multiple language features enabled ({:?}). Using '{}'.",
                    active_langs, first
                );
            }
            first.clone()
        }
        // Priority 2: ARGTREE_LANG, then English.
        None => env::var("ARGTREE_LANG").unwrap_or_else(|_| "en".to_string()),
    };

    println!("cargo:rustc-env=ARGTREE_LANG_EFFECTIVE={}", lang);
    println!("cargo:rerun-if-env-changed=ARGTREE_LANG");
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=locales/");

    // --- 2. English is always loaded as the fallback ---
    let fallback_content = fs::read_to_string("locales/en.toml")
        .map_err(|e| format!("Failed to read fallback language file locales/en.toml: {e}"))?;
    let mut translations: BTreeMap<String, String> = toml::from_str(&fallback_content)
        .map_err(|e| format!("Failed to parse locales/en.toml: {e}"))?;

    if lang != "en" {
        let lang_file_path = format!("locales/{}.toml", lang);
        match fs::read_to_string(&lang_file_path) {
            Ok(content) => {
                let specific: BTreeMap<String, String> = toml::from_str(&content)
                    .map_err(|e| format!("Failed to parse {lang_file_path}: {e}"))?;
                translations.extend(specific);
            }
            Err(_) => println!(
                "cargo:warning=Language file '{}' not found. Falling back to 'en'.",
                lang_file_path
            ),
        }
    }

    // --- 3. Generate the `t!` macro ---
    let mut macro_code = String::from("/// Looks up a translated message by key.\n#[macro_export]\nmacro_rules! t {\n");
    for (key, value) in &translations {
        let escaped_value = value.replace('\\', "\\\\").replace('"', "\\\"");
        macro_code.push_str(&format!("    (\"{}\") => {{ \"{}\" }};\n", key, escaped_value));
    }
    macro_code.push_str(
        "    ($key:expr) => {{ compile_error!(concat!(\"Missing translation key: \", $key)) }};\n",
    );
    macro_code.push('}');

    let out_dir = env::var("OUT_DIR")?;
    fs::write(Path::new(&out_dir).join("translations.rs"), macro_code)?;
    Ok(())
}

use std::path::Path;

use base64::{Engine as _, engine::general_purpose};
use rand::RngCore;

/// Make sure `APP_ENCRYPTION_KEY` exists: in the process environment, in the
/// `.env` file, or freshly generated and appended to the file.
///
/// The key is written exactly once. An existing value, wherever it lives, is
/// never overwritten. Returns true when a new key was generated.
pub fn ensure_encryption_key(env_path: &Path) -> anyhow::Result<bool> {
    if std::env::var("APP_ENCRYPTION_KEY").is_ok() {
        return Ok(false);
    }
    if let Some(existing) = read_env_value(env_path, "APP_ENCRYPTION_KEY")? {
        // Present in the file but not the process env (dotenv not loaded yet).
        unsafe { std::env::set_var("APP_ENCRYPTION_KEY", existing) };
        return Ok(false);
    }

    let key = generate_key();
    append_env_line(env_path, "APP_ENCRYPTION_KEY", &key)?;
    unsafe { std::env::set_var("APP_ENCRYPTION_KEY", &key) };
    Ok(true)
}

fn generate_key() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    general_purpose::STANDARD.encode(bytes)
}

fn read_env_value(path: &Path, key: &str) -> anyhow::Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(path)?;
    for line in contents.lines() {
        let line = line.trim();
        if line.starts_with('#') {
            continue;
        }
        if let Some((k, v)) = line.split_once('=')
            && k.trim() == key
        {
            let v = v.trim().trim_matches('"').to_string();
            if !v.is_empty() {
                return Ok(Some(v));
            }
        }
    }
    Ok(None)
}

fn append_env_line(path: &Path, key: &str, value: &str) -> anyhow::Result<()> {
    let mut contents = if path.exists() {
        std::fs::read_to_string(path)?
    } else {
        String::new()
    };
    if !contents.is_empty() && !contents.ends_with('\n') {
        contents.push('\n');
    }
    contents.push_str(&format!("{key}={value}\n"));
    std::fs::write(path, contents)?;
    Ok(())
}

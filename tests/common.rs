use corsotron::config::Config;

/// A config with every mandatory field present, pointed at the given CLI
/// path and authorize endpoint.
pub fn test_config(cli_path: Option<&str>, auth_url: &str) -> Config {
    Config {
        account_id: Some("00d320f21b26310".to_string()),
        application_key_id: Some("keyid123".to_string()),
        application_key: Some("secret".to_string()),
        bucket_id: Some("bucket123".to_string()),
        cli_path: cli_path.map(str::to_string),
        frontend_origins: Some("https://a.example,https://b.example".to_string()),
        frontend_origin: None,
        auth_url: auth_url.to_string(),
        logging: Default::default(),
    }
}

/// Writes an executable shell script standing in for the b2 CLI into a fresh
/// temp directory and returns its path. The body decides which subcommands
/// succeed; `$0` can be used to drop marker files next to the script.
#[cfg(unix)]
pub fn fake_b2(body: &str) -> std::path::PathBuf {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    let dir = std::env::temp_dir().join(format!("corsotron-test-{}", uuid::Uuid::new_v4()));
    fs::create_dir_all(&dir).expect("failed to create temp dir");
    let path = dir.join("b2");
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).expect("failed to write fake b2");

    let mut perms = fs::metadata(&path).expect("failed to stat fake b2").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).expect("failed to chmod fake b2");
    path
}

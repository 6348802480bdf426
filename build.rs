// Build script - reads config.yaml at compile time and generates defaults
// The compiled values seed AppConfig; settings.yaml overrides them at runtime

use std::env;
use std::fs;
use std::path::Path;

fn main() {
    println!("cargo:rerun-if-changed=src/config.yaml");

    let out_dir = env::var("OUT_DIR").expect("OUT_DIR is set by cargo");
    let dest_path = Path::new(&out_dir).join("compiled_config.rs");

    let config = if Path::new("src/config.yaml").exists() {
        let content = fs::read_to_string("src/config.yaml")
            .expect("Failed to read src/config.yaml");
        parse_config(&content)
    } else {
        CompiledConfig::default()
    };

    let generated = format!(
        r#"// Auto-generated from config.yaml at compile time
// Do not edit - modify config.yaml and rebuild instead

pub const CLIENT_ID: &str = "{client_id}";
pub const CLIENT_SECRET: &str = "{client_secret}";
pub const AUTHORIZATION_BASE_URL: &str = "{authorization_base_url}";
pub const TOKEN_URL: &str = "{token_url}";
pub const APPS_SETTINGS_URL: &str = "{apps_settings_url}";
pub const CALLBACK_HOST: &str = "{callback_host}";
pub const CALLBACK_PORT: u16 = {callback_port};
pub const SCOPES: &[&str] = &[
{scopes}
];

pub const API_BASE_URL: &str = "{api_base_url}";
pub const API_VERSION: &str = "{api_version}";
pub const TEMPLATE_OWNER: &str = "{template_owner}";
pub const TEMPLATE_NAME: &str = "{template_name}";
pub const PAGES_BRANCH: &str = "{pages_branch}";
pub const PAGES_PATH: &str = "{pages_path}";

pub const FETCH_PERIOD_SECS: u64 = {fetch_period_secs};
pub const CLONE_RETRY_DELAY_SECS: u64 = {clone_retry_delay_secs};
pub const CLONE_RETRY_ATTEMPTS: u32 = {clone_retry_attempts};
pub const STATUS_DEBOUNCE_MS: u64 = {status_debounce_ms};

pub const TICK_MS: u64 = {tick_ms};
"#,
        client_id = config.client_id,
        client_secret = config.client_secret,
        authorization_base_url = config.authorization_base_url,
        token_url = config.token_url,
        apps_settings_url = config.apps_settings_url,
        callback_host = config.callback_host,
        callback_port = config.callback_port,
        scopes = config
            .scopes
            .iter()
            .map(|s| format!("    \"{}\",", s))
            .collect::<Vec<_>>()
            .join("\n"),
        api_base_url = config.api_base_url,
        api_version = config.api_version,
        template_owner = config.template_owner,
        template_name = config.template_name,
        pages_branch = config.pages_branch,
        pages_path = config.pages_path,
        fetch_period_secs = config.fetch_period_secs,
        clone_retry_delay_secs = config.clone_retry_delay_secs,
        clone_retry_attempts = config.clone_retry_attempts,
        status_debounce_ms = config.status_debounce_ms,
        tick_ms = config.tick_ms,
    );

    fs::write(&dest_path, generated).expect("Failed to write compiled config");
}

struct CompiledConfig {
    client_id: String,
    client_secret: String,
    authorization_base_url: String,
    token_url: String,
    apps_settings_url: String,
    callback_host: String,
    callback_port: u16,
    scopes: Vec<String>,
    api_base_url: String,
    api_version: String,
    template_owner: String,
    template_name: String,
    pages_branch: String,
    pages_path: String,
    fetch_period_secs: u64,
    clone_retry_delay_secs: u64,
    clone_retry_attempts: u32,
    status_debounce_ms: u64,
    tick_ms: u64,
}

impl Default for CompiledConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            authorization_base_url: "https://github.com/login/oauth/authorize".to_string(),
            token_url: "https://github.com/login/oauth/access_token".to_string(),
            apps_settings_url: "https://github.com/settings/connections/applications".to_string(),
            callback_host: "0.0.0.0".to_string(),
            callback_port: 21214,
            scopes: vec!["public_repo".to_string(), "user:email".to_string()],
            api_base_url: "https://api.github.com".to_string(),
            api_version: "2022-11-28".to_string(),
            template_owner: String::new(),
            template_name: String::new(),
            pages_branch: "main".to_string(),
            pages_path: "/docs".to_string(),
            fetch_period_secs: 15,
            clone_retry_delay_secs: 5,
            clone_retry_attempts: 2,
            status_debounce_ms: 1000,
            tick_ms: 250,
        }
    }
}

#[derive(PartialEq)]
enum Section {
    None,
    OAuth,
    Github,
    Sync,
    Ui,
}

fn parse_config(content: &str) -> CompiledConfig {
    let mut config = CompiledConfig::default();

    // Simple YAML parsing (avoiding external dependencies in build script)
    let mut section = Section::None;
    let mut in_scopes = false;

    for line in content.lines() {
        let trimmed = line.trim();

        // Top-level keys start a new section
        if !line.starts_with(' ') && !line.starts_with('\t') && trimmed.ends_with(':') {
            section = match trimmed {
                "oauth:" => Section::OAuth,
                "github:" => Section::Github,
                "sync:" => Section::Sync,
                "ui:" => Section::Ui,
                _ => Section::None,
            };
            in_scopes = false;
            continue;
        }

        if section == Section::OAuth && trimmed == "scopes:" {
            in_scopes = true;
            config.scopes.clear();
            continue;
        }

        if in_scopes {
            if let Some(item) = trimmed.strip_prefix("- ") {
                config.scopes.push(unquote(item).to_string());
                continue;
            }
            if !trimmed.is_empty() && !trimmed.starts_with('#') {
                in_scopes = false;
            }
        }

        let Some((key, value)) = parse_kv(trimmed) else {
            continue;
        };
        let value = unquote(value);

        match section {
            Section::OAuth => match key {
                "client_id" => config.client_id = value.to_string(),
                "client_secret" => config.client_secret = value.to_string(),
                "authorization_base_url" => config.authorization_base_url = value.to_string(),
                "token_url" => config.token_url = value.to_string(),
                "apps_settings_url" => config.apps_settings_url = value.to_string(),
                "callback_host" => config.callback_host = value.to_string(),
                "callback_port" => config.callback_port = value.parse().unwrap_or(21214),
                _ => {}
            },
            Section::Github => match key {
                "api_base_url" => config.api_base_url = value.to_string(),
                "api_version" => config.api_version = value.to_string(),
                "template_owner" => config.template_owner = value.to_string(),
                "template_name" => config.template_name = value.to_string(),
                "pages_branch" => config.pages_branch = value.to_string(),
                "pages_path" => config.pages_path = value.to_string(),
                _ => {}
            },
            Section::Sync => match key {
                "fetch_period_secs" => config.fetch_period_secs = value.parse().unwrap_or(15),
                "clone_retry_delay_secs" => {
                    config.clone_retry_delay_secs = value.parse().unwrap_or(5)
                }
                "clone_retry_attempts" => config.clone_retry_attempts = value.parse().unwrap_or(2),
                "status_debounce_ms" => config.status_debounce_ms = value.parse().unwrap_or(1000),
                _ => {}
            },
            Section::Ui => {
                if key == "tick_ms" {
                    config.tick_ms = value.parse().unwrap_or(250);
                }
            }
            Section::None => {}
        }
    }

    config
}

fn parse_kv(line: &str) -> Option<(&str, &str)> {
    if line.starts_with('#') || line.is_empty() {
        return None;
    }

    let colon_pos = line.find(':')?;
    let key = line[..colon_pos].trim();
    let mut value = line[colon_pos + 1..].trim();

    if let Some(comment_pos) = value.find(" #") {
        value = value[..comment_pos].trim();
    }

    // Section header
    if value.is_empty() {
        return None;
    }

    Some((key, value))
}

fn unquote(s: &str) -> &str {
    s.trim().trim_matches('"').trim_matches('\'')
}

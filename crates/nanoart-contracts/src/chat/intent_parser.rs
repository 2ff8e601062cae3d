use std::collections::BTreeMap;

use serde_json::Value;

use super::command_registry::{
    CommandSpec, ID_COMMANDS, MODE_COMMANDS, NO_ARG_COMMANDS, RAW_ARG_COMMANDS,
    SETTING_COMMANDS, SINGLE_PATH_COMMANDS,
};

/// One parsed line of chat input.
///
/// Plain text becomes a `submit` with the text as prompt; slash commands map
/// to an action plus arguments. Values are left as raw strings for the caller
/// to validate.
#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
    pub action: String,
    pub prompt: Option<String>,
    pub settings_update: BTreeMap<String, Value>,
    pub command_args: BTreeMap<String, Value>,
}

impl Intent {
    fn new(action: &str) -> Self {
        Self {
            action: action.to_string(),
            prompt: None,
            settings_update: BTreeMap::new(),
            command_args: BTreeMap::new(),
        }
    }

    pub fn arg_str(&self, key: &str) -> Option<&str> {
        self.command_args
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn setting_str(&self, key: &str) -> Option<&str> {
        self.settings_update
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

fn find_action(command: &str, specs: &[CommandSpec]) -> Option<&'static str> {
    specs
        .iter()
        .find(|spec| spec.command == command)
        .map(|spec| spec.action)
}

fn parse_path_args(arg: &str) -> Vec<String> {
    if arg.trim().is_empty() {
        return Vec::new();
    }
    match shell_words::split(arg) {
        Ok(parts) => parts
            .into_iter()
            .filter(|value| !value.is_empty())
            .collect(),
        Err(_) => arg
            .split_whitespace()
            .map(str::to_string)
            .filter(|value| !value.is_empty())
            .collect(),
    }
}

fn parse_single_path_arg(arg: &str) -> String {
    let parts = parse_path_args(arg);
    match parts.len() {
        0 => String::new(),
        1 => parts[0].clone(),
        _ => parts.join(" "),
    }
}

pub fn parse_intent(text: &str) -> Intent {
    let raw_trimmed = text.trim();
    if raw_trimmed.is_empty() {
        return Intent::new("noop");
    }

    if let Some(slash_tail) = raw_trimmed.strip_prefix('/') {
        let command_len = slash_tail
            .chars()
            .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
            .count();
        if command_len > 0 {
            let command = slash_tail[..command_len].to_ascii_lowercase();
            let remainder = &slash_tail[command_len..];
            let arg = remainder.trim();

            if let Some(mode) = find_action(&command, MODE_COMMANDS) {
                let mut intent = Intent::new("set_mode");
                intent
                    .command_args
                    .insert("mode".to_string(), Value::String(mode.to_string()));
                return intent;
            }

            if let Some(setting) = find_action(&command, SETTING_COMMANDS) {
                let mut intent = Intent::new(&format!("set_{setting}"));
                intent
                    .settings_update
                    .insert(setting.to_string(), Value::String(arg.to_string()));
                return intent;
            }

            if let Some(action) = find_action(&command, RAW_ARG_COMMANDS) {
                let mut intent = Intent::new(action);
                intent
                    .command_args
                    .insert("model".to_string(), Value::String(arg.to_string()));
                return intent;
            }

            if let Some(action) = find_action(&command, SINGLE_PATH_COMMANDS) {
                let mut intent = Intent::new(action);
                intent.command_args.insert(
                    "path".to_string(),
                    Value::String(parse_single_path_arg(arg)),
                );
                return intent;
            }

            if let Some(action) = find_action(&command, ID_COMMANDS) {
                let mut parts = parse_path_args(arg).into_iter();
                let mut intent = Intent::new(action);
                intent.command_args.insert(
                    "id".to_string(),
                    Value::String(parts.next().unwrap_or_default()),
                );
                let rest: Vec<String> = parts.collect();
                if !rest.is_empty() {
                    intent
                        .command_args
                        .insert("dir".to_string(), Value::String(rest.join(" ")));
                }
                return intent;
            }

            if let Some(action) = find_action(&command, NO_ARG_COMMANDS) {
                return Intent::new(action);
            }

            let mut intent = Intent::new("unknown");
            intent
                .command_args
                .insert("command".to_string(), Value::String(command));
            intent
                .command_args
                .insert("arg".to_string(), Value::String(arg.to_string()));
            return intent;
        }
    }

    let mut intent = Intent::new("submit");
    intent.prompt = Some(raw_trimmed.to_string());
    intent
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::parse_intent;

    #[test]
    fn blank_input_is_noop() {
        assert_eq!(parse_intent("   ").action, "noop");
        assert_eq!(parse_intent("").action, "noop");
    }

    #[test]
    fn plain_text_submits_trimmed_prompt() {
        let intent = parse_intent("  a lighthouse at dusk \n");
        assert_eq!(intent.action, "submit");
        assert_eq!(intent.prompt.as_deref(), Some("a lighthouse at dusk"));
    }

    #[test]
    fn mode_commands_set_mode() {
        let generate = parse_intent("/generate");
        assert_eq!(generate.action, "set_mode");
        assert_eq!(generate.command_args["mode"], json!("generate"));
        assert_eq!(parse_intent("/EDIT").arg_str("mode"), Some("edit"));
    }

    #[test]
    fn setting_commands_carry_raw_values() {
        let aspect = parse_intent("/aspect 9:16");
        assert_eq!(aspect.action, "set_aspect_ratio");
        assert_eq!(aspect.setting_str("aspect_ratio"), Some("9:16"));

        let count = parse_intent("/count 4");
        assert_eq!(count.action, "set_count");
        assert_eq!(count.settings_update["count"], json!("4"));
    }

    #[test]
    fn path_commands_accept_quoted_paths() {
        let upload = parse_intent("/upload \"/tmp/my photo.png\"");
        assert_eq!(upload.action, "upload");
        assert_eq!(upload.command_args["path"], json!("/tmp/my photo.png"));

        let drop = parse_intent("/drop cat.jpg");
        assert_eq!(drop.action, "drop");
        assert_eq!(drop.arg_str("path"), Some("cat.jpg"));
    }

    #[test]
    fn id_commands_split_id_and_dir() {
        let delete = parse_intent("/delete abc-123");
        assert_eq!(delete.action, "delete_image");
        assert_eq!(delete.arg_str("id"), Some("abc-123"));
        assert!(delete.arg_str("dir").is_none());

        let download = parse_intent("/download abc-123 \"/tmp/out dir\"");
        assert_eq!(download.action, "download_image");
        assert_eq!(download.arg_str("id"), Some("abc-123"));
        assert_eq!(download.arg_str("dir"), Some("/tmp/out dir"));

        assert!(parse_intent("/delete").arg_str("id").is_none());
    }

    #[test]
    fn no_arg_commands() {
        assert_eq!(parse_intent("/clear").action, "clear_source");
        assert_eq!(parse_intent("/gallery").action, "list_gallery");
        assert_eq!(parse_intent("/exit").action, "quit");
        assert_eq!(parse_intent("/image_model dryrun-image-1").arg_str("model"), Some("dryrun-image-1"));
    }

    #[test]
    fn unknown_command() {
        let intent = parse_intent("/magic foo bar");
        assert_eq!(intent.action, "unknown");
        assert_eq!(intent.command_args["command"], json!("magic"));
        assert_eq!(intent.command_args["arg"], json!("foo bar"));
    }
}

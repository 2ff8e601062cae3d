#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub action: &'static str,
}

pub(crate) const MODE_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "generate",
        action: "generate",
    },
    CommandSpec {
        command: "edit",
        action: "edit",
    },
];

pub(crate) const SETTING_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "aspect",
        action: "aspect_ratio",
    },
    CommandSpec {
        command: "count",
        action: "count",
    },
];

pub(crate) const RAW_ARG_COMMANDS: &[CommandSpec] = &[CommandSpec {
    command: "image_model",
    action: "set_image_model",
}];

pub(crate) const SINGLE_PATH_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "upload",
        action: "upload",
    },
    CommandSpec {
        command: "drop",
        action: "drop",
    },
];

pub(crate) const ID_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "delete",
        action: "delete_image",
    },
    CommandSpec {
        command: "download",
        action: "download_image",
    },
];

pub(crate) const NO_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "clear",
        action: "clear_source",
    },
    CommandSpec {
        command: "gallery",
        action: "list_gallery",
    },
    CommandSpec {
        command: "status",
        action: "status",
    },
    CommandSpec {
        command: "help",
        action: "help",
    },
    CommandSpec {
        command: "quit",
        action: "quit",
    },
    CommandSpec {
        command: "exit",
        action: "quit",
    },
];

pub const CHAT_HELP_COMMANDS: &[&str] = &[
    "/generate",
    "/edit",
    "/aspect",
    "/count",
    "/image_model",
    "/upload",
    "/drop",
    "/clear",
    "/gallery",
    "/delete",
    "/download",
    "/status",
    "/help",
    "/quit",
];

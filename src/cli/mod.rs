// Command-line surface of `devbox-update`.
pub mod cmd_enums;

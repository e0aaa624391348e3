// ABOUTME: Version and shell constants

pub const VERSION: &str = "0.1.0";
pub const WELCOME_MESSAGE: &str = "pochard v0.1";
pub const WELCOME_SUBTITLE: &str = "a trampolined Lisp with first-class continuations";
pub const PROMPT: &str = "pochard> ";
pub const CONTINUE_PROMPT: &str = "....> ";
pub const HISTORY_FILE: &str = ".pochard_history";

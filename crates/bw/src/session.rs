/// Per invocation session state handed to every command.
///
/// The CLI builds one from its global flags. `bw serve` builds one per request from the
/// `x-bw-session` header or the server's current session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    pub session_key: Option<String>,
    /// Whether the user can be prompted for missing input.
    pub interactive: bool,
    /// Set when running behind `bw serve`, where stdin and prompts are unavailable.
    pub serve: bool,
}

impl SessionContext {
    pub fn new(session_key: Option<String>, interactive: bool) -> Self {
        Self {
            session_key: session_key.filter(|key| !key.trim().is_empty()),
            interactive,
            serve: false,
        }
    }

    pub fn for_serve(session_key: Option<String>) -> Self {
        Self {
            serve: true,
            ..Self::new(session_key, false)
        }
    }

    pub fn can_prompt(&self) -> bool {
        self.interactive && !self.serve
    }
}
